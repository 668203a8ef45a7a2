//! One markdown+LaTeX editor: a text surface, a preview pane and the state
//! machine between them.
//!
//! The instance starts in [`ViewMode::Edit`]. In preview mode each input
//! re-arms a trailing-edge debounce, and the render observes the text at the
//! moment the deadline fires. Deadlines reach the instance either through
//! [`EditorInstance::poll`] or through a platform timer calling
//! [`EditorInstance::fire_render`] with the token it was armed with.

use std::rc::Rc;
use std::time::Duration;

use solvebook_renderer::{RENDER_ERROR_PLACEHOLDER, RenderError, RenderPipeline};
use web_time::Instant;

use crate::error::EditorError;
use crate::platform::{
    EditorMount, EditorSurface, MountRequest, MountedEditor, PreviewTarget, Subscription,
    TimerScheduler, ViewControls,
};
use crate::timer::{DebounceSlot, TimerToken};
use crate::types::{EditorId, ViewMode};

pub struct EditorInstance {
    id: EditorId,
    surface: Option<Box<dyn EditorSurface>>,
    preview: Option<Box<dyn PreviewTarget>>,
    controls: Option<Box<dyn ViewControls>>,
    renderer: Rc<dyn RenderPipeline>,
    scheduler: Option<Rc<dyn TimerScheduler>>,

    raw_text: String,
    view_mode: ViewMode,
    /// Output of the last render; `None` once `raw_text` changes.
    rendered_html: Option<String>,
    debounce: DebounceSlot,
    /// A value set before the surface finished initializing.
    pending_hydration: Option<String>,
    subscriptions: Vec<Subscription>,

    diagnostic: Option<EditorError>,
    last_render_error: Option<EditorError>,
    render_count: usize,
    destroyed: bool,
}

impl std::fmt::Debug for EditorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorInstance")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .field("view_mode", &self.view_mode)
            .field("len", &self.raw_text.len())
            .field("render_count", &self.render_count)
            .field("pending_render", &self.debounce.is_pending())
            .finish()
    }
}

impl EditorInstance {
    /// Build an editor under the requested container.
    ///
    /// Never fails: a missing container or a failing mount yields a detached
    /// instance whose operations are no-ops and whose [`diagnostic`] says why.
    ///
    /// [`diagnostic`]: EditorInstance::diagnostic
    pub fn create(
        mount: &mut dyn EditorMount,
        request: MountRequest,
        renderer: Rc<dyn RenderPipeline>,
        debounce: Duration,
    ) -> Self {
        let mounted = match mount.mount(&request) {
            Ok(Some(mounted)) => Ok(mounted),
            Ok(None) => {
                tracing::error!(
                    editor = %request.id,
                    container = %request.container,
                    "editor container not found, running detached"
                );
                Err(EditorError::MissingTarget {
                    id: request.id.clone(),
                    container: request.container.clone(),
                })
            }
            Err(err) => {
                tracing::error!(editor = %request.id, error = %err, "failed to mount editor");
                Err(EditorError::Platform(err))
            }
        };

        let mut instance = Self {
            id: request.id,
            surface: None,
            preview: None,
            controls: None,
            renderer,
            scheduler: None,
            raw_text: String::new(),
            view_mode: ViewMode::Edit,
            rendered_html: None,
            debounce: DebounceSlot::new(debounce),
            pending_hydration: None,
            subscriptions: Vec::new(),
            diagnostic: None,
            last_render_error: None,
            render_count: 0,
            destroyed: false,
        };
        match mounted {
            Ok(MountedEditor {
                surface,
                preview,
                controls,
                guards,
            }) => {
                instance.surface = Some(surface);
                instance.preview = Some(preview);
                instance.controls = controls;
                instance.subscriptions = guards;
                instance.apply_view();
                tracing::debug!(editor = %instance.id, "editor mounted");
            }
            Err(diagnostic) => instance.diagnostic = Some(diagnostic),
        }
        instance
    }

    pub fn with_scheduler(mut self, scheduler: Rc<dyn TimerScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn set_scheduler(&mut self, scheduler: Rc<dyn TimerScheduler>) {
        self.scheduler = Some(scheduler);
    }

    pub fn id(&self) -> &EditorId {
        &self.id
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some() && !self.destroyed
    }

    /// Attached, and the surface has finished initializing.
    pub fn is_ready(&self) -> bool {
        self.is_attached() && self.surface.as_ref().is_some_and(|s| s.is_ready())
    }

    /// Why the instance is detached, if it is.
    pub fn diagnostic(&self) -> Option<&EditorError> {
        self.diagnostic.as_ref()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// The current text, verbatim.
    pub fn value(&self) -> &str {
        &self.raw_text
    }

    pub fn rendered_html(&self) -> Option<&str> {
        self.rendered_html.as_deref()
    }

    pub fn last_render_error(&self) -> Option<&EditorError> {
        self.last_render_error.as_ref()
    }

    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn has_pending_render(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn has_pending_hydration(&self) -> bool {
        self.pending_hydration.is_some()
    }

    /// Take ownership of a platform resource released on [`destroy`](Self::destroy).
    pub fn own(&mut self, subscription: Subscription) {
        if self.destroyed {
            return;
        }
        self.subscriptions.push(subscription);
    }

    /// Overwrite the text, e.g. to hydrate saved content.
    ///
    /// In preview mode this renders immediately and cancels a pending render.
    pub fn set_value(&mut self, text: impl Into<String>) {
        if self.destroyed {
            return;
        }
        let text = text.into();
        if let Some(surface) = self.surface.as_mut() {
            if surface.is_ready() {
                if let Err(err) = surface.set_value(&text) {
                    tracing::warn!(editor = %self.id, error = %err, "surface rejected value");
                }
                self.pending_hydration = None;
            } else {
                tracing::debug!(editor = %self.id, "surface not ready, deferring value");
                self.pending_hydration = Some(text.clone());
            }
        }
        self.raw_text = text;
        self.rendered_html = None;

        if self.view_mode == ViewMode::Preview {
            self.debounce.cancel();
            self.render_now();
        }
    }

    /// Apply a deferred value once the surface reports ready.
    pub fn complete_hydration(&mut self) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if !surface.is_ready() {
            return false;
        }
        let Some(text) = self.pending_hydration.take() else {
            return false;
        };
        match surface.set_value(&text) {
            Ok(()) => {
                tracing::debug!(editor = %self.id, "applied deferred value");
                true
            }
            Err(err) => {
                tracing::warn!(editor = %self.id, error = %err, "surface rejected deferred value");
                self.pending_hydration = Some(text);
                false
            }
        }
    }

    pub fn focus(&self) -> Result<(), EditorError> {
        match self.surface.as_ref() {
            Some(surface) if !self.destroyed => Ok(surface.focus()?),
            _ => Ok(()),
        }
    }

    /// Show `mode`. Entering preview renders synchronously; entering edit
    /// keeps all text and cancels a pending render.
    pub fn switch_view(&mut self, mode: ViewMode) {
        if !self.is_attached() {
            return;
        }
        self.view_mode = mode;
        self.debounce.cancel();
        self.apply_view();
        if mode == ViewMode::Preview {
            self.render_now();
        }
    }

    /// The surface reported new content.
    ///
    /// Returns whether the text changed.
    pub fn handle_input(&mut self, text: impl Into<String>, now: Instant) -> bool {
        if !self.is_attached() {
            return false;
        }
        let text = text.into();
        if text == self.raw_text {
            return false;
        }
        self.raw_text = text;
        self.rendered_html = None;
        if self.view_mode == ViewMode::Preview {
            self.arm_debounce(now);
        }
        true
    }

    /// Read the surface and treat its content as input.
    pub fn sync_from_surface(&mut self, now: Instant) -> bool {
        let Some(text) = self.surface.as_ref().map(|s| s.value()) else {
            return false;
        };
        self.handle_input(text, now)
    }

    fn arm_debounce(&mut self, now: Instant) {
        let token = self.debounce.arm(now);
        tracing::debug!(editor = %self.id, token = token.get(), "render scheduled");
        if let Some(scheduler) = self.scheduler.as_ref() {
            if let Some(handle) = scheduler.schedule(&self.id, token, self.debounce.delay()) {
                self.debounce.attach(token, handle);
            }
        }
    }

    /// Render if the debounce deadline has passed at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debounce.take_due(now) {
            self.render_now();
            true
        } else {
            false
        }
    }

    /// A platform timer fired. Stale tokens are ignored.
    pub fn fire_render(&mut self, token: TimerToken) -> bool {
        if self.debounce.take_token(token) {
            self.render_now();
            true
        } else {
            tracing::debug!(editor = %self.id, token = token.get(), "ignoring stale timer");
            false
        }
    }

    fn render_now(&mut self) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        let html = match self.renderer.render(&self.raw_text) {
            Ok(output) => {
                self.last_render_error = None;
                if !output.warnings.is_empty() {
                    tracing::debug!(
                        editor = %self.id,
                        warnings = output.warnings.len(),
                        "rendered with contained failures"
                    );
                }
                output.html
            }
            Err(err) => {
                tracing::warn!(editor = %self.id, error = %err, "render failed");
                self.last_render_error = Some(EditorError::Render(err));
                RENDER_ERROR_PLACEHOLDER.to_string()
            }
        };
        if let Err(err) = preview.replace_html(&html) {
            tracing::warn!(editor = %self.id, error = %err, "could not update preview");
        }
        self.rendered_html = Some(html);
        self.render_count += 1;
    }

    fn apply_view(&mut self) {
        let editing = self.view_mode == ViewMode::Edit;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_visible(editing);
        }
        if let Some(preview) = self.preview.as_mut() {
            preview.set_visible(!editing);
        }
        if let Some(controls) = self.controls.as_mut() {
            controls.reflect(self.view_mode);
        }
    }

    /// Release subscriptions, timers and fixtures, and discard the text.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.debounce.cancel();
        self.subscriptions.clear();
        self.controls = None;
        self.preview = None;
        self.surface = None;
        self.raw_text.clear();
        self.rendered_html = None;
        self.pending_hydration = None;
        tracing::debug!(editor = %self.id, "editor destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for EditorInstance {
    fn drop(&mut self) {
        self.destroy();
    }
}
