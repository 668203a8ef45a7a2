//! In-memory implementations of the platform traits.
//!
//! Backs the `buffer` engine on native hosts and drives the editor logic in
//! tests. State lives behind `Rc<RefCell<_>>` handles so a caller can keep
//! watching a surface after handing the mount to a page.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::rc::Rc;
use std::time::Duration;

use smol_str::SmolStr;

use crate::error::PlatformError;
use crate::platform::{
    EditorMount, EditorSurface, HostForm, MountRequest, MountedEditor, Notifier, PreviewTarget,
    Subscription, TimerScheduler, ViewControls,
};
use crate::text::EditorRope;
use crate::timer::TimerToken;
use crate::types::{EditorId, EngineKind, ViewMode};

pub type Shared<T> = Rc<RefCell<T>>;

#[derive(Debug, Default)]
pub struct SurfaceState {
    pub text: EditorRope,
    /// Caret position in chars.
    pub cursor: usize,
    pub placeholder: String,
    pub engine: EngineKind,
    pub visible: bool,
    pub focused: bool,
    pub ready: bool,
}

/// Rope-backed editing surface.
#[derive(Debug, Clone)]
pub struct BufferSurface {
    state: Shared<SurfaceState>,
}

impl BufferSurface {
    pub fn new(state: Shared<SurfaceState>) -> Self {
        Self { state }
    }

    pub fn contents(&self) -> String {
        self.state.borrow().text.to_string()
    }

    pub fn cursor(&self) -> usize {
        self.state.borrow().cursor
    }

    /// Move the caret, clamped to the text.
    pub fn move_cursor(&self, char_offset: usize) {
        let mut state = self.state.borrow_mut();
        state.cursor = char_offset.min(state.text.len_chars());
    }

    /// Type at the caret; returns the new value.
    pub fn type_text(&self, text: &str) -> String {
        let mut state = self.state.borrow_mut();
        let at = state.cursor;
        state.cursor = state.text.insert(at, text);
        state.text.to_string()
    }

    /// Delete the char before the caret; returns the new value.
    pub fn backspace(&self) -> String {
        let mut state = self.state.borrow_mut();
        let end = state.cursor;
        if end > 0 {
            state.text.delete(end - 1..end);
            state.cursor = end - 1;
        }
        state.text.to_string()
    }

    /// Paste over a selection; the caret lands after the pasted text.
    pub fn paste(&self, selection: Range<usize>, text: &str) -> String {
        let mut state = self.state.borrow_mut();
        state.cursor = state.text.replace(selection, text);
        state.text.to_string()
    }
}

impl EditorSurface for BufferSurface {
    fn value(&self) -> String {
        self.state.borrow().text.to_string()
    }

    fn set_value(&mut self, text: &str) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if !state.ready {
            return Err("surface is not ready".into());
        }
        state.text.set(text);
        state.cursor = state.text.len_chars();
        Ok(())
    }

    fn focus(&self) -> Result<(), PlatformError> {
        self.state.borrow_mut().focused = true;
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }

    fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }
}

#[derive(Debug, Default)]
pub struct PreviewState {
    pub html: String,
    pub visible: bool,
    /// Number of times the content was replaced.
    pub writes: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryPreview {
    state: Shared<PreviewState>,
}

impl PreviewTarget for MemoryPreview {
    fn replace_html(&mut self, html: &str) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.html.clear();
        state.html.push_str(html);
        state.writes += 1;
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }
}

struct MemoryControls {
    id: EditorId,
    shown: Shared<BTreeMap<EditorId, ViewMode>>,
}

impl ViewControls for MemoryControls {
    fn reflect(&mut self, mode: ViewMode) {
        self.shown.borrow_mut().insert(self.id.clone(), mode);
    }
}

/// Mounts editors into a fixed set of named containers.
#[derive(Debug, Clone, Default)]
pub struct MemoryMount {
    containers: BTreeSet<SmolStr>,
    start_unready: bool,
    surfaces: Shared<BTreeMap<EditorId, Shared<SurfaceState>>>,
    previews: Shared<BTreeMap<EditorId, Shared<PreviewState>>>,
    shown: Shared<BTreeMap<EditorId, ViewMode>>,
}

impl MemoryMount {
    pub fn new<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            containers: containers.into_iter().map(SmolStr::new).collect(),
            ..Default::default()
        }
    }

    /// Containers for the standard `summary` and `code` editors.
    pub fn solution_page() -> Self {
        Self::new([EditorId::SUMMARY.container(), EditorId::CODE.container()])
    }

    /// Surfaces start uninitialized until [`MemoryMount::mark_ready`].
    pub fn with_unready_surfaces(mut self) -> Self {
        self.start_unready = true;
        self
    }

    pub fn surface(&self, id: &EditorId) -> Option<BufferSurface> {
        self.surfaces.borrow().get(id).cloned().map(BufferSurface::new)
    }

    pub fn surface_state(&self, id: &EditorId) -> Option<Shared<SurfaceState>> {
        self.surfaces.borrow().get(id).cloned()
    }

    pub fn preview_state(&self, id: &EditorId) -> Option<Shared<PreviewState>> {
        self.previews.borrow().get(id).cloned()
    }

    /// The mode the view controls currently show.
    pub fn shown_mode(&self, id: &EditorId) -> Option<ViewMode> {
        self.shown.borrow().get(id).copied()
    }

    pub fn mark_ready(&self, id: &EditorId) {
        if let Some(state) = self.surfaces.borrow().get(id) {
            state.borrow_mut().ready = true;
        }
    }
}

impl EditorMount for MemoryMount {
    fn mount(&mut self, request: &MountRequest) -> Result<Option<MountedEditor>, PlatformError> {
        if !self.containers.contains(&request.container) {
            return Ok(None);
        }
        let surface = Rc::new(RefCell::new(SurfaceState {
            text: EditorRope::new(),
            cursor: 0,
            placeholder: request.placeholder.clone(),
            engine: request.engine,
            visible: true,
            focused: false,
            ready: !self.start_unready,
        }));
        let preview = Rc::new(RefCell::new(PreviewState::default()));
        self.surfaces
            .borrow_mut()
            .insert(request.id.clone(), surface.clone());
        self.previews
            .borrow_mut()
            .insert(request.id.clone(), preview.clone());

        Ok(Some(MountedEditor {
            surface: Box::new(BufferSurface::new(surface)),
            preview: Box::new(MemoryPreview { state: preview }),
            controls: Some(Box::new(MemoryControls {
                id: request.id.clone(),
                shown: self.shown.clone(),
            })),
            guards: Vec::new(),
        }))
    }
}

/// A host form held in memory, counting writes per field.
#[derive(Debug, Clone, Default)]
pub struct MemoryForm {
    fields: BTreeMap<SmolStr, String>,
    writes: BTreeMap<SmolStr, usize>,
    created: Vec<SmolStr>,
    failing: BTreeSet<SmolStr>,
    focused: RefCell<Option<SmolStr>>,
}

impl MemoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(SmolStr::new(name), value.to_string());
        self
    }

    /// Make every write to `name` fail.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(SmolStr::new(name));
        self
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn writes(&self, name: &str) -> usize {
        self.writes.get(name).copied().unwrap_or(0)
    }

    /// Fields created by `ensure_field`, in creation order.
    pub fn created(&self) -> &[SmolStr] {
        &self.created
    }

    pub fn focused(&self) -> Option<SmolStr> {
        self.focused.borrow().clone()
    }
}

impl HostForm for MemoryForm {
    fn field_value(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn ensure_field(&mut self, name: &str) -> Result<(), PlatformError> {
        if !self.fields.contains_key(name) {
            self.fields.insert(SmolStr::new(name), String::new());
            self.created.push(SmolStr::new(name));
        }
        Ok(())
    }

    fn set_field_value(&mut self, name: &str, value: &str) -> Result<(), PlatformError> {
        if self.failing.contains(name) {
            return Err(format!("field `{name}` rejected the write").into());
        }
        let Some(field) = self.fields.get_mut(name) else {
            return Err(format!("no field `{name}`").into());
        };
        field.clear();
        field.push_str(value);
        *self.writes.entry(SmolStr::new(name)).or_default() += 1;
        Ok(())
    }

    fn focus_field(&self, name: &str) -> Result<(), PlatformError> {
        *self.focused.borrow_mut() = Some(SmolStr::new(name));
        Ok(())
    }
}

/// Collects notifications instead of showing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Shared<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// Records scheduled timers; the caller fires them by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    scheduled: Shared<Vec<(EditorId, TimerToken, Duration)>>,
}

impl ManualScheduler {
    pub fn scheduled(&self) -> Vec<(EditorId, TimerToken, Duration)> {
        self.scheduled.borrow().clone()
    }

    pub fn last_token(&self, editor: &EditorId) -> Option<TimerToken> {
        self.scheduled
            .borrow()
            .iter()
            .rev()
            .find(|(id, _, _)| id == editor)
            .map(|(_, token, _)| *token)
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(
        &self,
        editor: &EditorId,
        token: TimerToken,
        delay: Duration,
    ) -> Option<Subscription> {
        self.scheduled
            .borrow_mut()
            .push((editor.clone(), token, delay));
        None
    }
}
