//! One create/edit page: its editors, the form gate, drafts and notifications.

use std::collections::BTreeMap;
use std::rc::Rc;

use smol_str::SmolStr;
use solvebook_renderer::{RenderPipeline, Renderer};
use web_time::Instant;

use crate::autosave::{Autosaver, DraftScope, DraftStore};
use crate::config::EditorConfig;
use crate::editor::EditorInstance;
use crate::error::EditorError;
use crate::form::{FormBinding, FormSubmissionController, SessionState, SubmitOutcome};
use crate::messages::Messages;
use crate::platform::{EditorMount, HostForm, MountRequest, Notifier, TimerScheduler};
use crate::registry::EditorRegistry;
use crate::timer::TimerToken;
use crate::types::{EditorId, ViewMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    Create,
    Edit { solution_id: SmolStr },
}

impl PageKind {
    pub fn draft_scope(&self) -> DraftScope {
        match self {
            PageKind::Create => DraftScope::New,
            PageKind::Edit { solution_id } => DraftScope::Edit(solution_id.clone()),
        }
    }
}

pub struct PageController {
    kind: PageKind,
    config: EditorConfig,
    messages: Messages,
    renderer: Rc<dyn RenderPipeline>,
    editor_renderers: BTreeMap<EditorId, Rc<dyn RenderPipeline>>,
    scheduler: Option<Rc<dyn TimerScheduler>>,
    notifier: Box<dyn Notifier>,
    editors: EditorRegistry,
    form: Option<FormSubmissionController>,
    autosave: Option<Autosaver>,
}

impl std::fmt::Debug for PageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageController")
            .field("kind", &self.kind)
            .field("editors", &self.editors)
            .field("form", &self.form)
            .field("autosave", &self.autosave)
            .finish_non_exhaustive()
    }
}

impl PageController {
    pub fn new(kind: PageKind, config: EditorConfig, notifier: Box<dyn Notifier>) -> Self {
        let messages = config.resolved_messages();
        let renderer: Rc<dyn RenderPipeline> = Rc::new(Renderer::new(config.render.clone()));
        Self {
            kind,
            config,
            messages,
            renderer,
            editor_renderers: BTreeMap::new(),
            scheduler: None,
            notifier,
            editors: EditorRegistry::new(),
            form: None,
            autosave: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Rc<dyn RenderPipeline>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Render one editor with its own pipeline; the rest keep the shared one.
    pub fn with_editor_renderer(mut self, id: EditorId, renderer: Rc<dyn RenderPipeline>) -> Self {
        self.editor_renderers.insert(id, renderer);
        self
    }

    /// Enable drafts, unless autosave is switched off in the configuration.
    pub fn with_draft_store(mut self, store: Box<dyn DraftStore>) -> Self {
        if self.config.autosave.enabled {
            self.autosave = Some(Autosaver::new(
                store,
                self.kind.draft_scope(),
                self.config.autosave.key_prefix.clone(),
                self.config.autosave.clear_policy,
            ));
        }
        self
    }

    pub fn set_scheduler(&mut self, scheduler: Rc<dyn TimerScheduler>) {
        for editor in self.editors.iter_mut() {
            editor.set_scheduler(scheduler.clone());
        }
        self.scheduler = Some(scheduler);
    }

    pub fn kind(&self) -> &PageKind {
        &self.kind
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn editors(&self) -> &EditorRegistry {
        &self.editors
    }

    pub fn editor(&self, id: &EditorId) -> Option<&EditorInstance> {
        self.editors.get(id)
    }

    pub fn state(&self) -> SessionState {
        self.form
            .as_ref()
            .map_or(SessionState::Initializing, FormSubmissionController::state)
    }

    pub fn has_autosave(&self) -> bool {
        self.autosave.is_some()
    }

    /// The standard `summary` + `code` binding with the configured required inputs.
    pub fn default_binding(&self) -> FormBinding {
        FormBinding {
            required_inputs: self.config.required_inputs.clone(),
            ..FormBinding::default()
        }
    }

    /// Create every editor the binding names and attach the form gate.
    ///
    /// Returns the diagnostics of editors that could not be mounted; those
    /// editors exist but do nothing.
    pub fn mount(&mut self, mount: &mut dyn EditorMount, binding: FormBinding) -> Vec<EditorError> {
        let mut diagnostics = Vec::new();
        for id in binding.editors() {
            let request = MountRequest {
                id: id.clone(),
                container: id.container(),
                placeholder: self.config.placeholder(id, &self.messages),
                engine: self.config.engine,
            };
            let renderer = self.editor_renderers.get(id).unwrap_or(&self.renderer);
            let mut editor =
                EditorInstance::create(mount, request, renderer.clone(), self.config.debounce());
            if let Some(scheduler) = self.scheduler.as_ref() {
                editor.set_scheduler(scheduler.clone());
            }
            if let Some(diagnostic) = editor.diagnostic() {
                diagnostics.push(diagnostic.clone());
            }
            self.editors.insert(editor);
        }

        let mut form = FormSubmissionController::attach(binding);
        form.mark_ready();
        self.form = Some(form);
        tracing::info!(
            page = ?self.kind,
            editors = self.editors.len(),
            detached = diagnostics.len(),
            "page mounted"
        );
        diagnostics
    }

    /// Edit page: saved content arrives in the form's fields.
    pub fn hydrate_from_form(&mut self, form: &dyn HostForm) {
        for editor in self.editors.iter_mut() {
            if let Some(value) = form.field_value(editor.id().as_str()) {
                if !value.is_empty() {
                    editor.set_value(value);
                }
            }
        }
    }

    /// A surface finished initializing; apply any deferred value.
    pub fn surface_ready(&mut self, id: &EditorId) -> bool {
        self.editors
            .get_mut(id)
            .is_some_and(EditorInstance::complete_hydration)
    }

    pub fn set_value(&mut self, id: &EditorId, text: impl Into<String>) {
        if let Some(editor) = self.editors.get_mut(id) {
            editor.set_value(text);
        }
    }

    pub fn handle_input(&mut self, id: &EditorId, text: impl Into<String>, now: Instant) -> bool {
        self.editors
            .get_mut(id)
            .is_some_and(|editor| editor.handle_input(text, now))
    }

    pub fn switch_view(&mut self, id: &EditorId, mode: ViewMode) {
        if let Some(editor) = self.editors.get_mut(id) {
            editor.switch_view(mode);
        }
    }

    /// Flip between edit and preview.
    pub fn toggle_view(&mut self, id: &EditorId) {
        if let Some(editor) = self.editors.get_mut(id) {
            let mode = editor.view_mode().toggled();
            editor.switch_view(mode);
        }
    }

    pub fn focus(&self, id: &EditorId) -> Result<(), EditorError> {
        match self.editors.get(id) {
            Some(editor) => editor.focus(),
            None => Ok(()),
        }
    }

    /// Deliver due debounce deadlines. Returns how many editors rendered.
    pub fn poll(&mut self, now: Instant) -> usize {
        self.editors
            .iter_mut()
            .map(|editor| editor.poll(now))
            .filter(|rendered| *rendered)
            .count()
    }

    pub fn fire_render(&mut self, id: &EditorId, token: TimerToken) -> bool {
        self.editors
            .get_mut(id)
            .is_some_and(|editor| editor.fire_render(token))
    }

    pub fn restore_drafts(&mut self) -> Vec<EditorId> {
        match self.autosave.as_mut() {
            Some(autosave) => autosave.restore(&mut self.editors),
            None => Vec::new(),
        }
    }

    pub fn autosave_tick(&mut self, saved_at_ms: u64) -> usize {
        if self.state() == SessionState::Submitted {
            return 0;
        }
        match self.autosave.as_mut() {
            Some(autosave) => autosave.tick(&self.editors, saved_at_ms),
            None => 0,
        }
    }

    /// Run the form gate. A blocked submission is reported through the
    /// notifier; a successful one clears drafts and destroys the editors.
    pub fn submit(&mut self, host: &mut dyn HostForm) -> SubmitOutcome {
        let Some(form) = self.form.as_mut() else {
            let err = EditorError::NotReady { id: EditorId::CODE };
            self.notifier.notify(&self.messages.describe(&err));
            return SubmitOutcome::Blocked(err);
        };
        let outcome = form.submit(&self.editors, host, &self.messages);
        match &outcome {
            SubmitOutcome::Blocked(err) => self.notifier.notify(&self.messages.describe(err)),
            SubmitOutcome::Proceed(_) => {
                if let Some(autosave) = self.autosave.as_mut() {
                    let ids: Vec<EditorId> = form.binding().editors().cloned().collect();
                    autosave.on_submitted(ids);
                }
                self.editors.clear();
            }
        }
        outcome
    }

    /// Tear the page down; safe to call more than once.
    pub fn unmount(&mut self) {
        if !self.editors.is_empty() {
            tracing::debug!(editors = self.editors.len(), "unmounting page");
        }
        self.editors.clear();
        self.form = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::autosave::{DraftSnapshot, MemoryDraftStore};
    use crate::memory::{ManualScheduler, MemoryForm, MemoryMount, RecordingNotifier};

    struct Fixture {
        page: PageController,
        mount: MemoryMount,
        notifier: RecordingNotifier,
        store: MemoryDraftStore,
    }

    fn fixture(kind: PageKind, config: EditorConfig) -> Fixture {
        let notifier = RecordingNotifier::default();
        let store = MemoryDraftStore::new();
        let page = PageController::new(kind, config, Box::new(notifier.clone()))
            .with_draft_store(Box::new(store.clone()));
        Fixture {
            page,
            mount: MemoryMount::solution_page(),
            notifier,
            store,
        }
    }

    fn mounted(kind: PageKind) -> Fixture {
        let mut f = fixture(kind, EditorConfig::default());
        let binding = f.page.default_binding();
        let diagnostics = f.page.mount(&mut f.mount, binding);
        assert!(diagnostics.is_empty());
        f
    }

    fn filled_form() -> MemoryForm {
        MemoryForm::new()
            .with_field("title", "A + B")
            .with_field("url", "https://vjudge.net/problem/1")
    }

    #[test]
    fn mount_uses_configured_placeholders() {
        let config = EditorConfig::from_json(r#"{"locale": "vi"}"#).unwrap();
        let mut f = fixture(PageKind::Create, config);
        f.page.mount(&mut f.mount, FormBinding::default());
        let code = f.mount.surface_state(&EditorId::CODE).unwrap();
        assert_eq!(code.borrow().placeholder, "Phần giải bài tập...");
        assert_eq!(f.page.state(), SessionState::Ready);
    }

    #[test]
    fn missing_container_is_reported() {
        let mut f = fixture(PageKind::Create, EditorConfig::default());
        let mut mount = MemoryMount::new([EditorId::CODE.container()]);
        let diagnostics = f.page.mount(&mut mount, FormBinding::default());
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0],
            EditorError::MissingTarget { id, .. } if *id == EditorId::SUMMARY
        ));
        assert_eq!(f.page.editors().len(), 2);
    }

    #[test]
    fn blocked_submission_notifies_once() {
        let mut f = mounted(PageKind::Create);
        let mut form = filled_form();
        let outcome = f.page.submit(&mut form);
        assert!(!outcome.is_proceed());
        assert_eq!(f.notifier.messages(), ["Please enter your solution!"]);
        assert_eq!(f.page.state(), SessionState::Ready);
    }

    #[test]
    fn submit_before_mount_is_not_ready() {
        let mut f = fixture(PageKind::Create, EditorConfig::default());
        let outcome = f.page.submit(&mut filled_form());
        assert!(matches!(outcome, SubmitOutcome::Blocked(EditorError::NotReady { .. })));
        assert_eq!(f.notifier.messages(), [Messages::english().not_ready]);
    }

    #[test]
    fn successful_submission_clears_drafts_and_editors() {
        let mut f = mounted(PageKind::Create);
        let t0 = Instant::now();
        f.page.handle_input(&EditorId::SUMMARY, "two pointers", t0);
        f.page.handle_input(&EditorId::CODE, "print(1)", t0);
        assert_eq!(f.page.autosave_tick(1), 2);
        assert_eq!(f.store.keys().len(), 2);

        let mut form = filled_form();
        assert!(f.page.submit(&mut form).is_proceed());
        assert_eq!(form.value("summary"), Some("two pointers"));
        assert_eq!(form.value("code"), Some("print(1)"));
        assert!(f.store.keys().is_empty());
        assert!(f.page.editors().is_empty());
        assert_eq!(f.page.state(), SessionState::Submitted);
        assert_eq!(f.page.autosave_tick(2), 0);
        assert!(f.notifier.messages().is_empty());
    }

    #[test]
    fn failing_renderer_stays_with_its_editor() {
        struct Broken;
        impl RenderPipeline for Broken {
            fn render(
                &self,
                _source: &str,
            ) -> Result<solvebook_renderer::RenderOutput, solvebook_renderer::RenderError> {
                Err(solvebook_renderer::RenderError::Panicked {
                    message: "summary pipeline".into(),
                })
            }
        }

        let notifier = RecordingNotifier::default();
        let mut page = PageController::new(
            PageKind::Create,
            EditorConfig::default(),
            Box::new(notifier.clone()),
        )
        .with_editor_renderer(EditorId::SUMMARY, Rc::new(Broken));
        let mut mount = MemoryMount::solution_page();
        let binding = page.default_binding();
        assert!(page.mount(&mut mount, binding).is_empty());

        page.set_value(&EditorId::SUMMARY, "two pointers");
        page.set_value(&EditorId::CODE, "# Hi $x^2$");
        page.switch_view(&EditorId::SUMMARY, ViewMode::Preview);
        page.switch_view(&EditorId::CODE, ViewMode::Preview);

        let summary = page.editor(&EditorId::SUMMARY).unwrap();
        assert!(matches!(
            summary.last_render_error(),
            Some(EditorError::Render(_))
        ));
        assert_eq!(
            summary.rendered_html(),
            Some(solvebook_renderer::RENDER_ERROR_PLACEHOLDER)
        );
        let code = page.editor(&EditorId::CODE).unwrap();
        assert_eq!(code.last_render_error(), None);
        assert!(code.rendered_html().is_some_and(|html| html.contains("<math")));

        let mut form = filled_form();
        assert!(page.submit(&mut form).is_proceed());
        assert_eq!(form.value("summary"), Some("two pointers"));
        assert_eq!(form.value("code"), Some("# Hi $x^2$"));
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn edit_page_hydrates_from_form_then_drafts() {
        let mut f = mounted(PageKind::Edit {
            solution_id: "99".into(),
        });
        let snapshot = DraftSnapshot {
            content: "unsaved summary".into(),
            saved_at_ms: 5,
        };
        f.store
            .save("solvebook_draft:edit:99:summary", &snapshot)
            .unwrap();
        let form = filled_form().with_field("code", "saved code");

        f.page.hydrate_from_form(&form);
        assert_eq!(f.page.restore_drafts(), vec![EditorId::SUMMARY]);
        assert_eq!(f.page.editors().value(&EditorId::CODE), Some("saved code"));
        assert_eq!(
            f.page.editors().value(&EditorId::SUMMARY),
            Some("unsaved summary")
        );
    }

    #[test]
    fn scheduler_reaches_editors_and_timers_render() {
        let scheduler = ManualScheduler::default();
        let mut f = mounted(PageKind::Create);
        f.page.set_scheduler(Rc::new(scheduler.clone()));
        f.page.toggle_view(&EditorId::CODE);
        assert_eq!(
            f.page.editor(&EditorId::CODE).unwrap().view_mode(),
            ViewMode::Preview
        );

        let t0 = Instant::now();
        f.page.handle_input(&EditorId::CODE, "$x$", t0);
        let token = scheduler.last_token(&EditorId::CODE).unwrap();
        assert_eq!(scheduler.scheduled()[0].2, Duration::from_millis(500));
        assert!(!f.page.fire_render(&EditorId::SUMMARY, token));
        assert!(f.page.fire_render(&EditorId::CODE, token));
        let html = f.page.editor(&EditorId::CODE).unwrap().rendered_html().unwrap();
        assert!(html.contains("<math"));
    }

    #[test]
    fn poll_renders_due_editors() {
        let mut f = mounted(PageKind::Create);
        f.page.switch_view(&EditorId::SUMMARY, ViewMode::Preview);
        f.page.switch_view(&EditorId::CODE, ViewMode::Preview);
        let t0 = Instant::now();
        f.page.handle_input(&EditorId::SUMMARY, "a", t0);
        f.page.handle_input(&EditorId::CODE, "b", t0);
        assert_eq!(f.page.poll(t0 + Duration::from_millis(100)), 0);
        assert_eq!(f.page.poll(t0 + Duration::from_millis(500)), 2);
    }

    #[test]
    fn autosave_can_be_disabled() {
        let config = EditorConfig::from_json(r#"{"autosave": {"enabled": false}}"#).unwrap();
        let f = fixture(PageKind::Create, config);
        assert!(!f.page.has_autosave());
    }

    #[test]
    fn unmount_destroys_editors() {
        let mut f = mounted(PageKind::Create);
        f.page.unmount();
        f.page.unmount();
        assert!(f.page.editors().is_empty());
        assert_eq!(f.page.state(), SessionState::Initializing);
    }
}
