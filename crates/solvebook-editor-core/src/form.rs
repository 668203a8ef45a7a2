//! Gatekeeper between the editors and the host form's native submission.

use smol_str::SmolStr;

use crate::error::{EditorError, PlatformError};
use crate::messages::Messages;
use crate::platform::HostForm;
use crate::registry::EditorRegistry;
use crate::types::EditorId;

pub const TITLE_FIELD: &str = "title";
pub const URL_FIELD: &str = "url";

/// Which editors and plain inputs a form submission depends on.
///
/// Each editor serializes into the form field named after its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormBinding {
    pub summary: Option<EditorId>,
    pub code: EditorId,
    /// Plain inputs that must be non-empty after trimming.
    pub required_inputs: Vec<SmolStr>,
}

impl Default for FormBinding {
    fn default() -> Self {
        Self {
            summary: Some(EditorId::SUMMARY),
            code: EditorId::CODE,
            required_inputs: vec![SmolStr::new(TITLE_FIELD), SmolStr::new(URL_FIELD)],
        }
    }
}

impl FormBinding {
    pub fn editors(&self) -> impl Iterator<Item = &EditorId> {
        self.summary.iter().chain(std::iter::once(&self.code))
    }
}

/// What the page submits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionDraft {
    pub title: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub code: String,
}

impl SolutionDraft {
    /// `code` must contain something other than whitespace.
    pub fn validate(&self, messages: &Messages) -> Result<(), EditorError> {
        if self.code.trim().is_empty() {
            return Err(EditorError::Validation {
                field: SmolStr::new("code"),
                message: messages.code_required.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Initializing,
    Ready,
    Submitting,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Fields are written; let the native submission go ahead.
    Proceed(SolutionDraft),
    /// Cancel the native submission. Nothing was left half-written.
    Blocked(EditorError),
}

impl SubmitOutcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, SubmitOutcome::Proceed(_))
    }
}

#[derive(Debug)]
pub struct FormSubmissionController {
    binding: FormBinding,
    state: SessionState,
}

impl FormSubmissionController {
    pub fn attach(binding: FormBinding) -> Self {
        Self {
            binding,
            state: SessionState::Initializing,
        }
    }

    pub fn binding(&self) -> &FormBinding {
        &self.binding
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The page finished mounting its editors.
    pub fn mark_ready(&mut self) {
        if self.state == SessionState::Initializing {
            self.state = SessionState::Ready;
        }
    }

    /// Validate and serialize. Called from the form's submit event, before
    /// the native submission happens.
    pub fn submit(
        &mut self,
        editors: &EditorRegistry,
        form: &mut dyn HostForm,
        messages: &Messages,
    ) -> SubmitOutcome {
        let code_ready = editors.get(&self.binding.code).is_some_and(|e| e.is_ready());
        if self.state == SessionState::Initializing || !code_ready {
            tracing::info!(editor = %self.binding.code, "submission blocked, editor not ready");
            return SubmitOutcome::Blocked(EditorError::NotReady {
                id: self.binding.code.clone(),
            });
        }

        self.state = SessionState::Submitting;
        match self.prepare(editors, form, messages) {
            Ok(draft) => {
                self.state = SessionState::Submitted;
                tracing::info!(
                    code_len = draft.code.len(),
                    summary_len = draft.summary.as_ref().map_or(0, String::len),
                    "submission proceeding"
                );
                SubmitOutcome::Proceed(draft)
            }
            Err(err) => {
                self.state = SessionState::Ready;
                tracing::info!(error = %err, "submission blocked");
                SubmitOutcome::Blocked(err)
            }
        }
    }

    fn prepare(
        &self,
        editors: &EditorRegistry,
        form: &mut dyn HostForm,
        messages: &Messages,
    ) -> Result<SolutionDraft, EditorError> {
        let summary = self
            .binding
            .summary
            .as_ref()
            .and_then(|id| editors.value(id))
            .map(str::to_string);
        let draft = SolutionDraft {
            title: form.field_value(TITLE_FIELD),
            url: form.field_value(URL_FIELD),
            summary,
            code: editors
                .value(&self.binding.code)
                .unwrap_or_default()
                .to_string(),
        };

        if let Err(err) = draft.validate(messages) {
            if let Some(editor) = editors.get(&self.binding.code) {
                if let Err(focus_err) = editor.focus() {
                    tracing::warn!(error = %focus_err, "could not focus code editor");
                }
            }
            return Err(err);
        }

        for field in &self.binding.required_inputs {
            let filled = form
                .field_value(field)
                .is_some_and(|v| !v.trim().is_empty());
            if !filled {
                if let Err(err) = form.focus_field(field) {
                    tracing::warn!(field = %field, error = %err, "could not focus field");
                }
                return Err(EditorError::Validation {
                    field: field.clone(),
                    message: messages.field_required(field),
                });
            }
        }

        let mut writes: Vec<(SmolStr, &str)> = Vec::with_capacity(2);
        if let (Some(id), Some(summary)) = (&self.binding.summary, &draft.summary) {
            writes.push((SmolStr::new(id), summary));
        }
        writes.push((SmolStr::new(&self.binding.code), &draft.code));
        write_all(form, &writes)?;

        Ok(draft)
    }
}

/// Write every field or none: on failure, fields already written get their
/// previous values back.
fn write_all(form: &mut dyn HostForm, writes: &[(SmolStr, &str)]) -> Result<(), EditorError> {
    let mut written: Vec<(&SmolStr, Option<String>)> = Vec::with_capacity(writes.len());
    for (field, value) in writes {
        let previous = form.field_value(field);
        let result = form
            .ensure_field(field)
            .and_then(|()| form.set_field_value(field, value));
        if let Err(source) = result {
            tracing::warn!(field = %field, error = %source, "form write failed, rolling back");
            rollback(form, &written);
            return Err(EditorError::Serialization {
                field: field.clone(),
                source,
            });
        }
        written.push((field, previous));
    }
    Ok(())
}

fn rollback(form: &mut dyn HostForm, written: &[(&SmolStr, Option<String>)]) {
    for (field, previous) in written.iter().rev() {
        let restored: Result<(), PlatformError> =
            form.set_field_value(field, previous.as_deref().unwrap_or_default());
        if let Err(err) = restored {
            tracing::error!(field = %field, error = %err, "could not restore form field");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use solvebook_renderer::Renderer;

    use super::*;
    use crate::editor::EditorInstance;
    use crate::memory::{MemoryForm, MemoryMount};
    use crate::platform::MountRequest;
    use crate::types::EngineKind;

    struct Page {
        mount: MemoryMount,
        editors: EditorRegistry,
        controller: FormSubmissionController,
        messages: Messages,
    }

    impl Page {
        fn new(binding: FormBinding) -> Self {
            let mut mount = MemoryMount::solution_page();
            let mut editors = EditorRegistry::new();
            for id in binding.editors() {
                let request = MountRequest {
                    container: id.container(),
                    id: id.clone(),
                    placeholder: String::new(),
                    engine: EngineKind::Buffer,
                };
                editors.insert(EditorInstance::create(
                    &mut mount,
                    request,
                    Rc::new(Renderer::default()),
                    Duration::from_millis(500),
                ));
            }
            let mut controller = FormSubmissionController::attach(binding);
            controller.mark_ready();
            Self {
                mount,
                editors,
                controller,
                messages: Messages::english(),
            }
        }

        fn set(&mut self, id: EditorId, text: &str) {
            self.editors.get_mut(&id).unwrap().set_value(text);
        }

        fn submit(&mut self, form: &mut MemoryForm) -> SubmitOutcome {
            self.controller
                .submit(&self.editors, form, &self.messages)
        }
    }

    fn editors_only() -> FormBinding {
        FormBinding {
            required_inputs: Vec::new(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_code_never_reaches_the_form() {
        let mut page = Page::new(editors_only());
        let mut form = MemoryForm::new();
        for code in ["", "   \n\t"] {
            page.set(EditorId::CODE, code);
            let outcome = page.submit(&mut form);
            assert!(matches!(
                outcome,
                SubmitOutcome::Blocked(EditorError::Validation { ref field, .. }) if field == "code"
            ));
            assert_eq!(form.writes("code"), 0);
            assert_eq!(form.writes("summary"), 0);
        }
        assert_eq!(page.controller.state(), SessionState::Ready);
        let code = page.mount.surface_state(&EditorId::CODE).unwrap();
        assert!(code.borrow().focused);
    }

    #[test]
    fn code_is_written_exactly_once() {
        let mut page = Page::new(editors_only());
        let mut form = MemoryForm::new();
        page.set(EditorId::CODE, "x");
        let outcome = page.submit(&mut form);
        assert!(outcome.is_proceed());
        assert_eq!(form.value("code"), Some("x"));
        assert_eq!(form.writes("code"), 1);
        assert_eq!(page.controller.state(), SessionState::Submitted);
    }

    #[test]
    fn empty_summary_and_code_both_written() {
        let mut page = Page::new(editors_only());
        let mut form = MemoryForm::new();
        page.set(EditorId::SUMMARY, "");
        page.set(EditorId::CODE, "ok");
        let SubmitOutcome::Proceed(draft) = page.submit(&mut form) else {
            panic!("submission should proceed");
        };
        assert_eq!(draft.summary.as_deref(), Some(""));
        assert_eq!(draft.code, "ok");
        assert_eq!(form.value("summary"), Some(""));
        assert_eq!(form.value("code"), Some("ok"));
        assert_eq!(form.created(), ["summary", "code"]);
    }

    #[test]
    fn values_are_written_verbatim() {
        let mut page = Page::new(editors_only());
        let mut form = MemoryForm::new()
            .with_field("summary", "stale")
            .with_field("code", "stale");
        let code = "  $$\\sum_i x_i$$\n```cpp\nint main(){}\n```\n";
        page.set(EditorId::CODE, code);
        assert!(page.submit(&mut form).is_proceed());
        assert_eq!(form.value("code"), Some(code));
        assert!(form.created().is_empty());
    }

    #[test]
    fn not_ready_before_mount_completes() {
        let mut controller = FormSubmissionController::attach(editors_only());
        let editors = EditorRegistry::new();
        let mut form = MemoryForm::new();
        let outcome = controller.submit(&editors, &mut form, &Messages::english());
        assert_eq!(
            outcome,
            SubmitOutcome::Blocked(EditorError::NotReady { id: EditorId::CODE })
        );
        assert_eq!(controller.state(), SessionState::Initializing);
    }

    #[test]
    fn unready_surface_blocks_submission() {
        let mut mount = MemoryMount::solution_page().with_unready_surfaces();
        let mut editors = EditorRegistry::new();
        editors.insert(EditorInstance::create(
            &mut mount,
            MountRequest {
                container: EditorId::CODE.container(),
                id: EditorId::CODE,
                placeholder: String::new(),
                engine: EngineKind::Buffer,
            },
            Rc::new(Renderer::default()),
            Duration::from_millis(500),
        ));
        let mut controller = FormSubmissionController::attach(editors_only());
        controller.mark_ready();
        let outcome = controller.submit(&editors, &mut MemoryForm::new(), &Messages::english());
        assert!(matches!(outcome, SubmitOutcome::Blocked(EditorError::NotReady { .. })));
    }

    #[test]
    fn required_inputs_are_checked_after_code() {
        let mut page = Page::new(FormBinding::default());
        let mut form = MemoryForm::new().with_field("title", "Two sum");
        page.set(EditorId::CODE, "ok");
        let outcome = page.submit(&mut form);
        let SubmitOutcome::Blocked(EditorError::Validation { field, message }) = outcome else {
            panic!("expected a validation failure, got {outcome:?}");
        };
        assert_eq!(field, "url");
        assert_eq!(message, "Please enter the problem URL!");
        assert_eq!(form.focused().as_deref(), Some("url"));
        assert_eq!(form.writes("code"), 0);

        let mut form = form.with_field("url", "https://codeforces.com/problemset/problem/1/A");
        let SubmitOutcome::Proceed(draft) = page.submit(&mut form) else {
            panic!("submission should proceed");
        };
        assert_eq!(draft.title.as_deref(), Some("Two sum"));
    }

    #[test]
    fn failed_write_rolls_back() {
        let mut page = Page::new(editors_only());
        let mut form = MemoryForm::new()
            .with_field("summary", "previous summary")
            .with_field("code", "previous code")
            .failing_on("code");
        page.set(EditorId::SUMMARY, "new summary");
        page.set(EditorId::CODE, "new code");

        let outcome = page.submit(&mut form);
        assert!(matches!(
            outcome,
            SubmitOutcome::Blocked(EditorError::Serialization { ref field, .. }) if field == "code"
        ));
        assert_eq!(form.value("summary"), Some("previous summary"));
        assert_eq!(form.value("code"), Some("previous code"));
        assert_eq!(page.controller.state(), SessionState::Ready);
        assert_eq!(page.editors.value(&EditorId::CODE), Some("new code"));
    }
}
