//! wasm-bindgen entry points used by the page scripts.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use gloo_timers::callback::Interval;
use smol_str::SmolStr;
use solvebook_editor_core::{
    ConfigError, EditorConfig, EditorId, PageController, PageKind, SubmitOutcome, ViewMode, unix_millis,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlFormElement;

use crate::dom::{AlertNotifier, document, with_page};
use crate::form::DomForm;
use crate::mount::DomMount;
use crate::storage::LocalDraftStore;
use crate::timers::GlooScheduler;

/// A mounted create/edit form. Call `destroy()` when the page goes away.
#[wasm_bindgen]
pub struct SolutionForm {
    page: Rc<RefCell<PageController>>,
    listeners: Vec<EventListener>,
    autosave: Option<Interval>,
}

#[wasm_bindgen]
impl SolutionForm {
    /// Current text of an editor (`"summary"` or `"code"`).
    #[wasm_bindgen(js_name = getValue)]
    pub fn value(&self, editor: &str) -> Option<String> {
        let page = self.page.try_borrow().ok()?;
        page.editors()
            .value(&EditorId::new(editor))
            .map(str::to_string)
    }

    #[wasm_bindgen(js_name = setValue)]
    pub fn set_value(&self, editor: &str, text: String) {
        let id = EditorId::new(editor);
        if let Ok(mut page) = self.page.try_borrow_mut() {
            page.set_value(&id, text);
        }
    }

    /// Show `"edit"` or `"preview"`.
    #[wasm_bindgen(js_name = switchView)]
    pub fn switch_view(&self, editor: &str, mode: &str) -> Result<(), JsError> {
        let mode = match mode {
            "edit" => ViewMode::Edit,
            "preview" => ViewMode::Preview,
            other => return Err(JsError::new(&format!("unknown view mode `{other}`"))),
        };
        if let Ok(mut page) = self.page.try_borrow_mut() {
            page.switch_view(&EditorId::new(editor), mode);
        }
        Ok(())
    }

    pub fn destroy(&mut self) {
        self.listeners.clear();
        self.autosave = None;
        match self.page.try_borrow_mut() {
            Ok(mut page) => page.unmount(),
            Err(_) => tracing::warn!("page busy during destroy"),
        }
    }
}

impl Drop for SolutionForm {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Mount the summary and code editors of the form with id `form_id`.
///
/// `solution_id` marks an edit page; `config_json` is an optional
/// `EditorConfig` object.
#[wasm_bindgen(js_name = mountSolutionForm)]
pub fn mount_solution_form(
    form_id: &str,
    solution_id: Option<String>,
    config_json: Option<String>,
) -> Result<SolutionForm, JsError> {
    let config = EditorConfig::from_json(config_json.as_deref().unwrap_or_default())
        .map_err(|err| JsError::new(&config_error(&err)))?;
    let document = document().map_err(|err| JsError::new(&err.to_string()))?;
    let form = document
        .get_element_by_id(form_id)
        .and_then(|el| el.dyn_into::<HtmlFormElement>().ok())
        .ok_or_else(|| JsError::new(&format!("no <form> with id `{form_id}`")))?;

    let kind = match solution_id {
        Some(id) => PageKind::Edit {
            solution_id: SmolStr::new(id),
        },
        None => PageKind::Create,
    };
    let autosave_interval = config.autosave.interval_ms;
    let page = Rc::new(RefCell::new(
        PageController::new(kind, config, Box::new(AlertNotifier))
            .with_draft_store(Box::new(LocalDraftStore)),
    ));
    let weak = Rc::downgrade(&page);

    {
        let mut controller = page.borrow_mut();
        controller.set_scheduler(Rc::new(GlooScheduler::new(weak.clone())));
        let mut mount = DomMount::new(document, weak.clone(), controller.messages());
        let binding = controller.default_binding();
        let detached = controller.mount(&mut mount, binding);
        if !detached.is_empty() {
            tracing::error!(count = detached.len(), "some editors could not be mounted");
        }
        controller.hydrate_from_form(&DomForm::new(form.clone()));
        let restored = controller.restore_drafts();
        if !restored.is_empty() {
            tracing::info!(editors = ?restored, "restored drafts");
        }
    }

    let submit = {
        let weak = weak.clone();
        let form = form.clone();
        EventListener::new_with_options(
            &form.clone(),
            "submit",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let mut host = DomForm::new(form.clone());
                let outcome = with_page(&weak, |page| page.submit(&mut host));
                if !matches!(outcome, Some(SubmitOutcome::Proceed(_))) {
                    event.prevent_default();
                }
            },
        )
    };

    let autosave = page.borrow().has_autosave().then(|| {
        let weak = weak.clone();
        let millis = u32::try_from(autosave_interval).unwrap_or(u32::MAX);
        Interval::new(millis, move || {
            with_page(&weak, |page| page.autosave_tick(unix_millis()));
        })
    });

    tracing::info!(form = form_id, "solution form mounted");
    Ok(SolutionForm {
        page,
        listeners: vec![submit],
        autosave,
    })
}

fn config_error(err: &ConfigError) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

/// Render markdown+LaTeX to sanitized HTML.
#[wasm_bindgen(js_name = renderMarkdown)]
pub fn render_markdown(source: &str) -> String {
    solvebook_renderer::render_markdown(source)
}

/// Replace an element's text content with its rendered HTML (view page).
#[wasm_bindgen(js_name = renderInPlace)]
pub fn render_in_place(element_id: &str) -> Result<(), JsError> {
    let document = document().map_err(|err| JsError::new(&err.to_string()))?;
    let element = document
        .get_element_by_id(element_id)
        .ok_or_else(|| JsError::new(&format!("no element with id `{element_id}`")))?;
    let source = element.text_content().unwrap_or_default();
    element.set_inner_html(&render_markdown(&source));
    tracing::debug!(element = element_id, bytes = source.len(), "rendered in place");
    Ok(())
}
