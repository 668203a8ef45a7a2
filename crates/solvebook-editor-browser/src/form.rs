use solvebook_editor_core::{HostForm, PlatformError};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, HtmlFormElement, HtmlInputElement, HtmlTextAreaElement};

use crate::dom::{create_element, document, js_error};

/// The page's `<form>`, with fields looked up by `name`.
#[derive(Debug, Clone)]
pub struct DomForm {
    form: HtmlFormElement,
}

impl DomForm {
    pub fn new(form: HtmlFormElement) -> Self {
        Self { form }
    }

    pub fn element(&self) -> &HtmlFormElement {
        &self.form
    }

    fn field(&self, name: &str) -> Option<Element> {
        let selector = format!("[name=\"{name}\"]");
        match self.form.query_selector(&selector) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(field = name, error = %js_error(err), "invalid field selector");
                None
            }
        }
    }
}

impl HostForm for DomForm {
    fn field_value(&self, name: &str) -> Option<String> {
        let field = self.field(name)?;
        if let Some(textarea) = field.dyn_ref::<HtmlTextAreaElement>() {
            Some(textarea.value())
        } else if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
            Some(input.value())
        } else {
            field.text_content()
        }
    }

    fn ensure_field(&mut self, name: &str) -> Result<(), PlatformError> {
        if self.field(name).is_some() {
            return Ok(());
        }
        let textarea = create_element(&document()?, "textarea", "sb-field")?;
        textarea.set_attribute("name", name).map_err(js_error)?;
        textarea.set_hidden(true);
        self.form.append_child(&textarea).map_err(js_error)?;
        tracing::debug!(field = name, "created hidden form field");
        Ok(())
    }

    fn set_field_value(&mut self, name: &str, value: &str) -> Result<(), PlatformError> {
        let field = self
            .field(name)
            .ok_or_else(|| PlatformError(format!("no form field named `{name}`")))?;
        if let Some(textarea) = field.dyn_ref::<HtmlTextAreaElement>() {
            textarea.set_value(value);
        } else if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        } else {
            return Err(PlatformError(format!("form field `{name}` cannot hold text")));
        }
        Ok(())
    }

    fn focus_field(&self, name: &str) -> Result<(), PlatformError> {
        match self.field(name).and_then(|f| f.dyn_into::<HtmlElement>().ok()) {
            Some(field) => field.focus().map_err(js_error),
            None => Ok(()),
        }
    }
}
