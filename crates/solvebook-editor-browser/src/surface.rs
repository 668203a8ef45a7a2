//! Editing surfaces, preview pane and toggle buttons over real elements.

use std::cell::Cell;
use std::rc::Rc;

use solvebook_editor_core::{
    EditorSurface, PlatformError, PreviewTarget, ViewControls, ViewMode,
};
use web_sys::{HtmlElement, HtmlTextAreaElement};

use crate::dom::js_error;

const ACTIVE_CLASS: &str = "sb-active";

/// A plain `<textarea>`.
#[derive(Debug, Clone)]
pub struct TextareaSurface {
    element: HtmlTextAreaElement,
}

impl TextareaSurface {
    pub fn new(element: HtmlTextAreaElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlTextAreaElement {
        &self.element
    }
}

impl EditorSurface for TextareaSurface {
    fn value(&self) -> String {
        self.element.value()
    }

    fn set_value(&mut self, text: &str) -> Result<(), PlatformError> {
        self.element.set_value(text);
        Ok(())
    }

    fn focus(&self) -> Result<(), PlatformError> {
        self.element.focus().map_err(js_error)
    }

    fn set_visible(&mut self, visible: bool) {
        self.element.set_hidden(!visible);
    }
}

/// A `contenteditable` element holding plain text.
///
/// It accepts values only after the next tick, once the browser has laid it
/// out; earlier values wait as pending hydration.
#[derive(Debug, Clone)]
pub struct ContentEditableSurface {
    element: HtmlElement,
    ready: Rc<Cell<bool>>,
}

impl ContentEditableSurface {
    pub fn new(element: HtmlElement) -> Self {
        Self {
            element,
            ready: Rc::new(Cell::new(false)),
        }
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.set(true);
    }
}

impl EditorSurface for ContentEditableSurface {
    fn value(&self) -> String {
        self.element.inner_text()
    }

    fn set_value(&mut self, text: &str) -> Result<(), PlatformError> {
        if !self.ready.get() {
            return Err("contenteditable surface is not ready".into());
        }
        self.element.set_inner_text(text);
        Ok(())
    }

    fn focus(&self) -> Result<(), PlatformError> {
        self.element.focus().map_err(js_error)
    }

    fn set_visible(&mut self, visible: bool) {
        self.element.set_hidden(!visible);
    }

    fn is_ready(&self) -> bool {
        self.ready.get()
    }
}

#[derive(Debug, Clone)]
pub struct DomPreview {
    element: HtmlElement,
}

impl DomPreview {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }
}

impl PreviewTarget for DomPreview {
    fn replace_html(&mut self, html: &str) -> Result<(), PlatformError> {
        self.element.set_inner_html(html);
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.element.set_hidden(!visible);
    }
}

/// The Edit / Preview button pair.
#[derive(Debug, Clone)]
pub struct ToggleButtons {
    pub edit: HtmlElement,
    pub preview: HtmlElement,
}

impl ViewControls for ToggleButtons {
    fn reflect(&mut self, mode: ViewMode) {
        for (button, active) in [
            (&self.edit, mode == ViewMode::Edit),
            (&self.preview, mode == ViewMode::Preview),
        ] {
            if let Err(err) = button
                .class_list()
                .toggle_with_force(ACTIVE_CLASS, active)
            {
                tracing::warn!(error = %js_error(err), "could not update toggle button");
            }
            let pressed = if active { "true" } else { "false" };
            if let Err(err) = button.set_attribute("aria-pressed", pressed) {
                tracing::warn!(error = %js_error(err), "could not update toggle button");
            }
        }
    }
}
