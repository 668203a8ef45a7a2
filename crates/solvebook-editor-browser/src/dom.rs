//! DOM helpers shared by the mount, the form and the bindings.

use std::cell::RefCell;
use std::rc::Weak;

use solvebook_editor_core::{Notifier, PageController, PlatformError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement};

/// Turn a thrown JS value into a [`PlatformError`].
pub fn js_error(err: JsValue) -> PlatformError {
    if let Some(message) = err.as_string() {
        return PlatformError(message);
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return PlatformError(String::from(error.message()));
    }
    PlatformError(format!("{err:?}"))
}

pub fn document() -> Result<Document, PlatformError> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| PlatformError::from("no document available"))
}

/// Create an element with a class attribute.
pub fn create_element(
    document: &Document,
    tag: &str,
    class: &str,
) -> Result<HtmlElement, PlatformError> {
    let element = document
        .create_element(tag)
        .map_err(js_error)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| PlatformError(format!("<{tag}> is not an HtmlElement")))?;
    element.set_class_name(class);
    Ok(element)
}

/// Run `f` against the page, unless it was dropped or is busy handling
/// another event.
pub(crate) fn with_page<R>(
    page: &Weak<RefCell<PageController>>,
    f: impl FnOnce(&mut PageController) -> R,
) -> Option<R> {
    let page = page.upgrade()?;
    let Ok(mut page) = page.try_borrow_mut() else {
        tracing::debug!("page busy, dropping event");
        return None;
    };
    Some(f(&mut page))
}

/// DOM the editor touched, put back when the editor is destroyed.
pub(crate) enum DomFixture {
    /// Created by the editor; removed.
    Created(Element),
    /// Owned by the page and hidden by the editor; shown again.
    Adopted(HtmlElement),
}

impl Drop for DomFixture {
    fn drop(&mut self) {
        match self {
            DomFixture::Created(element) => element.remove(),
            DomFixture::Adopted(element) => element.set_hidden(false),
        }
    }
}

/// Shows messages with `window.alert`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertNotifier;

impl Notifier for AlertNotifier {
    fn notify(&self, message: &str) {
        let Some(window) = web_sys::window() else {
            tracing::warn!(%message, "no window to show message");
            return;
        };
        if let Err(err) = window.alert_with_message(message) {
            tracing::warn!(error = %js_error(err), "alert failed");
        }
    }
}
