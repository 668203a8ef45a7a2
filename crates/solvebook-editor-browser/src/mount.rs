//! Builds editor fixtures inside page containers.
//!
//! A container is either a `<textarea>`, which is adopted as the editing
//! surface with the toolbar and preview placed around it, or any other
//! element, which receives a fresh toolbar, surface and preview.

use std::cell::RefCell;
use std::rc::Weak;

use gloo_events::EventListener;
use gloo_timers::callback::Timeout;
use solvebook_editor_core::{
    EditorId, EditorMount, EditorSurface, EngineKind, Messages, MountRequest, MountedEditor,
    PageController, PlatformError, Subscription, ViewMode,
};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlTextAreaElement};
use web_time::Instant;

use crate::dom::{DomFixture, create_element, js_error, with_page};
use crate::surface::{ContentEditableSurface, DomPreview, TextareaSurface, ToggleButtons};

pub struct DomMount {
    document: Document,
    page: Weak<RefCell<PageController>>,
    edit_label: String,
    preview_label: String,
}

impl DomMount {
    pub fn new(document: Document, page: Weak<RefCell<PageController>>, messages: &Messages) -> Self {
        Self {
            document,
            page,
            edit_label: messages.edit_label.clone(),
            preview_label: messages.preview_label.clone(),
        }
    }

    fn toolbar(&self, id: &EditorId) -> Result<(HtmlElement, ToggleButtons, Vec<Subscription>), PlatformError> {
        let toolbar = create_element(&self.document, "div", "sb-toolbar")?;
        let mut listeners = Vec::with_capacity(2);
        let mut button = |label: &str, mode: ViewMode| -> Result<HtmlElement, PlatformError> {
            let button = create_element(&self.document, "button", "sb-toggle")?;
            button.set_attribute("type", "button").map_err(js_error)?;
            button.set_inner_text(label);
            toolbar.append_child(&button).map_err(js_error)?;
            let page = self.page.clone();
            let id = id.clone();
            listeners.push(Subscription::new(EventListener::new(&button, "click", move |_| {
                with_page(&page, |page| page.switch_view(&id, mode));
            })));
            Ok(button)
        };
        let edit = button(&self.edit_label, ViewMode::Edit)?;
        let preview = button(&self.preview_label, ViewMode::Preview)?;
        Ok((toolbar, ToggleButtons { edit, preview }, listeners))
    }

    fn input_listener<S>(&self, target: &HtmlElement, id: &EditorId, surface: S) -> Subscription
    where
        S: EditorSurface + 'static,
    {
        let page = self.page.clone();
        let id = id.clone();
        Subscription::new(EventListener::new(target, "input", move |_| {
            let text = surface.value();
            with_page(&page, |page| page.handle_input(&id, text, Instant::now()));
        }))
    }

    /// Wire a surface: input listener, placeholder, and the readiness tick
    /// for contenteditable.
    fn build_surface(
        &self,
        request: &MountRequest,
        guards: &mut Vec<Subscription>,
    ) -> Result<(HtmlElement, Box<dyn EditorSurface>), PlatformError> {
        match request.engine {
            EngineKind::ContentEditable => {
                let element = create_element(&self.document, "div", "sb-input sb-contenteditable")?;
                element.set_content_editable("true");
                element
                    .set_attribute("data-placeholder", &request.placeholder)
                    .map_err(js_error)?;
                let surface = ContentEditableSurface::new(element.clone());
                guards.push(self.input_listener(&element, &request.id, surface.clone()));

                let page = self.page.clone();
                let id = request.id.clone();
                let ready = surface.clone();
                guards.push(Subscription::new(Timeout::new(0, move || {
                    ready.mark_ready();
                    with_page(&page, |page| page.surface_ready(&id));
                })));
                Ok((element, Box::new(surface)))
            }
            engine => {
                if engine == EngineKind::Buffer {
                    tracing::warn!(editor = %request.id, "buffer engine is native only, using a textarea");
                }
                let element = create_element(&self.document, "textarea", "sb-input")?;
                let textarea = element
                    .clone()
                    .dyn_into::<HtmlTextAreaElement>()
                    .map_err(|_| PlatformError::from("created textarea has the wrong type"))?;
                textarea.set_placeholder(&request.placeholder);
                let surface = TextareaSurface::new(textarea);
                guards.push(self.input_listener(&element, &request.id, surface.clone()));
                Ok((element, Box::new(surface)))
            }
        }
    }

    fn adopt_textarea(
        &self,
        request: &MountRequest,
        textarea: HtmlTextAreaElement,
    ) -> Result<MountedEditor, PlatformError> {
        if request.engine != EngineKind::Textarea {
            tracing::debug!(editor = %request.id, "container is a textarea, adopting it");
        }
        let (toolbar, controls, mut guards) = self.toolbar(&request.id)?;
        let preview = create_element(&self.document, "div", "sb-preview")?;
        textarea.before_with_node_1(&toolbar).map_err(js_error)?;
        textarea.after_with_node_1(&preview).map_err(js_error)?;
        if textarea.placeholder().is_empty() {
            textarea.set_placeholder(&request.placeholder);
        }

        let surface = TextareaSurface::new(textarea.clone());
        let element: &HtmlElement = textarea.as_ref();
        guards.push(self.input_listener(element, &request.id, surface.clone()));
        guards.push(Subscription::new(DomFixture::Created(toolbar.into())));
        guards.push(Subscription::new(DomFixture::Created(preview.clone().into())));
        guards.push(Subscription::new(DomFixture::Adopted(element.clone())));

        Ok(MountedEditor {
            surface: Box::new(surface),
            preview: Box::new(DomPreview::new(preview)),
            controls: Some(Box::new(controls)),
            guards,
        })
    }

    fn build_inside(
        &self,
        request: &MountRequest,
        container: &Element,
    ) -> Result<MountedEditor, PlatformError> {
        let wrapper = create_element(&self.document, "div", "sb-editor")?;
        wrapper
            .set_attribute("data-editor", request.id.as_str())
            .map_err(js_error)?;
        let (toolbar, controls, mut guards) = self.toolbar(&request.id)?;
        let (input, surface) = self.build_surface(request, &mut guards)?;
        let preview = create_element(&self.document, "div", "sb-preview")?;
        wrapper.append_child(&toolbar).map_err(js_error)?;
        wrapper.append_child(&input).map_err(js_error)?;
        wrapper.append_child(&preview).map_err(js_error)?;
        container.append_child(&wrapper).map_err(js_error)?;
        guards.push(Subscription::new(DomFixture::Created(wrapper.into())));

        Ok(MountedEditor {
            surface,
            preview: Box::new(DomPreview::new(preview)),
            controls: Some(Box::new(controls)),
            guards,
        })
    }
}

impl EditorMount for DomMount {
    fn mount(&mut self, request: &MountRequest) -> Result<Option<MountedEditor>, PlatformError> {
        let Some(container) = self.document.get_element_by_id(&request.container) else {
            return Ok(None);
        };
        let mounted = match container.dyn_into::<HtmlTextAreaElement>() {
            Ok(textarea) => self.adopt_textarea(request, textarea)?,
            Err(container) => self.build_inside(request, &container)?,
        };
        Ok(Some(mounted))
    }
}
