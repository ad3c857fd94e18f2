//! DOM-backed embed containers.

use std::any::Any;
use std::rc::Rc;

use embedloom_core::{Container, EmbedNode, WidgetHost};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement};

/// Build a detached element tree from `node`.
pub fn build_element(document: &Document, node: &EmbedNode) -> Result<Element, JsValue> {
    let element = document.create_element(&node.tag)?;
    for (name, value) in &node.attributes {
        element.set_attribute(name, value)?;
    }
    if let Some(text) = &node.text {
        element.set_text_content(Some(text));
    }
    for child in &node.children {
        let child_element = build_element(document, child)?;
        element.append_child(&child_element)?;
    }
    Ok(element)
}

/// A [`Container`] wrapping a live DOM element.
#[derive(Debug, Clone)]
pub struct DomContainer {
    element: HtmlElement,
}

impl DomContainer {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }

    /// New detached `div` with the given class.
    pub fn create(document: &Document, class: &str) -> Result<Self, JsValue> {
        let element = document
            .create_element("div")?
            .dyn_into::<HtmlElement>()
            .map_err(JsValue::from)?;
        if !class.is_empty() {
            element.set_class_name(class);
        }
        Ok(Self { element })
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    /// The DOM element behind a shared container, if it is one of ours.
    pub fn element_of(container: &Rc<dyn Container>) -> Option<HtmlElement> {
        container
            .as_any()
            .downcast_ref::<DomContainer>()
            .map(|c| c.element.clone())
    }
}

impl Container for DomContainer {
    fn set_attribute(&self, name: &str, value: &str) {
        if let Err(e) = self.element.set_attribute(name, value) {
            tracing::warn!(name, "set_attribute failed: {:?}", e);
        }
    }

    fn append(&self, node: &EmbedNode) {
        if !self.element.is_connected() {
            tracing::debug!(tag = %node.tag, "appending to detached container");
        }
        let Some(document) = self.element.owner_document() else {
            tracing::warn!("container has no owner document");
            return;
        };
        let result = build_element(&document, node).and_then(|child| {
            self.element.append_child(&child)?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(tag = %node.tag, "append failed: {:?}", e);
        }
    }

    fn clear(&self) {
        self.element.set_inner_html("");
    }

    fn is_attached(&self) -> bool {
        self.element.is_connected()
    }

    fn detach(&self) {
        self.element.remove();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn set_style(&self, style: &str) {
        self.element.style().set_css_text(style);
    }
}

/// [`WidgetHost`] that creates `div` containers and hands each one to a JS
/// callback `(element, pos) => void` for placement in the editor.
pub struct BrowserWidgetHost {
    document: Document,
    place: js_sys::Function,
}

impl BrowserWidgetHost {
    pub fn new(document: Document, place: js_sys::Function) -> Self {
        Self { document, place }
    }
}

impl WidgetHost for BrowserWidgetHost {
    fn create_container(&self, class: &str) -> Rc<dyn Container> {
        match DomContainer::create(&self.document, class) {
            Ok(container) => Rc::new(container),
            Err(e) => {
                tracing::error!("could not create container element: {:?}", e);
                Rc::new(embedloom_core::MemoryContainer::new(class))
            }
        }
    }

    fn place(&self, container: &Rc<dyn Container>, pos: usize) {
        let Some(element) = DomContainer::element_of(container) else {
            tracing::warn!(pos, "cannot place a non-DOM container");
            return;
        };
        if let Err(e) = self
            .place
            .call2(&JsValue::NULL, &element, &JsValue::from_f64(pos as f64))
        {
            tracing::warn!(pos, "place callback threw: {:?}", e);
        }
    }
}
