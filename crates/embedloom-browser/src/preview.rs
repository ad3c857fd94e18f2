//! Rendered preview sections as a [`PreviewDocument`].

use std::rc::Rc;

use embedloom_core::{Container, LinkElementKind, MemoryContainer, PreviewDocument, PreviewElement};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use crate::container::DomContainer;

const LINK_SELECTOR: &str = "a.external-link, img";

/// An `a.external-link` or `img` inside a preview section.
#[derive(Debug, Clone)]
pub struct DomLinkElement {
    element: Element,
    kind: LinkElementKind,
}

impl DomLinkElement {
    fn from_element(element: Element) -> Self {
        let kind = if element.tag_name().eq_ignore_ascii_case("img") {
            LinkElementKind::Image
        } else {
            LinkElementKind::Anchor
        };
        Self { element, kind }
    }
}

impl PreviewElement for DomLinkElement {
    fn kind(&self) -> LinkElementKind {
        self.kind
    }

    fn target(&self) -> Option<String> {
        match self.kind {
            LinkElementKind::Anchor => self.element.get_attribute("href"),
            LinkElementKind::Image => self.element.get_attribute("src"),
        }
    }

    fn replace_with_container(&self, class: &str) -> Rc<dyn Container> {
        let replaced = self.element.owner_document().ok_or(()).and_then(|document| {
            let container = DomContainer::create(&document, class).map_err(|_| ())?;
            self.element
                .replace_with_with_node_1(container.element())
                .map_err(|_| ())?;
            Ok(container)
        });
        match replaced {
            Ok(container) => Rc::new(container),
            Err(()) => {
                tracing::warn!(class, "could not replace preview element");
                let fallback = MemoryContainer::new(class);
                fallback.detach();
                Rc::new(fallback)
            }
        }
    }
}

/// A preview section root.
#[derive(Debug, Clone)]
pub struct DomPreview {
    root: Element,
}

impl DomPreview {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn from_html_element(root: &HtmlElement) -> Self {
        Self {
            root: root.clone().unchecked_into(),
        }
    }
}

impl PreviewDocument for DomPreview {
    type Element = DomLinkElement;

    fn link_elements(&self) -> Vec<DomLinkElement> {
        let Ok(nodes) = self.root.query_selector_all(LINK_SELECTOR) else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(DomLinkElement::from_element)
            .collect()
    }
}
