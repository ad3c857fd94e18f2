//! Embed content model and the host container seam.
//!
//! Embedders describe what they want to show as an [`EmbedNode`] tree and
//! append it to a [`Container`]. The browser crate turns nodes into real
//! elements; [`MemoryContainer`] keeps them around as data.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::Write;

use smol_str::SmolStr;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &["img", "br", "hr", "input", "meta", "link"];

/// A lightweight element description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbedNode {
    pub tag: SmolStr,
    /// Attributes in insertion order. Setting an existing name replaces it.
    pub attributes: Vec<(SmolStr, String)>,
    pub text: Option<String>,
    pub children: Vec<EmbedNode>,
}

impl EmbedNode {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: EmbedNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn set_attr(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) {
        set_attribute(&mut self.attributes, name.into(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        get_attribute(&self.attributes, name)
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    /// Serialize to an HTML string with escaped text and attribute values.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        write_open_tag(out, &self.tag, &self.attributes);
        if self.is_void() {
            return;
        }
        if let Some(text) = &self.text {
            out.push_str(&html_escape::encode_text(text));
        }
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn set_attribute(attributes: &mut Vec<(SmolStr, String)>, name: SmolStr, value: String) {
    match attributes.iter_mut().find(|(n, _)| *n == name) {
        Some((_, existing)) => *existing = value,
        None => attributes.push((name, value)),
    }
}

fn get_attribute<'a>(attributes: &'a [(SmolStr, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn write_open_tag(out: &mut String, tag: &str, attributes: &[(SmolStr, String)]) {
    let _ = write!(out, "<{tag}");
    for (name, value) in attributes {
        let _ = write!(
            out,
            " {}=\"{}\"",
            name,
            html_escape::encode_double_quoted_attribute(value)
        );
    }
    out.push('>');
}

/// A host-owned element that embed content is rendered into.
///
/// Containers are shared (`Rc<dyn Container>`) between the widget that owns
/// them and any continuation waiting on a third-party library, so all
/// methods take `&self`.
pub trait Container {
    fn set_attribute(&self, name: &str, value: &str);

    /// Append a child built from `node`.
    fn append(&self, node: &EmbedNode);

    /// Remove all children.
    fn clear(&self);

    /// Whether the container is still part of the live document.
    fn is_attached(&self) -> bool;

    /// Remove the container from the document. Idempotent.
    fn detach(&self);

    /// Escape hatch for host-specific embedders (e.g. to reach the real DOM
    /// element behind a browser container).
    fn as_any(&self) -> &dyn Any;

    fn set_style(&self, style: &str) {
        self.set_attribute("style", style);
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    attributes: Vec<(SmolStr, String)>,
    children: Vec<EmbedNode>,
    attached: bool,
}

/// In-memory container. Records everything appended to it.
#[derive(Debug)]
pub struct MemoryContainer {
    tag: SmolStr,
    state: RefCell<MemoryState>,
}

impl MemoryContainer {
    /// New attached `div` with the given class.
    pub fn new(class: &str) -> Self {
        Self::with_tag("div", class)
    }

    pub fn with_tag(tag: &str, class: &str) -> Self {
        let mut state = MemoryState {
            attached: true,
            ..Default::default()
        };
        if !class.is_empty() {
            state.attributes.push(("class".into(), class.to_string()));
        }
        Self {
            tag: tag.into(),
            state: RefCell::new(state),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        get_attribute(&self.state.borrow().attributes, name).map(str::to_string)
    }

    pub fn children(&self) -> Vec<EmbedNode> {
        self.state.borrow().children.clone()
    }

    pub fn to_html(&self) -> String {
        let state = self.state.borrow();
        let node = EmbedNode {
            tag: self.tag.clone(),
            attributes: state.attributes.clone(),
            text: None,
            children: state.children.clone(),
        };
        node.to_html()
    }
}

impl Container for MemoryContainer {
    fn set_attribute(&self, name: &str, value: &str) {
        set_attribute(
            &mut self.state.borrow_mut().attributes,
            name.into(),
            value.to_string(),
        );
    }

    fn append(&self, node: &EmbedNode) {
        let mut state = self.state.borrow_mut();
        if !state.attached {
            tracing::trace!(tag = %node.tag, "appending to detached container");
        }
        state.children.push(node.clone());
    }

    fn clear(&self) {
        self.state.borrow_mut().children.clear();
    }

    fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    fn detach(&self) {
        self.state.borrow_mut().attached = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
