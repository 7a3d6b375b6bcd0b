//! Host environment: the live document a component mounts into.
//!
//! The mount pipeline only talks to [`HostEnvironment`]. [`Document`] is the html5ever
//! backed implementation used by the crate's own runtime and tests.

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::fmt;

use crate::dom::{self, SimpleSelector};

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque handle to a node in the host tree. Equality is node identity.
#[derive(Clone)]
pub struct NodeHandle(Handle);

impl NodeHandle {
    pub fn new(handle: Handle) -> Self {
        NodeHandle(handle)
    }

    pub fn handle(&self) -> &Handle {
        &self.0
    }

    pub fn ptr_eq(&self, other: &NodeHandle) -> bool {
        std::rc::Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_element(&self) -> bool {
        dom::is_element(&self.0)
    }

    pub fn tag_name(&self) -> Option<String> {
        dom::tag_name(&self.0)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        dom::attribute(&self.0, name)
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.data {
            NodeData::Element { name, .. } => write!(f, "NodeHandle(<{}>)", name.local),
            NodeData::Text { .. } => write!(f, "NodeHandle(#text)"),
            NodeData::Comment { .. } => write!(f, "NodeHandle(#comment)"),
            NodeData::Document => write!(f, "NodeHandle(#document)"),
            NodeData::Doctype { .. } => write!(f, "NodeHandle(#doctype)"),
            NodeData::ProcessingInstruction { .. } => write!(f, "NodeHandle(#pi)"),
        }
    }
}

/// Where to mount: a selector still to be resolved, or an already located node.
#[derive(Debug, Clone, PartialEq)]
pub enum HostRef {
    Selector(String),
    Node(NodeHandle),
}

impl From<&str> for HostRef {
    fn from(selector: &str) -> Self {
        HostRef::Selector(selector.to_string())
    }
}

impl From<String> for HostRef {
    fn from(selector: String) -> Self {
        HostRef::Selector(selector)
    }
}

impl From<NodeHandle> for HostRef {
    fn from(node: NodeHandle) -> Self {
        HostRef::Node(node)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

pub trait HostEnvironment {
    /// First element matching `selector`, or `None`.
    fn query(&self, selector: &str) -> Option<NodeHandle>;

    /// The `<html>` element.
    fn document_element(&self) -> Option<NodeHandle>;

    fn body(&self) -> Option<NodeHandle>;

    /// `innerHTML`; `None` for nodes that have none (text, comments).
    fn inner_html(&self, node: &NodeHandle) -> Option<String> {
        if !node.is_element() {
            return None;
        }
        Some(dom::serialize_children(node.handle()))
    }

    /// `outerHTML`; `None` when the host lacks the primitive for this node.
    fn outer_html(&self, node: &NodeHandle) -> Option<String> {
        dom::serialize_node(node.handle())
    }

    /// A new element that is not attached to the document.
    fn create_element(&self, tag: &str) -> NodeHandle {
        NodeHandle::new(dom::new_element(tag))
    }

    /// Append a deep copy of `node` to `parent`.
    fn append_clone(&self, parent: &NodeHandle, node: &NodeHandle) {
        dom::append(parent.handle(), dom::deep_clone(node.handle()));
    }

    /// Whether serialized attribute values come back with `\n` encoded as `&#10;`.
    fn encodes_attribute_newlines(&self, href: bool) -> bool {
        dom::serializer_encodes_newlines(href)
    }

    /// Resolve a mount reference to a node. Selectors that match nothing yield `None`.
    fn resolve(&self, host_ref: &HostRef) -> Option<NodeHandle> {
        match host_ref {
            HostRef::Selector(selector) => self.query(selector),
            HostRef::Node(node) => Some(node.clone()),
        }
    }

    /// `<html>` and `<body>` may never be mount targets.
    fn is_document_root(&self, node: &NodeHandle) -> bool {
        self.document_element().is_some_and(|root| root.ptr_eq(node))
            || self.body().is_some_and(|body| body.ptr_eq(node))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Parsed HTML document.
pub struct Document {
    dom: RcDom,
    outer_html_supported: bool,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Document {
            dom: dom::parse_html_document(html),
            outer_html_supported: true,
        }
    }

    /// Emulates hosts that have no `outerHTML` primitive.
    pub fn without_outer_html(mut self) -> Self {
        self.outer_html_supported = false;
        self
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle::new(self.dom.document.clone())
    }

    /// Serialized markup of the whole document body, for inspection.
    pub fn body_html(&self) -> String {
        self.body()
            .and_then(|body| self.inner_html(&body))
            .unwrap_or_default()
    }

    fn find_element(&self, tag: &str) -> Option<NodeHandle> {
        dom::find_first(&self.dom.document, &|node: &Handle| {
            dom::tag_name(node).is_some_and(|t| t == tag)
        })
        .map(NodeHandle::new)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("outer_html_supported", &self.outer_html_supported)
            .finish()
    }
}

impl HostEnvironment for Document {
    fn query(&self, selector: &str) -> Option<NodeHandle> {
        let selector = SimpleSelector::parse(selector)?;
        dom::find_first(&self.dom.document, &|node: &Handle| selector.matches(node)).map(NodeHandle::new)
    }

    fn document_element(&self) -> Option<NodeHandle> {
        self.find_element("html")
    }

    fn body(&self) -> Option<NodeHandle> {
        self.find_element("body")
    }

    fn outer_html(&self, node: &NodeHandle) -> Option<String> {
        if !self.outer_html_supported {
            return None;
        }
        dom::serialize_node(node.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>t</title></head>
<body><div id="app" class="shell main"><p>Hello</p></div><span class="main">x</span></body></html>"#;

    #[test]
    fn test_query_by_id_class_and_tag() {
        let doc = Document::parse(PAGE);
        let app = doc.query("#app").unwrap();
        assert_eq!(app.tag_name().as_deref(), Some("div"));
        assert_eq!(doc.query(".main").unwrap(), app);
        assert_eq!(doc.query("span.main").unwrap().tag_name().as_deref(), Some("span"));
        assert_eq!(doc.query("div#app.shell").unwrap(), app);
        assert!(doc.query("#missing").is_none());
        assert!(doc.query("div p").is_none());
    }

    #[test]
    fn test_inner_and_outer_html() {
        let doc = Document::parse(PAGE);
        let app = doc.query("#app").unwrap();
        assert_eq!(doc.inner_html(&app).as_deref(), Some("<p>Hello</p>"));
        assert_eq!(
            doc.outer_html(&app).as_deref(),
            Some(r#"<div id="app" class="shell main"><p>Hello</p></div>"#)
        );

        let legacy = Document::parse(PAGE).without_outer_html();
        let app = legacy.query("#app").unwrap();
        assert!(legacy.outer_html(&app).is_none());
    }

    #[test]
    fn test_document_roots() {
        let doc = Document::parse(PAGE);
        let body = doc.query("body").unwrap();
        let html = doc.query("html").unwrap();
        assert!(doc.is_document_root(&body));
        assert!(doc.is_document_root(&html));
        assert!(!doc.is_document_root(&doc.query("#app").unwrap()));
    }

    #[test]
    fn test_text_nodes_have_no_inner_html() {
        let doc = Document::parse(PAGE);
        let p = doc.query("p").unwrap();
        let text = NodeHandle::new(p.handle().children.borrow()[0].clone());
        assert!(!text.is_element());
        assert!(doc.inner_html(&text).is_none());
        assert!(doc.outer_html(&text).is_none());
    }
}
