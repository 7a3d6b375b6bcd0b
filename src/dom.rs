//! rcdom helpers shared by the host document and the compiler.

use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{
    local_name, namespace_url, ns, parse_document, parse_fragment, LocalName, ParseOpts, QualName,
};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};
use regex::Regex;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

lazy_static! {
    /// Compound selector: optional tag, optional `#id`, any number of `.class`.
    static ref SELECTOR_RE: Regex =
        Regex::new(r"^([A-Za-z][A-Za-z0-9-]*|\*)?(?:#([A-Za-z0-9_-]+))?((?:\.[A-Za-z0-9_-]+)*)$")
            .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parse_html_document(html: &str) -> RcDom {
    parse_document(RcDom::default(), ParseOpts::default()).one(html)
}

/// Parse markup in a `<body>` context. Returns a detached document node whose children
/// are the fragment's top-level nodes.
pub fn parse_html_fragment(markup: &str) -> Handle {
    let dom = parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        vec![],
    )
    .one(markup);

    // Dropping the dom empties every node still reachable from it, so the top-level
    // nodes move to a holder first.
    let holder = Node::new(NodeData::Document);
    let context = dom
        .document
        .children
        .borrow()
        .iter()
        .find(|child| is_element(child))
        .cloned();
    if let Some(context) = context {
        let nodes = std::mem::take(&mut *context.children.borrow_mut());
        for node in nodes {
            append(&holder, node);
        }
    }
    holder
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// rcdom's own serializer skips `<template>` contents; this walk includes them.
struct MarkupTree(Handle);

impl Serialize for MarkupTree {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        match traversal_scope {
            TraversalScope::IncludeNode => write_node(&self.0, serializer),
            TraversalScope::ChildrenOnly(_) => child_nodes(&self.0)
                .iter()
                .try_for_each(|child| write_node(child, serializer)),
        }
    }
}

fn write_node<S: Serializer>(handle: &Handle, serializer: &mut S) -> io::Result<()> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            serializer.start_elem(
                name.clone(),
                attrs.borrow().iter().map(|attr| (&attr.name, &attr.value[..])),
            )?;
            for child in child_nodes(handle) {
                write_node(&child, serializer)?;
            }
            serializer.end_elem(name.clone())
        }
        NodeData::Document => child_nodes(handle)
            .iter()
            .try_for_each(|child| write_node(child, serializer)),
        NodeData::Doctype { name, .. } => serializer.write_doctype(name),
        NodeData::Text { contents } => serializer.write_text(&contents.borrow()),
        NodeData::Comment { contents } => serializer.write_comment(contents),
        NodeData::ProcessingInstruction { target, contents } => {
            serializer.write_processing_instruction(target, contents)
        }
    }
}

fn serialize_with(handle: &Handle, traversal_scope: TraversalScope) -> String {
    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    if serialize(&mut bytes, &MarkupTree(handle.clone()), opts).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Markup of the node's children (`innerHTML`). The element's name is passed as
/// context so raw text in `<script>` and `<style>` stays unescaped.
pub fn serialize_children(handle: &Handle) -> String {
    let context = match &handle.data {
        NodeData::Element { name, .. } => Some(name.clone()),
        _ => None,
    };
    serialize_with(handle, TraversalScope::ChildrenOnly(context))
}

/// Markup of the element including its own tag (`outerHTML`). Elements only.
pub fn serialize_node(handle: &Handle) -> Option<String> {
    if !is_element(handle) {
        return None;
    }
    Some(serialize_with(handle, TraversalScope::IncludeNode))
}

/// Whether the html5ever serializer writes `\n` inside an attribute as `&#10;`.
pub fn serializer_encodes_newlines(href: bool) -> bool {
    let probe = if href {
        "<a href=\"\n\"></a>"
    } else {
        "<div a=\"\n\"></div>"
    };
    serialize_children(&parse_html_fragment(probe)).contains("&#10;")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn is_element(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Element { .. })
}

pub fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn attribute(handle: &Handle, attr_name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// A detached, empty HTML element.
pub fn new_element(tag: &str) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(Vec::new()),
        template_contents: Default::default(),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Child nodes, reading a `<template>` element's contents instead of its children.
pub fn child_nodes(handle: &Handle) -> Vec<Handle> {
    if let NodeData::Element {
        template_contents, ..
    } = &handle.data
    {
        if let Some(contents) = template_contents.borrow().as_ref() {
            return contents.children.borrow().clone();
        }
    }
    handle.children.borrow().clone()
}

pub fn append(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Detached deep copy of a node. The source tree is never touched beyond reads.
pub fn deep_clone(handle: &Handle) -> Handle {
    let data = match &handle.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(deep_clone)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    let copy = Node::new(data);
    for child in handle.children.borrow().iter() {
        append(&copy, deep_clone(child));
    }
    copy
}

/// Depth-first walk in document order; stops at the first node `pred` accepts.
pub fn find_first(handle: &Handle, pred: &dyn Fn(&Handle) -> bool) -> Option<Handle> {
    if pred(handle) {
        return Some(handle.clone());
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_first(child, pred) {
            return Some(found);
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl SimpleSelector {
    pub fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        let caps = SELECTOR_RE.captures(selector)?;
        let tag = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|t| *t != "*")
            .map(str::to_ascii_lowercase);
        let id = caps.get(2).map(|m| m.as_str().to_string());
        let classes = caps
            .get(3)
            .map(|m| {
                m.as_str()
                    .split('.')
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(SimpleSelector { tag, id, classes })
    }

    pub fn matches(&self, handle: &Handle) -> bool {
        let Some(tag) = tag_name(handle) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !tag.eq_ignore_ascii_case(expected) {
                return false;
            }
        }
        if let Some(expected) = &self.id {
            if attribute(handle, "id").as_deref() != Some(expected.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = attribute(handle, "class").unwrap_or_default();
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse() {
        let sel = SimpleSelector::parse("div#app.main.wide").unwrap();
        assert_eq!(sel.tag.as_deref(), Some("div"));
        assert_eq!(sel.id.as_deref(), Some("app"));
        assert_eq!(sel.classes, vec!["main".to_string(), "wide".to_string()]);

        assert!(SimpleSelector::parse("").is_none());
        assert!(SimpleSelector::parse("div > p").is_none());
        assert!(SimpleSelector::parse("[data-x]").is_none());
    }

    #[test]
    fn test_fragment_serialization() {
        let root = parse_html_fragment("<p class=\"a\">x &amp; y</p><span></span>");
        assert_eq!(
            serialize_children(&root),
            "<p class=\"a\">x &amp; y</p><span></span>"
        );
        let first = root.children.borrow()[0].clone();
        assert_eq!(serialize_node(&first).as_deref(), Some("<p class=\"a\">x &amp; y</p>"));
    }

    #[test]
    fn test_deep_clone_is_detached() {
        let root = parse_html_fragment("<ul><li>one</li></ul>");
        let list = root.children.borrow()[0].clone();
        let copy = deep_clone(&list);

        append(&copy, new_element("li"));
        assert_eq!(serialize_node(&list).as_deref(), Some("<ul><li>one</li></ul>"));
        assert_eq!(
            serialize_node(&copy).as_deref(),
            Some("<ul><li>one</li><li></li></ul>")
        );
        assert_eq!(serialize_children(&root), "<ul><li>one</li></ul>");
    }

    #[test]
    fn test_fragment_outlives_parser() {
        let root = parse_html_fragment("<div><p>{{ a }}</p></div>");
        let div = root.children.borrow()[0].clone();
        assert_eq!(tag_name(&div).as_deref(), Some("div"));
        assert_eq!(div.children.borrow().len(), 1);
        assert_eq!(serialize_children(&div), "<p>{{ a }}</p>");
    }

    #[test]
    fn test_script_children_stay_raw() {
        let dom = parse_html_document(
            r#"<html><body><script type="text/x-template" id="t"><p>a &amp; b</p></script></body></html>"#,
        );
        let script = find_first(&dom.document, &|node: &Handle| {
            attribute(node, "id").as_deref() == Some("t")
        })
        .unwrap();
        assert_eq!(serialize_children(&script), "<p>a &amp; b</p>");
    }

    #[test]
    fn test_template_contents_are_serialized_and_cloned() {
        let root = parse_html_fragment("<div id=\"app\"><template><p>x</p></template></div>");
        let app = root.children.borrow()[0].clone();
        let expected = "<div id=\"app\"><template><p>x</p></template></div>";
        assert_eq!(serialize_node(&app).as_deref(), Some(expected));
        assert_eq!(serialize_node(&deep_clone(&app)).as_deref(), Some(expected));

        let template = app.children.borrow()[0].clone();
        assert!(template.children.borrow().is_empty());
        assert_eq!(child_nodes(&template).len(), 1);
        assert_eq!(serialize_children(&template), "<p>x</p>");
    }

    #[test]
    fn test_serializer_does_not_encode_newlines() {
        assert!(!serializer_encodes_newlines(false));
        assert!(!serializer_encodes_newlines(true));
    }
}
