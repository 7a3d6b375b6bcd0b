//! Markup to render-function compiler.
//!
//! The mount pipeline consumes compilers through [`TemplateCompiler`]. [`MarkupCompiler`]
//! is the bundled implementation:
//!
//! 1. Attribute values keep `&#10;` / `&#9;` literally unless the matching decode flag is on.
//! 2. The markup is parsed as an HTML fragment with html5ever.
//! 3. Text interpolations (`{{ path }}` or custom delimiters) and bound attributes
//!    (`:name="path"`) become property-path lookups against the render state.
//! 4. Static subtrees are hoisted into static render functions.
//! 5. Artifacts are memoized per (source, options) in a [`CompileCache`].

use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::cache::CompileCache;
use crate::dom;
use crate::error::{
    CompileError, E_COMPILE_EXPRESSION, E_COMPILE_INVALID_ROOT, E_COMPILE_MULTIPLE_ROOTS,
};

lazy_static! {
    static ref DEFAULT_INTERPOLATION_RE: Regex = Regex::new(r"(?s)\{\{(.+?)\}\}").unwrap();
    static ref PATH_RE: Regex =
        Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\[\d+\])*$").unwrap();
    static ref PATH_SEGMENT_RE: Regex = Regex::new(r"([A-Za-z_$][\w$]*)|\[(\d+)\]").unwrap();
    static ref OPEN_TAG_RE: Regex = Regex::new(r"<[A-Za-z][^<>]*>").unwrap();
    static ref QUOTED_ATTR_RE: Regex =
        Regex::new(r#"([^\s"'<>/=]+)(\s*=\s*)("[^"]*"|'[^']*')"#).unwrap();
    static ref ENCODED_NEWLINE_RE: Regex = Regex::new(r"&#(10|9);").unwrap();
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS & ARTIFACTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Attach byte ranges to compiler errors.
    pub output_source_range: bool,
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
    /// Custom interpolation markers, e.g. `("${", "}")`.
    pub delimiters: Option<(String, String)>,
    /// Keep markup comments in the render output.
    pub comments: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            output_source_range: true,
            should_decode_newlines: false,
            should_decode_newlines_for_href: false,
            delimiters: None,
            comments: false,
        }
    }
}

impl CompileOptions {
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{:?}",
            self.output_source_range,
            self.should_decode_newlines,
            self.should_decode_newlines_for_href,
            self.comments,
            self.delimiters
        )
    }
}

/// Produces the UI description for the given state.
pub type RenderFn = Rc<dyn Fn(&Value) -> VNode>;
/// Produces one structurally invariant subtree.
pub type StaticRenderFn = Rc<dyn Fn() -> VNode>;

#[derive(Clone)]
pub struct CompiledArtifact {
    pub render: RenderFn,
    pub static_render_fns: Vec<StaticRenderFn>,
}

impl fmt::Debug for CompiledArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledArtifact")
            .field("static_render_fns", &self.static_render_fns.len())
            .finish_non_exhaustive()
    }
}

pub trait TemplateCompiler {
    fn compile(&self, source: &str, options: &CompileOptions)
        -> Result<CompiledArtifact, CompileError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// VNODE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<VNode>,
        #[serde(rename = "static")]
        is_static: bool,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    Empty,
}

impl VNode {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            VNode::Element {
                tag,
                attrs,
                children,
                ..
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            VNode::Text { text } => out.push_str(&escape_text(text)),
            VNode::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            VNode::Empty => out.push_str("<!---->"),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, VNode::Element { is_static: true, .. })
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY PATHS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// `user.tags[0].name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if !PATH_RE.is_match(expr) {
            return None;
        }
        let mut segments = Vec::new();
        for caps in PATH_SEGMENT_RE.captures_iter(expr) {
            if let Some(key) = caps.get(1) {
                segments.push(PathSegment::Key(key.as_str().to_string()));
            } else if let Some(index) = caps.get(2) {
                segments.push(PathSegment::Index(index.as_str().parse().ok()?));
            }
        }
        Some(PropertyPath {
            raw: expr.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn evaluate<'a>(&self, state: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(state, |value, segment| match segment {
                PathSegment::Key(key) => value.get(key.as_str()),
                PathSegment::Index(index) => value.get(*index),
            })
    }
}

fn value_to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string_pretty(v).unwrap_or_default()
        }
        Some(v) => v.to_string(),
    }
}

/// `null`, missing and `false` drop the attribute.
fn value_to_attr(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        v => Some(value_to_text(v)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE IR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Interpolation(PropertyPath),
}

#[derive(Debug, Clone)]
enum IrAttr {
    Static(String, String),
    Bound(String, PropertyPath),
}

#[derive(Debug, Clone)]
enum IrNode {
    Element {
        tag: String,
        attrs: Vec<IrAttr>,
        children: Vec<IrNode>,
    },
    Text(Vec<Segment>),
    Comment(String),
    Hoisted(usize),
}

impl IrNode {
    fn is_static(&self) -> bool {
        match self {
            IrNode::Element {
                attrs, children, ..
            } => {
                attrs.iter().all(|a| matches!(a, IrAttr::Static(..)))
                    && children.iter().all(IrNode::is_static)
            }
            IrNode::Text(segments) => segments.iter().all(|s| matches!(s, Segment::Literal(_))),
            IrNode::Comment(_) => true,
            IrNode::Hoisted(_) => true,
        }
    }

    /// Worth hoisting: static, and more than a lone text child.
    fn is_static_root(&self) -> bool {
        match self {
            IrNode::Element { children, .. } => {
                self.is_static()
                    && !children.is_empty()
                    && !(children.len() == 1 && matches!(children[0], IrNode::Text(_)))
            }
            _ => false,
        }
    }
}

struct Lowering<'a> {
    source: &'a str,
    options: &'a CompileOptions,
    interpolation: Cow<'a, Regex>,
    /// Byte offset just past the most recently entered start tag.
    cursor: Cell<usize>,
}

impl<'a> Lowering<'a> {
    fn new(source: &'a str, options: &'a CompileOptions) -> Result<Self, CompileError> {
        let interpolation = match &options.delimiters {
            None => Cow::Borrowed(&*DEFAULT_INTERPOLATION_RE),
            Some((open, close)) => {
                let pattern = format!(
                    r"(?s){}(.+?){}",
                    regex::escape(open),
                    regex::escape(close)
                );
                let re = Regex::new(&pattern).map_err(|e| {
                    CompileError::new(
                        E_COMPILE_EXPRESSION,
                        &format!("invalid delimiters {:?}: {}", (open, close), e),
                    )
                })?;
                Cow::Owned(re)
            }
        };
        Ok(Lowering {
            source,
            options,
            interpolation,
            cursor: Cell::new(0),
        })
    }

    /// Locate the start tag of an element about to be lowered. Returns its offset and
    /// moves the cursor past it.
    fn enter_element(&self, tag: &str) -> usize {
        let from = self.cursor.get();
        match find_start_tag(self.source, from, tag) {
            Some(start) => {
                self.cursor.set(start_tag_end(self.source, start));
                start
            }
            None => from,
        }
    }

    /// `raw` is searched for at or after `from`.
    fn expression_error(&self, raw: &str, expr: &str, from: usize) -> CompileError {
        let err = CompileError::new(
            E_COMPILE_EXPRESSION,
            &format!("invalid expression: {}", expr.trim()),
        );
        if !self.options.output_source_range {
            return err;
        }
        let found = self
            .source
            .get(from..)
            .and_then(|rest| rest.find(raw))
            .map(|offset| from + offset)
            .or_else(|| self.source.find(raw));
        match found {
            Some(start) => err.with_range(start, start + raw.len()),
            None => err,
        }
    }

    fn lower_children(&self, handle: &Handle) -> Result<Vec<IrNode>, CompileError> {
        let mut nodes = Vec::new();
        for child in dom::child_nodes(handle).iter() {
            if let Some(node) = self.lower_node(child)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn lower_node(&self, handle: &Handle) -> Result<Option<IrNode>, CompileError> {
        match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let tag = name.local.to_string();
                let start = self.enter_element(&tag);
                let mut lowered = Vec::new();
                for attr in attrs.borrow().iter() {
                    let attr_name = attr.name.local.to_string();
                    let value = attr.value.to_string();
                    let bound = attr_name
                        .strip_prefix(':')
                        .or_else(|| attr_name.strip_prefix("v-bind:"));
                    match bound {
                        Some(target) => {
                            let path = PropertyPath::parse(&value).ok_or_else(|| {
                                self.expression_error(
                                    &format!("{}=\"{}\"", attr_name, value),
                                    &value,
                                    start,
                                )
                            })?;
                            lowered.push(IrAttr::Bound(target.to_string(), path));
                        }
                        None => lowered.push(IrAttr::Static(attr_name, value)),
                    }
                }
                Ok(Some(IrNode::Element {
                    tag,
                    attrs: lowered,
                    children: self.lower_children(handle)?,
                }))
            }
            NodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                Ok(Some(IrNode::Text(self.lower_text(&text)?)))
            }
            NodeData::Comment { contents } if self.options.comments => {
                Ok(Some(IrNode::Comment(contents.to_string())))
            }
            _ => Ok(None),
        }
    }

    fn lower_text(&self, text: &str) -> Result<Vec<Segment>, CompileError> {
        let mut segments = Vec::new();
        let mut last_end = 0;
        for caps in self.interpolation.captures_iter(text) {
            let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last_end {
                segments.push(Segment::Literal(text[last_end..whole.start()].to_string()));
            }
            let path = PropertyPath::parse(expr.as_str())
                .ok_or_else(|| {
                    self.expression_error(whole.as_str(), expr.as_str(), self.cursor.get())
                })?;
            segments.push(Segment::Interpolation(path));
            last_end = whole.end();
        }
        if last_end < text.len() {
            segments.push(Segment::Literal(text[last_end..].to_string()));
        }
        Ok(segments)
    }
}

/// Offset of `<tag` (case-insensitive, followed by whitespace, `/` or `>`) at or
/// after `from`.
fn find_start_tag(source: &str, from: usize, tag: &str) -> Option<usize> {
    let haystack = source.get(from..)?.to_ascii_lowercase();
    let needle = format!("<{}", tag);
    let mut offset = 0;
    while let Some(pos) = haystack[offset..].find(&needle) {
        let at = offset + pos;
        let next = haystack[at + needle.len()..].chars().next();
        if next.map_or(true, |c| c == '>' || c == '/' || c.is_whitespace()) {
            return Some(from + at);
        }
        offset = at + needle.len();
    }
    None
}

/// Offset just past the `>` closing the start tag at `start`, skipping quoted values.
fn start_tag_end(source: &str, start: usize) -> usize {
    let mut quote = None;
    for (i, c) in source[start..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return start + i + 1,
            None => {}
        }
    }
    source.len()
}

/// Pick the single node the render function produces.
fn select_root(nodes: Vec<IrNode>) -> Result<Option<IrNode>, CompileError> {
    let element_count = nodes
        .iter()
        .filter(|n| matches!(n, IrNode::Element { .. }))
        .count();

    if element_count > 1 {
        return Err(CompileError::new(
            E_COMPILE_MULTIPLE_ROOTS,
            "Component template should contain exactly one root element.",
        ));
    }

    if element_count == 1 {
        // Text around a root element is dropped.
        let root = nodes
            .into_iter()
            .find(|n| matches!(n, IrNode::Element { .. }));
        if let Some(IrNode::Element { tag, .. }) = &root {
            if tag == "template" || tag == "slot" {
                return Err(CompileError::new(
                    E_COMPILE_INVALID_ROOT,
                    &format!(
                        "Cannot use <{}> as component root element because it may contain multiple nodes.",
                        tag
                    ),
                ));
            }
        }
        return Ok(root);
    }

    let segments: Vec<Segment> = nodes
        .into_iter()
        .filter_map(|n| match n {
            IrNode::Text(segments) => Some(segments),
            _ => None,
        })
        .flatten()
        .collect();
    let blank = segments
        .iter()
        .all(|s| matches!(s, Segment::Literal(text) if text.trim().is_empty()));
    if blank {
        return Ok(None);
    }
    Ok(Some(IrNode::Text(segments)))
}

/// Replace maximal static subtrees with references into `statics`.
fn hoist_static(node: IrNode, statics: &mut Vec<IrNode>) -> IrNode {
    if node.is_static_root() {
        statics.push(node);
        return IrNode::Hoisted(statics.len() - 1);
    }
    match node {
        IrNode::Element {
            tag,
            attrs,
            children,
        } => IrNode::Element {
            tag,
            attrs,
            children: children
                .into_iter()
                .map(|child| hoist_static(child, statics))
                .collect(),
        },
        other => other,
    }
}

fn render_ir(node: &IrNode, state: &Value, statics: &[StaticRenderFn]) -> VNode {
    match node {
        IrNode::Element {
            tag,
            attrs,
            children,
        } => VNode::Element {
            tag: tag.clone(),
            attrs: attrs
                .iter()
                .filter_map(|attr| match attr {
                    IrAttr::Static(name, value) => Some((name.clone(), value.clone())),
                    IrAttr::Bound(name, path) => {
                        value_to_attr(path.evaluate(state)).map(|v| (name.clone(), v))
                    }
                })
                .collect(),
            children: children
                .iter()
                .map(|child| render_ir(child, state, statics))
                .collect(),
            is_static: false,
        },
        IrNode::Text(segments) => VNode::Text {
            text: segments
                .iter()
                .map(|segment| match segment {
                    Segment::Literal(text) => text.clone(),
                    Segment::Interpolation(path) => value_to_text(path.evaluate(state)),
                })
                .collect(),
        },
        IrNode::Comment(text) => VNode::Comment { text: text.clone() },
        IrNode::Hoisted(index) => statics.get(*index).map(|f| f()).unwrap_or(VNode::Empty),
    }
}

fn render_static(node: &IrNode) -> VNode {
    let mut vnode = render_ir(node, &Value::Null, &[]);
    if let VNode::Element { is_static, .. } = &mut vnode {
        *is_static = true;
    }
    vnode
}

/// Keep `&#10;` / `&#9;` literal inside attribute values the host did not encode.
fn keep_encoded_newlines<'a>(source: &'a str, options: &CompileOptions) -> Cow<'a, str> {
    if options.should_decode_newlines && options.should_decode_newlines_for_href {
        return Cow::Borrowed(source);
    }
    OPEN_TAG_RE.replace_all(source, |tag: &regex::Captures| {
        QUOTED_ATTR_RE
            .replace_all(&tag[0], |attr: &regex::Captures| {
                let decode = if attr[1].eq_ignore_ascii_case("href") {
                    options.should_decode_newlines_for_href
                } else {
                    options.should_decode_newlines
                };
                if decode {
                    return attr[0].to_string();
                }
                format!(
                    "{}{}{}",
                    &attr[1],
                    &attr[2],
                    ENCODED_NEWLINE_RE.replace_all(&attr[3], "&amp;#${1};")
                )
            })
            .into_owned()
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct MarkupCompiler {
    cache: CompileCache,
}

impl MarkupCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_artifacts(&self) -> usize {
        self.cache.len()
    }

    fn compile_uncached(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        let prepared = keep_encoded_newlines(source, options);
        let fragment = dom::parse_html_fragment(&prepared);

        let lowering = Lowering::new(source, options)?;
        let nodes = lowering.lower_children(&fragment)?;

        let mut hoisted = Vec::new();
        let root = select_root(nodes)?.map(|root| hoist_static(root, &mut hoisted));

        let static_render_fns: Vec<StaticRenderFn> = hoisted
            .into_iter()
            .map(|node| {
                let f: StaticRenderFn = Rc::new(move || render_static(&node));
                f
            })
            .collect();

        let statics = Rc::new(static_render_fns.clone());
        let render: RenderFn = Rc::new(move |state: &Value| match &root {
            Some(node) => render_ir(node, state, &statics),
            None => VNode::Empty,
        });

        Ok(CompiledArtifact {
            render,
            static_render_fns,
        })
    }
}

impl TemplateCompiler for MarkupCompiler {
    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        if let Some(artifact) = self.cache.get(source, options) {
            return Ok(artifact);
        }
        let artifact = self.compile_uncached(source, options)?;
        self.cache.set(source, options, artifact.clone());
        Ok(artifact)
    }
}
