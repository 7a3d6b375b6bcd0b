use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::compiler::{RenderFn, StaticRenderFn};
use crate::host::NodeHandle;

pub const SELECTOR_PREFIX: char = '#';

/// The `template` option as supplied by the caller.
#[derive(Debug, Clone)]
pub enum TemplateOption {
    /// Inline markup, or an id selector when it starts with `#`.
    Markup(String),
    /// A node in the host document whose inner markup is the template.
    Node(NodeHandle),
    /// Anything else. Rejected at mount time.
    Invalid(Value),
}

impl TemplateOption {
    /// Classify a loosely typed value, e.g. from JSON options. Falsy values
    /// (`null`, `false`, `0`, `""`) mean no template.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(markup) if markup.is_empty() => None,
            Value::String(markup) => Some(TemplateOption::Markup(markup)),
            other => Some(TemplateOption::Invalid(other)),
        }
    }

    pub fn is_id_selector(&self) -> bool {
        matches!(self, TemplateOption::Markup(m) if m.starts_with(SELECTOR_PREFIX))
    }
}

impl fmt::Display for TemplateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateOption::Markup(markup) => write!(f, "{}", markup),
            TemplateOption::Node(node) => write!(f, "{:?}", node),
            TemplateOption::Invalid(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for TemplateOption {
    fn from(markup: &str) -> Self {
        TemplateOption::Markup(markup.to_string())
    }
}

impl From<String> for TemplateOption {
    fn from(markup: String) -> Self {
        TemplateOption::Markup(markup)
    }
}

impl From<NodeHandle> for TemplateOption {
    fn from(node: NodeHandle) -> Self {
        TemplateOption::Node(node)
    }
}

/// Options bag of a component about to be mounted.
///
/// After a successful resolution either `render` is set, or nothing could be derived
/// and the base mount decides what an absent render function means.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub name: Option<String>,
    pub render: Option<RenderFn>,
    pub template: Option<TemplateOption>,
    pub static_render_fns: Option<Vec<StaticRenderFn>>,
    pub delimiters: Option<(String, String)>,
    pub comments: Option<bool>,
}

/// Serializable subset of [`ComponentOptions`].
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawOptions {
    name: Option<String>,
    template: Value,
    delimiters: Option<(String, String)>,
    comments: Option<bool>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(template: impl Into<TemplateOption>) -> Self {
        ComponentOptions {
            template: Some(template.into()),
            ..Self::default()
        }
    }

    pub fn with_render(render: RenderFn) -> Self {
        ComponentOptions {
            render: Some(render),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn delimiters(mut self, open: &str, close: &str) -> Self {
        self.delimiters = Some((open.to_string(), close.to_string()));
        self
    }

    pub fn comments(mut self, keep: bool) -> Self {
        self.comments = Some(keep);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawOptions = serde_json::from_str(json)?;
        Ok(ComponentOptions {
            name: raw.name,
            template: TemplateOption::from_value(raw.template),
            delimiters: raw.delimiters,
            comments: raw.comments,
            ..Self::default()
        })
    }

    /// Component name as shown in diagnostics: `<App>`, or `<Anonymous>`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => format!("<{}>", name),
            _ => "<Anonymous>".to_string(),
        }
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("name", &self.name)
            .field("render", &self.render.is_some())
            .field("template", &self.template)
            .field(
                "static_render_fns",
                &self.static_render_fns.as_ref().map(Vec::len),
            )
            .field("delimiters", &self.delimiters)
            .field("comments", &self.comments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_classifies_template() {
        let opts = ComponentOptions::from_json(r##"{"template": "#app", "name": "App"}"##).unwrap();
        assert!(opts.template.as_ref().unwrap().is_id_selector());
        assert_eq!(opts.display_name(), "<App>");

        let opts = ComponentOptions::from_json(r#"{"template": 42}"#).unwrap();
        assert!(matches!(opts.template, Some(TemplateOption::Invalid(Value::Number(_)))));

        for falsy in ["false", "0", "0.0", "\"\"", "null"] {
            let opts = ComponentOptions::from_json(&format!(r#"{{"template": {}}}"#, falsy)).unwrap();
            assert!(opts.template.is_none(), "{} should mean no template", falsy);
        }
        let opts = ComponentOptions::from_json(r#"{"template": true}"#).unwrap();
        assert!(matches!(opts.template, Some(TemplateOption::Invalid(Value::Bool(true)))));

        let opts = ComponentOptions::from_json(r#"{"delimiters": ["${", "}"]}"#).unwrap();
        assert!(opts.template.is_none());
        assert_eq!(opts.delimiters, Some(("${".to_string(), "}".to_string())));
        assert_eq!(opts.display_name(), "<Anonymous>");
    }
}
