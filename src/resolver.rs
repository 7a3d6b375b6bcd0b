//! Decides which single source a component's render function comes from.
//!
//! Precedence, highest first:
//!
//! 1. an existing `render` function (resolution is a no-op)
//! 2. the `template` option: inline markup, `#id` selector, or a host node
//! 3. the outer markup of the mount target
//!
//! A `template` of any other shape aborts the mount. Every other miss degrades to the
//! next source, or to no render function at all.

use crate::bridge::CompilationBridge;
use crate::cache::TemplateCache;
use crate::diagnostics::Reporter;
use crate::error::{MountError, E_TEMPLATE_INVALID, W_TEMPLATE_MISSING};
use crate::host::{HostEnvironment, NodeHandle};
use crate::markup::extract_outer_markup;
use crate::options::{ComponentOptions, TemplateOption, SELECTOR_PREFIX};

pub struct SourceResolver<'a> {
    pub host: &'a dyn HostEnvironment,
    pub cache: &'a TemplateCache,
    pub reporter: &'a Reporter,
}

impl<'a> SourceResolver<'a> {
    pub fn new(
        host: &'a dyn HostEnvironment,
        cache: &'a TemplateCache,
        reporter: &'a Reporter,
    ) -> Self {
        SourceResolver {
            host,
            cache,
            reporter,
        }
    }

    /// Make sure `options.render` is set whenever a template source can be found.
    pub fn ensure_render_function(
        &self,
        options: &mut ComponentOptions,
        el: Option<&NodeHandle>,
        bridge: &CompilationBridge<'_>,
    ) -> Result<(), MountError> {
        if options.render.is_some() {
            return Ok(());
        }
        if let Some(markup) = self.resolve_template(options, el)? {
            bridge.compile_into(options, &markup)?;
        }
        Ok(())
    }

    /// Markup to compile, or `None` when no source is available.
    pub fn resolve_template(
        &self,
        options: &ComponentOptions,
        el: Option<&NodeHandle>,
    ) -> Result<Option<String>, MountError> {
        let component = options.display_name();

        let template = match &options.template {
            None => None,
            Some(TemplateOption::Markup(markup)) if markup.is_empty() => None,
            Some(TemplateOption::Markup(selector)) if selector.starts_with(SELECTOR_PREFIX) => {
                let found = self
                    .cache
                    .lookup(selector, self.host)
                    .filter(|markup| !markup.is_empty());
                if found.is_none() {
                    self.reporter.warn(
                        W_TEMPLATE_MISSING,
                        format!("Template element not found or is empty: {}", selector),
                        Some(&component),
                    );
                }
                found
            }
            Some(TemplateOption::Markup(markup)) => Some(markup.clone()),
            // An empty node template compiles nothing and does not fall back to `el`.
            Some(TemplateOption::Node(node)) => match self.host.inner_html(node) {
                Some(markup) if markup.is_empty() => return Ok(None),
                Some(markup) => Some(markup),
                None => return Err(self.invalid(&options.template, &component)),
            },
            Some(TemplateOption::Invalid(_)) => {
                return Err(self.invalid(&options.template, &component));
            }
        };

        if template.is_some() {
            return Ok(template);
        }
        Ok(el.map(|el| extract_outer_markup(self.host, el)))
    }

    fn invalid(&self, template: &Option<TemplateOption>, component: &str) -> MountError {
        let shown = template
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        self.reporter.error(
            E_TEMPLATE_INVALID,
            format!("invalid template option: {}", shown),
            Some(component),
        );
        MountError::InvalidTemplate(shown)
    }
}
