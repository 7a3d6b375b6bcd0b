//! Mount decoration.
//!
//! The base mount stays untouched: [`decorate_mount`] captures it and returns a new
//! mount function of the same type that resolves a render function first. By the time
//! the base mount runs, `render` is present whenever one could be derived.

use serde_json::Value;
use std::rc::Rc;
use std::sync::Arc;

use crate::bridge::CompilationBridge;
use crate::cache::TemplateCache;
use crate::compiler::{RenderFn, TemplateCompiler, VNode};
use crate::config::{PlatformQuirks, RuntimeConfig};
use crate::diagnostics::Reporter;
use crate::error::{MountError, W_MOUNT_NOT_FOUND, W_MOUNT_ROOT, W_RENDER_MISSING};
use crate::host::{HostEnvironment, HostRef, NodeHandle};
use crate::perf::Instrumentation;
use crate::resolver::SourceResolver;
use crate::runtime::Component;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStatus {
    Mounted,
    /// Target was `<html>` or `<body>`; nothing happened.
    RefusedRoot,
    /// The `template` option had an unusable shape; nothing was compiled or mounted.
    InvalidTemplate,
}

pub type MountFn =
    Rc<dyn Fn(&mut Component, Option<HostRef>, bool) -> Result<MountStatus, MountError>>;

/// Everything a mount needs from its environment.
pub struct MountServices {
    pub host: Rc<dyn HostEnvironment>,
    pub compiler: Rc<dyn TemplateCompiler>,
    pub template_cache: Arc<TemplateCache>,
    pub reporter: Reporter,
    pub config: RuntimeConfig,
    pub quirks: PlatformQuirks,
    pub instrumentation: Option<Rc<dyn Instrumentation>>,
}

impl MountServices {
    pub fn resolver(&self) -> SourceResolver<'_> {
        SourceResolver::new(&*self.host, &self.template_cache, &self.reporter)
    }

    pub fn bridge(&self) -> CompilationBridge<'_> {
        CompilationBridge::new(
            &*self.compiler,
            self.config,
            self.quirks,
            self.instrumentation.as_deref(),
        )
    }

    /// Selector or node to node. A selector that matches nothing warns and yields `None`.
    pub fn resolve_host(&self, host_ref: &HostRef, component: &str) -> Option<NodeHandle> {
        let node = self.host.resolve(host_ref);
        if node.is_none() {
            if let HostRef::Selector(selector) = host_ref {
                self.reporter.warn(
                    W_MOUNT_NOT_FOUND,
                    format!("Cannot find element: {}", selector),
                    Some(component),
                );
            }
        }
        node
    }
}

/// Wrap `base` so templates are resolved and compiled before it runs.
pub fn decorate_mount(base: MountFn, services: Rc<MountServices>) -> MountFn {
    Rc::new(
        move |component: &mut Component, el: Option<HostRef>, hydrating: bool| {
            let name = component.options().display_name();
            let el = el.and_then(|host_ref| services.resolve_host(&host_ref, &name));

            if let Some(node) = &el {
                if services.host.is_document_root(node) {
                    services.reporter.warn(
                        W_MOUNT_ROOT,
                        "Do not mount to <html> or <body> - mount to normal elements instead.",
                        Some(&name),
                    );
                    return Ok(MountStatus::RefusedRoot);
                }
            }

            let bridge = services.bridge();
            match services
                .resolver()
                .ensure_render_function(component.options_mut(), el.as_ref(), &bridge)
            {
                Ok(()) => {}
                Err(MountError::InvalidTemplate(_)) => return Ok(MountStatus::InvalidTemplate),
                Err(e) => return Err(e),
            }

            base(component, el.map(HostRef::Node), hydrating)
        },
    )
}

/// Mount without a compiler: renders whatever `render` the component already has.
pub fn runtime_mount(services: Rc<MountServices>) -> MountFn {
    Rc::new(
        move |component: &mut Component, el: Option<HostRef>, hydrating: bool| {
            let name = component.options().display_name();
            let el = el.and_then(|host_ref| services.resolve_host(&host_ref, &name));

            let render = match component.options().render.clone() {
                Some(render) => render,
                None => {
                    services.reporter.warn(
                        W_RENDER_MISSING,
                        "Failed to mount component: template or render function not defined.",
                        Some(&name),
                    );
                    let empty: RenderFn = Rc::new(|_: &Value| VNode::Empty);
                    component.options_mut().render = Some(empty.clone());
                    empty
                }
            };

            let vnode = render(component.data());
            component.attach(el, vnode, hydrating);
            Ok(MountStatus::Mounted)
        },
    )
}
