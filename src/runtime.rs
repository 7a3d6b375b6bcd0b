//! Runtime and component instances.
//!
//! A [`Runtime`] owns the mount function every component created from it uses.
//! `build_runtime_only` installs the plain [`runtime_mount`]; `build` additionally wraps
//! it with the template compiler via [`decorate_mount`].

use serde_json::Value;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::TemplateCache;
use crate::compiler::{
    CompileOptions, CompiledArtifact, MarkupCompiler, TemplateCompiler, VNode,
};
use crate::config::{PlatformQuirks, RuntimeConfig};
use crate::diagnostics::{DiagnosticSink, Reporter, TracingSink};
use crate::error::{CompileError, MountError};
use crate::host::{HostEnvironment, HostRef, NodeHandle};
use crate::mount::{decorate_mount, runtime_mount, MountFn, MountServices};
use crate::options::ComponentOptions;
use crate::perf::Instrumentation;
use crate::plugin::{Plugin, PluginRegistry};

static COMPONENT_UID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static DEFAULT_COMPILER: MarkupCompiler = MarkupCompiler::new();
}

/// Compile a template with the thread's shared [`MarkupCompiler`].
pub fn compile(template: &str, options: &CompileOptions) -> Result<CompiledArtifact, CompileError> {
    DEFAULT_COMPILER.with(|compiler| compiler.compile(template, options))
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Runtime {
    services: Rc<MountServices>,
    mount: MountFn,
    compiler_installed: bool,
    plugins: PluginRegistry,
}

impl Runtime {
    pub fn builder(host: Rc<dyn HostEnvironment>) -> RuntimeBuilder {
        RuntimeBuilder::new(host)
    }

    pub fn services(&self) -> &MountServices {
        &self.services
    }

    pub fn config(&self) -> RuntimeConfig {
        self.services.config
    }

    pub fn mount_fn(&self) -> MountFn {
        Rc::clone(&self.mount)
    }

    /// Replace the mount function, e.g. from a plugin wrapping it further.
    pub fn set_mount(&mut self, mount: MountFn) {
        self.mount = mount;
    }

    /// Wrap the current mount with template resolution. Installing twice is a no-op.
    pub fn install_compiler(&mut self) -> &mut Self {
        if !self.compiler_installed {
            self.mount = decorate_mount(Rc::clone(&self.mount), Rc::clone(&self.services));
            self.compiler_installed = true;
        }
        self
    }

    pub fn has_compiler(&self) -> bool {
        self.compiler_installed
    }

    /// The runtime's compiler, for callers that want render functions without mounting.
    pub fn compile(
        &self,
        template: &str,
        options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        self.services.compiler.compile(template, options)
    }

    /// Install `plugin` unless it is already installed.
    pub fn use_plugin(&mut self, plugin: Rc<dyn Plugin>, args: &[Value]) -> &mut Self {
        if self.plugins.contains(&plugin) {
            return self;
        }
        plugin.install(self, args);
        self.plugins.register(plugin);
        self
    }

    pub fn installed_plugins(&self) -> usize {
        self.plugins.len()
    }
}

pub struct RuntimeBuilder {
    host: Rc<dyn HostEnvironment>,
    config: RuntimeConfig,
    quirks: Option<PlatformQuirks>,
    sink: Rc<dyn DiagnosticSink>,
    instrumentation: Option<Rc<dyn Instrumentation>>,
    compiler: Option<Rc<dyn TemplateCompiler>>,
    template_cache: Option<Arc<TemplateCache>>,
}

impl RuntimeBuilder {
    pub fn new(host: Rc<dyn HostEnvironment>) -> Self {
        RuntimeBuilder {
            host,
            config: RuntimeConfig::default(),
            quirks: None,
            sink: Rc::new(TracingSink),
            instrumentation: None,
            compiler: None,
            template_cache: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override quirk detection.
    pub fn quirks(mut self, quirks: PlatformQuirks) -> Self {
        self.quirks = Some(quirks);
        self
    }

    pub fn diagnostics(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn instrumentation(mut self, instrumentation: Rc<dyn Instrumentation>) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    pub fn compiler(mut self, compiler: Rc<dyn TemplateCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Defaults to the process-wide [`TemplateCache::global`].
    pub fn template_cache(mut self, cache: Arc<TemplateCache>) -> Self {
        self.template_cache = Some(cache);
        self
    }

    pub fn build_runtime_only(self) -> Runtime {
        let quirks = self
            .quirks
            .unwrap_or_else(|| PlatformQuirks::detect(&*self.host));
        let services = Rc::new(MountServices {
            host: self.host,
            compiler: self
                .compiler
                .unwrap_or_else(|| Rc::new(MarkupCompiler::new()) as Rc<dyn TemplateCompiler>),
            template_cache: self.template_cache.unwrap_or_else(TemplateCache::global),
            reporter: Reporter::new(self.sink, self.config.production),
            config: self.config,
            quirks,
            instrumentation: self.instrumentation,
        });
        tracing::debug!(
            target: "template_mount",
            production = services.config.production,
            performance = services.config.performance,
            ?quirks,
            "runtime ready"
        );
        Runtime {
            mount: runtime_mount(Rc::clone(&services)),
            services,
            compiler_installed: false,
            plugins: PluginRegistry::default(),
        }
    }

    /// Runtime with the compiler-backed mount installed.
    pub fn build(self) -> Runtime {
        let mut runtime = self.build_runtime_only();
        runtime.install_compiler();
        runtime
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Component {
    uid: u64,
    runtime: Rc<Runtime>,
    options: ComponentOptions,
    data: Value,
    el: Option<NodeHandle>,
    vnode: Option<VNode>,
    hydrating: bool,
    mounted: bool,
}

impl Component {
    pub fn new(runtime: &Rc<Runtime>, options: ComponentOptions) -> Self {
        Component {
            uid: COMPONENT_UID.fetch_add(1, Ordering::SeqCst),
            runtime: Rc::clone(runtime),
            options,
            data: Value::Null,
            el: None,
            vnode: None,
            hydrating: false,
            mounted: false,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Mount into `el` (selector or node). Refused or aborted mounts return the component
    /// unchanged; compiler errors are returned as-is.
    pub fn mount(
        &mut self,
        el: Option<HostRef>,
        hydrating: bool,
    ) -> Result<&mut Self, MountError> {
        let mount = self.runtime.mount_fn();
        let status = mount(self, el, hydrating)?;
        tracing::trace!(target: "template_mount", uid = self.uid, ?status, "mount finished");
        Ok(self)
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    pub fn options(&self) -> &ComponentOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ComponentOptions {
        &mut self.options
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn el(&self) -> Option<&NodeHandle> {
        self.el.as_ref()
    }

    pub fn vnode(&self) -> Option<&VNode> {
        self.vnode.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_hydrating(&self) -> bool {
        self.hydrating
    }

    /// Markup of the last rendered tree.
    pub fn rendered_html(&self) -> Option<String> {
        self.vnode.as_ref().map(VNode::to_html)
    }

    /// Record the outcome of a base mount.
    pub fn attach(&mut self, el: Option<NodeHandle>, vnode: VNode, hydrating: bool) {
        self.el = el;
        self.vnode = Some(vnode);
        self.hydrating = hydrating;
        self.mounted = true;
    }
}
