//! # Template Mount
//!
//! Turns a declarative UI source into a render function right before a component
//! mounts, by decorating the runtime's base mount operation.
//!
//! ## Resolution Invariants
//!
//! 1. **Single Source**: `render` > `template` > outer markup of the mount target.
//!    Exactly one source becomes authoritative; an existing `render` is never replaced.
//!
//! 2. **Template Shapes**: a `template` is inline markup, an `#id` selector, a host node,
//!    or absent. Any other shape aborts the mount (`E-TEMPLATE-INVALID`) before the
//!    compiler runs.
//!
//! 3. **Graceful Misses**: an `#id` that resolves to nothing warns
//!    (`W-TEMPLATE-MISSING`) and falls through to the mount target. A selector mount
//!    target that resolves to nothing warns and mounts with no target.
//!
//! 4. **Forbidden Targets**: mounting into `<html>` or `<body>` is refused with one
//!    warning; the component is returned untouched.
//!
//! 5. **Template Cache**: `#id` lookups are memoized process-wide and never evicted.
//!
//! 6. **Decoration**: the compiler-backed mount has the base mount's exact type and
//!    forwards its arguments and result unchanged.
//!
//! Compiler errors are never caught; they surface from [`Component::mount`].

mod bridge;
mod cache;
mod compiler;
mod config;
mod diagnostics;
mod dom;
mod error;
mod host;
mod markup;
mod mount;
mod options;
mod perf;
mod plugin;
mod resolver;
mod runtime;

#[cfg(feature = "napi")]
mod native;

#[cfg(test)]
mod compiler_tests;

pub use bridge::{CompilationBridge, MARK_COMPILE, MARK_COMPILE_END};
pub use cache::{CompileCache, TemplateCache};
pub use compiler::{
    CompileOptions, CompiledArtifact, MarkupCompiler, PropertyPath, RenderFn, StaticRenderFn,
    TemplateCompiler, VNode,
};
pub use config::{PlatformQuirks, RuntimeConfig};
pub use diagnostics::{
    Diagnostic, DiagnosticLevel, DiagnosticSink, MemorySink, Reporter, TracingSink,
};
pub use error::*;
pub use host::{Document, HostEnvironment, HostRef, NodeHandle};
pub use markup::extract_outer_markup;
pub use mount::{decorate_mount, runtime_mount, MountFn, MountServices, MountStatus};
pub use options::{ComponentOptions, TemplateOption, SELECTOR_PREFIX};
pub use perf::{Instrumentation, Measurement, NoopInstrumentation, Timeline};
pub use plugin::{Plugin, PluginRegistry};
pub use resolver::SourceResolver;
pub use runtime::{compile, Component, Runtime, RuntimeBuilder};

#[cfg(feature = "napi")]
pub use native::{check_template_native, render_template_native};
