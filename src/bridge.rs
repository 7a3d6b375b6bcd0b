use crate::compiler::{CompileOptions, TemplateCompiler};
use crate::config::{PlatformQuirks, RuntimeConfig};
use crate::error::CompileError;
use crate::options::ComponentOptions;
use crate::perf::Instrumentation;

pub const MARK_COMPILE: &str = "compile";
pub const MARK_COMPILE_END: &str = "compile end";

/// Runs the compiler with environment-derived flags and installs the result on the
/// options bag. Compiler errors propagate untouched.
pub struct CompilationBridge<'a> {
    compiler: &'a dyn TemplateCompiler,
    config: RuntimeConfig,
    quirks: PlatformQuirks,
    instrumentation: Option<&'a dyn Instrumentation>,
}

impl<'a> CompilationBridge<'a> {
    pub fn new(
        compiler: &'a dyn TemplateCompiler,
        config: RuntimeConfig,
        quirks: PlatformQuirks,
        instrumentation: Option<&'a dyn Instrumentation>,
    ) -> Self {
        CompilationBridge {
            compiler,
            config,
            quirks,
            instrumentation,
        }
    }

    pub fn compile_options(&self, options: &ComponentOptions) -> CompileOptions {
        CompileOptions {
            output_source_range: !self.config.production,
            should_decode_newlines: self.quirks.decode_newlines,
            should_decode_newlines_for_href: self.quirks.decode_newlines_for_href,
            delimiters: options.delimiters.clone(),
            comments: options.comments.unwrap_or(false),
        }
    }

    /// Marks are development-only and need a backend.
    fn perf(&self) -> Option<&'a dyn Instrumentation> {
        if self.config.production || !self.config.performance {
            return None;
        }
        self.instrumentation
    }

    pub fn compile_into(
        &self,
        options: &mut ComponentOptions,
        markup: &str,
    ) -> Result<(), CompileError> {
        let perf = self.perf();
        if let Some(perf) = perf {
            perf.mark(MARK_COMPILE);
        }

        let artifact = self.compiler.compile(markup, &self.compile_options(options))?;
        options.render = Some(artifact.render);
        options.static_render_fns = Some(artifact.static_render_fns);

        if let Some(perf) = perf {
            perf.mark(MARK_COMPILE_END);
            perf.measure(
                &format!("{} compile", options.display_name()),
                MARK_COMPILE,
                MARK_COMPILE_END,
            );
        }
        Ok(())
    }
}
