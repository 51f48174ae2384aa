//! The compilation pipeline.
//!
//! [`FilterCompiler`] chains the stages of a compilation:
//!
//! 1. **Lowering**: expression tree to SSA through the [`SsaBuilder`]
//! 2. **Typing**: [`propagate_types`]
//! 3. **Optimization**: color fusion, copy propagation and dead code
//!    elimination, repeated by the [`PassScheduler`] until stable
//! 4. **Invariance**: [`analyze_invariance`]
//! 5. **Emission**: slicing into regions and template expansion
//! 6. **Toolchain** (optional): building a loadable module
//!
//! The SSA is verified after construction and after optimization unless
//! [`CompilerConfig::verify_ssa`] is off.

use tracing::{debug, info};

use crate::{
    analysis::{analyze_invariance, mark_all_variant, propagate_types, InvarianceStats},
    builder::{lower::Lowering, SsaBuilder},
    codegen::{CEmitter, CompiledModule, Toolchain},
    compiler::{
        ColorFusionPass, CopyPropagationPass, DeadCodeEliminationPass, EventLog, PassScheduler,
    },
    config::CompilerConfig,
    expr::Expr,
    ir::{InternalTable, Program},
    Result,
};

/// The result of translating one filter.
#[derive(Debug)]
pub struct Translation {
    /// The optimized and analyzed program.
    pub program: Program,
    /// The expanded template.
    pub source: String,
    /// What the optimization passes did.
    pub events: EventLog,
    /// Counters of the invariance analysis; all zero when it is disabled.
    pub invariance: InvarianceStats,
}

/// Compiles filter expressions to C.
///
/// # Example
///
/// ```rust
/// use filterc::{
///     expr::Expr,
///     ir::{InternalTable, Operator},
///     pipeline::FilterCompiler,
/// };
///
/// let internals = InternalTable::standard();
/// let x = internals.lookup("x").unwrap();
/// // grayscale ramp: rgba(x, x, x, 1)
/// let gray = Expr::tuple(vec![
///     Expr::internal(x),
///     Expr::internal(x),
///     Expr::internal(x),
///     Expr::float(1.0),
/// ]);
///
/// let compiler = FilterCompiler::default();
/// let translation = compiler.translate(&gray, internals, "$m")?;
/// assert!(translation.source.contains("OUTPUT_COLOR("));
/// # Ok::<(), filterc::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    config: CompilerConfig,
}

impl FilterCompiler {
    /// Creates a compiler with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Pass selection, limits and emission settings.
    ///
    /// # Returns
    ///
    /// A new `FilterCompiler`.
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        FilterCompiler { config }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Builds the pass sequence the configuration enables.
    #[must_use]
    pub fn scheduler(&self) -> PassScheduler {
        let mut scheduler = PassScheduler::new(self.config.max_pass_iterations);
        if self.config.enable_color_fusion {
            scheduler.add(Box::new(ColorFusionPass::new()));
        }
        if self.config.enable_copy_propagation {
            scheduler.add(Box::new(CopyPropagationPass::new()));
        }
        if self.config.enable_dead_code_elimination {
            scheduler.add(Box::new(DeadCodeEliminationPass::new()));
        }
        scheduler
    }

    /// Lowers a filter expression into SSA.
    ///
    /// # Arguments
    ///
    /// * `expr` - The filter, yielding the four components of the output color.
    /// * `internals` - The environment quantities `expr` refers to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NestingTooDeep`] when the filter nests constructs
    /// deeper than [`CompilerConfig::max_nesting_depth`].
    pub fn lower(&self, expr: &Expr, internals: InternalTable) -> Result<Program> {
        let mut builder =
            SsaBuilder::new(Program::new(internals)).with_max_depth(self.config.max_nesting_depth);
        Lowering::new(&mut builder).lower_filter(expr)?;
        let program = builder.finish();
        info!(
            values = program.value_count(),
            statements = program.stmt_count(),
            "program built"
        );
        Ok(program)
    }

    /// Translates a filter expression into the expanded `template`.
    ///
    /// # Errors
    ///
    /// Returns an error when lowering fails, verification finds a defect or
    /// the template cannot be expanded.
    pub fn translate(
        &self,
        expr: &Expr,
        internals: InternalTable,
        template: &str,
    ) -> Result<Translation> {
        let program = self.lower(expr, internals)?;
        self.translate_program(program, template)
    }

    /// Optimizes, analyzes and emits an already built program.
    ///
    /// # Errors
    ///
    /// Returns an error when verification finds a defect or the template
    /// cannot be expanded.
    pub fn translate_program(&self, mut program: Program, template: &str) -> Result<Translation> {
        let updates = propagate_types(&mut program);
        debug!(updates, "types inferred");
        self.checkpoint(&program, "built")?;

        let mut events = EventLog::new();
        let stats = self.scheduler().run(&mut program, &mut events);
        info!(
            iterations = stats.iterations,
            converged = stats.converged,
            summary = %events.summary(),
            "passes finished"
        );

        let invariance = if self.config.enable_invariance_analysis {
            analyze_invariance(&mut program)
        } else {
            mark_all_variant(&mut program);
            InvarianceStats::default()
        };
        self.checkpoint(&program, "optimized")?;

        let source = CEmitter::new(&mut program, &self.config.emit).expand(template)?;
        info!(bytes = source.len(), "translation emitted");

        Ok(Translation {
            program,
            source,
            events,
            invariance,
        })
    }

    /// Translates a filter and builds it with `toolchain`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`translate`](Self::translate), and the
    /// recoverable errors of the toolchain.
    pub fn compile<T>(
        &self,
        expr: &Expr,
        internals: InternalTable,
        template: &str,
        toolchain: &T,
    ) -> Result<(Translation, CompiledModule)>
    where
        T: Toolchain + ?Sized,
    {
        let translation = self.translate(expr, internals, template)?;
        info!("invoking toolchain");
        let module = toolchain.build(&translation.source)?;
        Ok((translation, module))
    }

    fn checkpoint(&self, program: &Program, stage: &str) -> Result<()> {
        if self.config.dump_ir {
            debug!(stage, "IR dump:\n{}", program.dump());
        }
        if self.config.verify_ssa {
            program.verify_ssa()?;
            program.verify_uses()?;
        }
        Ok(())
    }
}
