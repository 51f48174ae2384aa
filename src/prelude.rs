//! # filterc Prelude
//!
//! The types needed to build, compile and inspect a filter. Import with
//! `use filterc::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all filterc operations
pub use crate::Error;

/// The result type used throughout filterc
pub use crate::Result;

/// The external build step a toolchain error refers to
pub use crate::ToolchainStage;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The compilation pipeline and its result
pub use crate::pipeline::{FilterCompiler, Translation};

/// Configuration of compilation, emission and the toolchain
pub use crate::config::{CompilerConfig, EmitConfig, ToolchainConfig};

// ================================================================================================
// Input
// ================================================================================================

/// The expression tree handed over by the parser
pub use crate::expr::{Builtin, Expr, ExprKind, OpBuiltin, UserVal, UserValKind, Variable};

// ================================================================================================
// IR
// ================================================================================================

/// Program, statements, values and operands
pub use crate::ir::{
    CompVarId, Internal, InternalId, InternalTable, Invariance, ListLoc, Operator, Primary,
    Program, Rhs, StmtId, StmtKind, ValueId, ValueType,
};

/// Incremental SSA construction
pub use crate::builder::SsaBuilder;

// ================================================================================================
// Passes and Code Generation
// ================================================================================================

/// Pass infrastructure and change tracking
pub use crate::compiler::{Event, EventKind, EventLog, PassScheduler, SsaPass};

/// Emission and toolchain handoff
pub use crate::codegen::{CEmitter, CcToolchain, CompiledModule, ModuleLoader, Toolchain};
