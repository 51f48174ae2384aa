//! The structured SSA intermediate representation.
//!
//! # Architecture
//!
//! ```text
//! Program ─┬─ compvars: Arena<CompVarId, CompVar>   slots, with every value bound to them
//!          ├─ values:   Arena<ValueId, Value>       SSA definitions and their use lists
//!          ├─ stmts:    Arena<StmtId, Statement>    the statement tree
//!          └─ body:     Vec<StmtId>                 top-level list
//! ```
//!
//! Values and statements refer to each other by id only. Types, invariance
//! and slice flags live on the nodes and are filled in by the analyses and
//! the slicer after construction.

pub mod dump;
pub mod invariance;
pub mod ops;
pub mod program;
pub mod rhs;
pub mod stmt;
pub mod types;
pub mod value;
pub mod verify;

pub use invariance::Invariance;
pub use ops::{Operator, OperatorInfo, TypeRule, MAX_OP_ARGS};
pub use program::{ListLoc, Program, ValueSet};
pub use rhs::{Internal, InternalId, InternalTable, Primary, Rhs};
pub use stmt::{SliceFlags, Statement, StmtId, StmtKind};
pub use types::ValueType;
pub use value::{CompVar, CompVarId, CompVarKind, Value, ValueId};
