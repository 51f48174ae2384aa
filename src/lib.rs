// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # filterc
//!
//! The compiler core of a per-pixel image filter language. A filter is an
//! expression computing an RGBA color from the pixel coordinates, time, user
//! parameters and input images. `filterc` turns the type-checked expression
//! tree into C code that the host compiles and loads as a native filter.
//!
//! ## Features
//!
//! - **Structured SSA** - If-conditionals and while-loops stay as nested
//!   statements; phis live at the if exit and the loop head
//! - **Incremental construction** - Phis are placed while the tree is built,
//!   without dominance frontiers
//! - **Dataflow passes** - Type propagation and a two-axis invariance
//!   analysis over fixpoint worklists
//! - **Optimizations** - Color fusion, copy propagation, dead code elimination
//! - **Invariance slicing** - Code is split into regions run once per
//!   invocation, per row, per column and per element
//! - **Template emission** - Regions are spliced into a host supplied C template
//!
//! ## Quick Start
//!
//! ```rust
//! use filterc::prelude::*;
//!
//! let internals = InternalTable::standard();
//! let x = internals.lookup("x").unwrap();
//! let y = internals.lookup("y").unwrap();
//!
//! // rgba(x * y, x, y, 1)
//! let filter = Expr::tuple(vec![
//!     Expr::op(Operator::Mul, vec![Expr::internal(x), Expr::internal(y)]),
//!     Expr::internal(x),
//!     Expr::internal(y),
//!     Expr::float(1.0),
//! ]);
//!
//! let translation = FilterCompiler::default().translate(
//!     &filter,
//!     internals,
//!     "void row (void) { $x_code } void pixel (void) { $m }",
//! )?;
//! println!("{}", translation.source);
//! # Ok::<(), filterc::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Expr ──lower──▶ Program ──types──▶ passes ──invariance──▶ slice ──▶ C template
//!                 (SSA IR)           (fixpoint)                       │
//!                                                                     ▼
//!                                                       Toolchain ──▶ CompiledModule
//! ```
//!
//! - [`builder`] - incremental SSA construction and expression lowering
//! - [`ir`] - the statement tree, values and the mutation primitives
//! - [`analysis`] - type propagation and invariance analysis
//! - [`compiler`] - optimization passes and their scheduler
//! - [`codegen`] - slicing, C emission, templates and the toolchain
//! - [`pipeline`] - the [`FilterCompiler`](pipeline::FilterCompiler) entry point
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Compiler defects are
//! assertions; the only errors a correct compiler surfaces are input limits,
//! unusable templates and failures of the external toolchain. See [`Error`]
//! for which of them a host can recover from.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use filterc::prelude::*;
///
/// let compiler = FilterCompiler::new(CompilerConfig::default());
/// assert!(compiler.config().verify_ssa);
/// ```
pub mod prelude;

/// Arena storage and bit sets backing the IR.
pub mod utils;

/// The structured SSA intermediate representation.
///
/// # Key Types
///
/// - [`ir::Program`] - Owner of all slots, values and statements of a compilation
/// - [`ir::StmtKind`] - Assignments, phis, if-conditionals and while-loops
/// - [`ir::Rhs`] / [`ir::Primary`] - Right-hand sides and their operands
/// - [`ir::Operator`] - The operator table
/// - [`ir::Invariance`] - The two-axis invariance lattice
pub mod ir;

/// Incremental SSA construction.
pub mod builder;

/// The input expression tree.
pub mod expr;

/// Dataflow analyses over the SSA program.
pub mod analysis;

/// Optimization passes, their scheduler and the change log.
pub mod compiler;

/// Slicing, C emission and the toolchain handoff.
pub mod codegen;

/// Configuration types.
pub mod config;

/// The compilation pipeline.
pub mod pipeline;

/// `filterc` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use filterc::{Error, Result};
///
/// fn check_depth(depth: usize) -> Result<()> {
///     if depth > 64 {
///         return Err(Error::NestingTooDeep(64));
///     }
///     Ok(())
/// }
/// # assert!(check_depth(70).is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `filterc` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use filterc::{Error, ToolchainStage};
///
/// let err = Error::Toolchain {
///     stage: ToolchainStage::Link,
///     message: "undefined symbol".to_string(),
/// };
/// assert!(err.is_recoverable());
/// ```
pub use error::Error;

/// The external build step an [`Error::Toolchain`] refers to.
pub use error::ToolchainStage;

/// The compilation entry point and its output.
pub use pipeline::{FilterCompiler, Translation};
