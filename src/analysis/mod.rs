//! Dataflow analyses over the statement tree.
//!
//! - [`types`] infers the type of every value.
//! - [`invariance`] classifies every value by the grid axes it is constant
//!   along, which decides where the emitter places its computation.
//!
//! Both write their results into the values themselves and can be rerun at
//! any time; each run starts from scratch.

pub mod invariance;
pub mod types;
pub mod worklist;

pub use invariance::{analyze_invariance, mark_all_variant, InvarianceStats};
pub use types::{propagate_types, rhs_type};
pub use worklist::Worklist;
