//! Optimization passes.
//!
//! | Pass | Rewrite |
//! |------|---------|
//! | [`ColorFusionPass`] | `MAKE_COLOR` of a color's own channels becomes a copy of the color |
//! | [`CopyPropagationPass`] | uses of `a = b` read `b` directly |
//! | [`DeadCodeEliminationPass`] | unused pure definitions become no-ops |
//!
//! The passes feed each other: fusion produces copies, propagation leaves
//! them unused and elimination removes them together with the channel
//! extractions they made redundant.

mod algebraic;
mod copying;
mod deadcode;

pub use algebraic::ColorFusionPass;
pub use copying::CopyPropagationPass;
pub use deadcode::DeadCodeEliminationPass;
