//! Shared infrastructure for the compiler core.
//!
//! - [`arena`] - typed, index-addressed storage for IR nodes
//! - [`bitset`] - dense bit sets used for value membership during analysis

pub mod arena;
pub mod bitset;

pub use arena::{Arena, ArenaId};
pub use bitset::BitSet;
