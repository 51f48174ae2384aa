//! Optimization infrastructure for the SSA program.
//!
//! This module sits between analysis and code generation:
//!
//! - [`crate::builder`] and [`crate::analysis`] build the program and infer types
//! - [`compiler`](self) rewrites it with optimization passes
//! - [`crate::codegen`] analyses invariance results, slices and emits C
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Optimization Stage                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  PassScheduler               Fixpoint execution                  │
//! │    └─ run every pass in order, repeat until none changes         │
//! │       or the iteration cap is hit                                │
//! │                                                                  │
//! │  SsaPass trait               Interface for all passes            │
//! │    ├─ should_run()            Skip programs the pass can't help  │
//! │    └─ run()                   Transform, report whether changed  │
//! │                                                                  │
//! │  Passes                                                          │
//! │    ├─ ColorFusionPass         repacked colors → copies           │
//! │    ├─ CopyPropagationPass     uses of copies → copied operands   │
//! │    └─ DeadCodeEliminationPass unused pure definitions → nops     │
//! │                                                                  │
//! │  EventLog                    Change tracking and diagnostics     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod events;
mod pass;
mod passes;
mod scheduler;

pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use pass::SsaPass;
pub use passes::{ColorFusionPass, CopyPropagationPass, DeadCodeEliminationPass};
pub use scheduler::{PassScheduler, ScheduleStats};
