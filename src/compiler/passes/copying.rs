//! Copy propagation pass.
//!
//! Replaces every use of a copy's destination with the copied operand, so
//! that the copy itself becomes dead.
//!
//! # Example
//!
//! Before:
//! ```text
//! y[0]_1 = x[0]_0
//! $t2_0 = NEG(y[0]_1)
//! ```
//!
//! After:
//! ```text
//! y[0]_1 = x[0]_0        // now unused, left for dead code elimination
//! $t2_0 = NEG(x[0]_0)
//! ```
//!
//! Constants propagate the same way: the uses of `a = 3` read `3` directly.
//!
//! # Algorithm
//!
//! 1. Visit every assignment whose right-hand side is a plain operand
//!    other than its own destination.
//! 2. Rewrite all uses of the destination to that operand, phis included.
//! 3. Repeat until a sweep rewrites nothing.
//!
//! Every sweep leaves the destinations it visited without uses, so the pass
//! converges after at most one extra sweep per chained copy.

use crate::{
    compiler::{pass::SsaPass, EventKind, EventLog},
    ir::{Primary, Program, Rhs, StmtKind},
};

/// Copy propagation pass.
pub struct CopyPropagationPass;

impl Default for CopyPropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyPropagationPass {
    /// Creates a new copy propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs one sweep over all assignments.
    ///
    /// # Returns
    ///
    /// The number of rewritten references.
    fn sweep(&self, program: &mut Program, events: &mut EventLog) -> usize {
        let mut rewritten = 0;

        for stmt in program.assign_statements() {
            let StmtKind::Assign {
                lhs,
                rhs: Rhs::Primary(source),
            } = *program.stmt(stmt).kind()
            else {
                continue;
            };
            if source == Primary::Value(lhs) || program.value(lhs).uses().is_empty() {
                continue;
            }

            let message = format!(
                "{} -> {}",
                program.value_name(lhs),
                program.rhs_string(&Rhs::Primary(source))
            );
            rewritten += program.rewrite_uses(lhs, source, None);
            events
                .record(EventKind::CopyPropagated)
                .at(stmt)
                .pass(self.name())
                .message(message);
        }

        rewritten
    }
}

impl SsaPass for CopyPropagationPass {
    fn name(&self) -> &'static str {
        "copy-propagation"
    }

    fn description(&self) -> &'static str {
        "Replaces uses of copied values with their sources"
    }

    fn run(&self, program: &mut Program, events: &mut EventLog) -> bool {
        let mut changed = false;
        while self.sweep(program, events) > 0 {
            changed = true;
        }
        changed
    }
}
