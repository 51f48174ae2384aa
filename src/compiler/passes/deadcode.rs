//! Dead code elimination pass.
//!
//! Removes assignments and phis whose values are never used and whose
//! evaluation has no side effects.
//!
//! # Algorithm
//!
//! 1. Queue every defined value without uses.
//! 2. Pop a value. If its definition is still live and pure, turn the
//!    definition into a no-op, which drops the uses it made.
//! 3. Queue every value whose use list became empty through that removal.
//! 4. Repeat until the queue is empty.
//!
//! Removed statements stay in their list as no-ops; emission skips them.
//! Statements with side effects, like color output, are never removed and
//! keep their operands alive.

use crate::{
    analysis::Worklist,
    compiler::{pass::SsaPass, EventKind, EventLog},
    ir::{Program, StmtId, StmtKind, ValueId},
};

/// Dead code elimination pass.
pub struct DeadCodeEliminationPass;

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeEliminationPass {
    /// Creates a new dead code elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The live, side-effect free definition of `value`, if it has one.
    fn removable_def(program: &Program, value: ValueId) -> Option<StmtId> {
        let def = program.value(value).def()?;
        let pure = match program.stmt(def).kind() {
            StmtKind::Assign { rhs, .. } => rhs.is_pure(),
            StmtKind::Phi { rhs, .. } => rhs.iter().all(|r| r.is_pure()),
            _ => false,
        };
        pure.then_some(def)
    }
}

impl SsaPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes unused side-effect free assignments"
    }

    fn run(&self, program: &mut Program, events: &mut EventLog) -> bool {
        let mut worklist = Worklist::new();
        worklist.extend(
            program
                .values()
                .filter(|(_, v)| v.def().is_some() && v.uses().is_empty())
                .map(|(id, _)| id),
        );

        let mut removed = 0;
        while let Some(value) = worklist.pop() {
            if !program.value(value).uses().is_empty() {
                continue;
            }
            let Some(def) = Self::removable_def(program, value) else {
                continue;
            };

            let name = program.value_name(value);
            for released in program.remove_stmt(def) {
                if program.value(released).uses().is_empty() {
                    worklist.push(released);
                }
            }
            removed += 1;
            events
                .record(EventKind::StatementRemoved)
                .at(def)
                .pass(self.name())
                .message(format!("removed unused {name}"));
        }

        removed > 0
    }
}
