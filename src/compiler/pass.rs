//! The trait implemented by every optimization pass.

use crate::{compiler::EventLog, ir::Program};

/// A transformation over the SSA program.
///
/// Passes don't declare an order. The [`PassScheduler`](crate::compiler::PassScheduler)
/// runs them in registration order and repeats the sequence until none of
/// them reports a change. Every pass must therefore be idempotent: a second
/// run directly after the first has to return `false`.
///
/// Passes cannot fail. The IR primitives assert their own preconditions, so a
/// pass either completes its rewrite or trips on a compiler defect.
pub trait SsaPass: Send + Sync {
    /// Unique name for logging and event attribution.
    fn name(&self) -> &'static str;

    /// Human-readable description of what the pass does.
    fn description(&self) -> &'static str;

    /// Should this pass run on `program` at all?
    ///
    /// Override to skip programs the pass cannot improve.
    fn should_run(&self, _program: &Program) -> bool {
        true
    }

    /// Runs the pass.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to transform.
    /// * `events` - Log receiving one event per rewrite.
    ///
    /// # Returns
    ///
    /// `true` if the program changed, `false` otherwise.
    fn run(&self, program: &mut Program, events: &mut EventLog) -> bool;
}
