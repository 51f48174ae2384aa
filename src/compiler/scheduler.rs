//! Pass scheduler running the optimization passes to a fixpoint.

use tracing::{debug, trace};

use crate::{
    compiler::{pass::SsaPass, EventKind, EventLog},
    ir::Program,
};

/// Runs a sequence of passes until none of them changes the program.
///
/// One iteration runs every registered pass once, in registration order.
/// The scheduler stops after the first iteration without changes, or after
/// `max_iterations` iterations, whichever comes first.
pub struct PassScheduler {
    /// Maximum number of iterations over the pass sequence.
    max_iterations: usize,
    /// The passes, in execution order.
    passes: Vec<Box<dyn SsaPass>>,
}

/// Outcome of a scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Iterations over the pass sequence, including the final quiet one.
    pub iterations: usize,
    /// `true` if the last iteration made no change.
    pub converged: bool,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(16)
    }
}

impl PassScheduler {
    /// Creates a scheduler without passes.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum iterations over the pass sequence before stopping.
    ///
    /// # Returns
    ///
    /// A new `PassScheduler`.
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            passes: Vec::new(),
        }
    }

    /// Appends a pass to the sequence.
    pub fn add(&mut self, pass: Box<dyn SsaPass>) {
        self.passes.push(pass);
    }

    /// Appends a pass, builder style.
    #[must_use]
    pub fn with(mut self, pass: impl SsaPass + 'static) -> Self {
        self.add(Box::new(pass));
        self
    }

    /// Names of the registered passes, in execution order.
    pub fn pass_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|p| p.name())
    }

    /// Runs every pass once.
    ///
    /// # Returns
    ///
    /// `true` if any pass changed the program.
    fn run_passes_once(&self, program: &mut Program, events: &mut EventLog) -> bool {
        let mut changed = false;
        for pass in &self.passes {
            if !pass.should_run(program) {
                continue;
            }
            let mut local = EventLog::new();
            let pass_changed = pass.run(program, &mut local);
            trace!(
                pass = pass.name(),
                changed = pass_changed,
                rewrites = local.transformation_count(),
                "pass finished"
            );
            events.merge(local);
            changed |= pass_changed;
        }
        changed
    }

    /// Runs the pass sequence to a fixpoint.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to optimize.
    /// * `events` - Log receiving the events of every pass.
    ///
    /// # Returns
    ///
    /// How many iterations ran and whether the program stopped changing.
    pub fn run(&self, program: &mut Program, events: &mut EventLog) -> ScheduleStats {
        let mut iterations = 0;
        let mut converged = self.passes.is_empty();

        while !converged && iterations < self.max_iterations {
            iterations += 1;
            converged = !self.run_passes_once(program, events);
        }

        if !converged {
            events.warn(format!(
                "optimization stopped after {iterations} iterations without reaching a fixpoint"
            ));
        }
        events
            .record(EventKind::PassCompleted)
            .message(format!("optimization finished after {iterations} iterations"));
        debug!(iterations, converged, summary = %events.summary(), "optimization finished");

        ScheduleStats {
            iterations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::test::factories::abs_program;

    /// Reports a change on its first `budget` runs.
    struct Countdown {
        budget: AtomicUsize,
    }

    impl SsaPass for Countdown {
        fn name(&self) -> &'static str {
            "countdown"
        }

        fn description(&self) -> &'static str {
            "changes a fixed number of times"
        }

        fn run(&self, _program: &mut Program, _events: &mut EventLog) -> bool {
            self.budget
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |b| b.checked_sub(1))
                .is_ok()
        }
    }

    #[test]
    fn test_runs_until_quiet() {
        let scheduler = PassScheduler::new(10).with(Countdown {
            budget: AtomicUsize::new(3),
        });
        let mut program = abs_program();
        let mut events = EventLog::new();
        let stats = scheduler.run(&mut program, &mut events);
        assert_eq!(stats.iterations, 4);
        assert!(stats.converged);
        assert!(!events.has(EventKind::Warning));
    }

    #[test]
    fn test_stops_at_iteration_cap() {
        let scheduler = PassScheduler::new(2).with(Countdown {
            budget: AtomicUsize::new(5),
        });
        let mut program = abs_program();
        let mut events = EventLog::new();
        let stats = scheduler.run(&mut program, &mut events);
        assert_eq!(stats.iterations, 2);
        assert!(!stats.converged);
        assert!(events.has(EventKind::Warning));
        assert_eq!(scheduler.pass_names().collect::<Vec<_>>(), ["countdown"]);
    }
}
