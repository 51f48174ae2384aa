//! Two-axis invariance analysis.
//!
//! Three passes run over the statement tree:
//!
//! 1. **Definitions**, top-down to a fixpoint. A value is as invariant as its
//!    operands, but never more invariant than the conditions guarding it.
//!    Impure operators yield fully variant values.
//! 2. **Repeated uses**, to a fixpoint. Values read by statements that run
//!    more than once within a loop are limited to the invariance of the
//!    least invariant value computed from them there.
//! 3. **Direct uses**, one pass. Each value learns the least invariant
//!    context it is read in.
//!
//! A value whose repeated-use invariance equals its own, but which is read
//! somewhere more variant, is computed once per region and cached; see
//! [`Value::is_permanent`](crate::ir::Value::is_permanent).

use tracing::debug;

use crate::ir::{Invariance, ListLoc, Primary, Program, Rhs, StmtKind, ValueId, ValueSet};

/// Counters of one analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvarianceStats {
    /// Rounds of the definition pass, the last one making no change.
    pub definition_rounds: usize,
    /// Rounds of the repeated-use pass, the last one making no change.
    pub repeated_use_rounds: usize,
    /// Values cached permanently.
    pub permanent: usize,
}

/// Classifies every value of `program`.
pub fn analyze_invariance(program: &mut Program) -> InvarianceStats {
    let mut analysis = InvarianceAnalysis {
        program,
        changed: false,
    };
    let stats = analysis.run();
    debug!(
        definition_rounds = stats.definition_rounds,
        repeated_use_rounds = stats.repeated_use_rounds,
        permanent = stats.permanent,
        "invariance analyzed"
    );
    stats
}

/// Classifies every value as varying per element.
///
/// Used when the analysis is disabled: all code then lands in the
/// per-element region and nothing is cached.
pub fn mark_all_variant(program: &mut Program) {
    for value in program.values.values_mut() {
        value.invariance = Invariance::NONE;
        value.least_direct_use = Invariance::NONE;
        value.least_multiple_use = Invariance::NONE;
    }
}

struct InvarianceAnalysis<'a> {
    program: &'a mut Program,
    changed: bool,
}

impl InvarianceAnalysis<'_> {
    fn run(&mut self) -> InvarianceStats {
        let mut stats = InvarianceStats::default();

        for value in self.program.values.values_mut() {
            value.invariance = Invariance::XY;
            value.least_direct_use = Invariance::XY;
            value.least_multiple_use = Invariance::XY;
        }
        loop {
            self.changed = false;
            self.definitions(ListLoc::Root, Invariance::XY);
            stats.definition_rounds += 1;
            if !self.changed {
                break;
            }
        }

        for value in self.program.values.values_mut() {
            value.least_multiple_use = value.invariance;
            value.least_direct_use = value.invariance;
        }
        loop {
            self.changed = false;
            let mut assigned_in_loop = self.program.new_value_set();
            self.repeated_uses(ListLoc::Root, false, &mut assigned_in_loop);
            stats.repeated_use_rounds += 1;
            if !self.changed {
                break;
            }
        }

        self.direct_uses(ListLoc::Root);

        stats.permanent = self
            .program
            .values()
            .filter(|(_, v)| v.def().is_some() && v.is_permanent())
            .count();
        stats
    }

    fn primary_invariance(&self, primary: Primary) -> Invariance {
        match primary {
            Primary::Value(value) => self.program.value(value).effective_invariance(),
            Primary::Int(_) | Primary::Float(_) => Invariance::XY,
        }
    }

    fn rhs_invariance(&self, rhs: &Rhs) -> Invariance {
        match rhs {
            Rhs::Primary(primary) => self.primary_invariance(*primary),
            Rhs::Internal(id) => self.program.internals().get(*id).invariance,
            Rhs::Op { op, args } if op.is_pure() => args
                .iter()
                .fold(Invariance::XY, |acc, arg| acc & self.primary_invariance(*arg)),
            Rhs::Op { .. } => Invariance::NONE,
        }
    }

    fn set_invariance(&mut self, value: ValueId, invariance: Invariance) {
        let value = self.program.value_mut(value);
        if value.invariance != invariance {
            value.invariance = invariance;
            self.changed = true;
        }
    }

    fn definitions(&mut self, loc: ListLoc, inherited: Invariance) {
        for stmt in self.program.list(loc).to_vec() {
            match self.program.stmt(stmt).kind() {
                StmtKind::Nop => {}
                StmtKind::Assign { lhs, rhs } => {
                    let (lhs, invariance) = (*lhs, self.rhs_invariance(rhs) & inherited);
                    self.set_invariance(lhs, invariance);
                }
                StmtKind::Phi { .. } => panic!("{stmt} is a phi outside of a merge list"),
                StmtKind::If { condition, .. } => {
                    let guard = self.rhs_invariance(condition) & inherited;
                    self.definitions(ListLoc::Consequent(stmt), guard);
                    self.definitions(ListLoc::Alternative(stmt), guard);
                    self.phi_definitions(ListLoc::Exit(stmt), guard);
                }
                StmtKind::While { invariant, .. } => {
                    let guard = self.rhs_invariance(invariant) & inherited;
                    self.phi_definitions(ListLoc::Entry(stmt), guard);
                    self.definitions(ListLoc::Body(stmt), guard);
                }
            }
        }
    }

    fn phi_definitions(&mut self, loc: ListLoc, guard: Invariance) {
        for stmt in self.program.list(loc).to_vec() {
            let StmtKind::Phi { lhs, rhs, .. } = self.program.stmt(stmt).kind() else {
                continue;
            };
            let invariance =
                self.rhs_invariance(&rhs[0]) & self.rhs_invariance(&rhs[1]) & guard;
            let lhs = *lhs;
            self.set_invariance(lhs, invariance);
        }
    }

    /// Limits the repeated-use invariance of `value` to `mask` if it is
    /// assigned inside the loop being walked.
    fn limit_repeated(&mut self, value: ValueId, assigned_in_loop: &ValueSet, mask: Invariance) {
        if !assigned_in_loop.contains(value) {
            return;
        }
        let value = self.program.value_mut(value);
        if value.least_multiple_use & mask != value.least_multiple_use {
            value.least_multiple_use &= mask;
            self.changed = true;
        }
    }

    /// Returns the least repeated-use invariance of the values defined in the list.
    fn repeated_uses(
        &mut self,
        loc: ListLoc,
        in_loop: bool,
        assigned_in_loop: &mut ValueSet,
    ) -> Invariance {
        let mut least = Invariance::XY;
        for stmt in self.program.list(loc).to_vec() {
            let kind = self.program.stmt(stmt).kind();
            match kind {
                StmtKind::Nop => {}
                StmtKind::Assign { lhs, .. } | StmtKind::Phi { lhs, .. } => {
                    let lhs = *lhs;
                    let operands = kind.referenced_values();
                    let mask = self.program.value(lhs).least_multiple_use;
                    for value in operands {
                        self.limit_repeated(value, assigned_in_loop, mask);
                    }
                    if in_loop {
                        assigned_in_loop.add(lhs);
                    }
                    least &= self.program.value(lhs).least_multiple_use;
                }
                StmtKind::If { .. } => {
                    let condition = kind.referenced_values();
                    let mut sub =
                        self.repeated_uses(ListLoc::Consequent(stmt), in_loop, assigned_in_loop);
                    sub &= self.repeated_uses(ListLoc::Alternative(stmt), in_loop, assigned_in_loop);
                    sub &= self.repeated_uses(ListLoc::Exit(stmt), in_loop, assigned_in_loop);
                    for value in condition {
                        self.limit_repeated(value, assigned_in_loop, sub);
                    }
                    least &= sub;
                }
                StmtKind::While { .. } => {
                    let invariant = kind.referenced_values();
                    let mut sub = self.repeated_uses(ListLoc::Entry(stmt), in_loop, assigned_in_loop);

                    // Body and entry feed each other, hence body, entry, body.
                    let mut inner = assigned_in_loop.clone();
                    sub &= self.repeated_uses(ListLoc::Body(stmt), true, &mut inner);
                    sub &= self.repeated_uses(ListLoc::Entry(stmt), true, &mut inner);
                    sub &= self.repeated_uses(ListLoc::Body(stmt), true, &mut inner);

                    for value in invariant {
                        self.limit_repeated(value, &inner, sub);
                    }
                    least &= sub;
                }
            }
        }
        least
    }

    /// Returns the least invariance of the values defined in the list.
    fn direct_uses(&mut self, loc: ListLoc) -> Invariance {
        let mut least = Invariance::XY;
        for stmt in self.program.list(loc).to_vec() {
            let kind = self.program.stmt(stmt).kind();
            let operands = kind.referenced_values();
            let context = match kind {
                StmtKind::Nop => continue,
                StmtKind::Assign { lhs, .. } | StmtKind::Phi { lhs, .. } => {
                    self.program.value(*lhs).effective_invariance()
                }
                StmtKind::If { .. } => {
                    self.direct_uses(ListLoc::Consequent(stmt))
                        & self.direct_uses(ListLoc::Alternative(stmt))
                        & self.direct_uses(ListLoc::Exit(stmt))
                }
                StmtKind::While { .. } => {
                    self.direct_uses(ListLoc::Entry(stmt)) & self.direct_uses(ListLoc::Body(stmt))
                }
            };
            for value in operands {
                self.program.value_mut(value).least_direct_use &= context;
            }
            least &= context;
        }
        least
    }
}
