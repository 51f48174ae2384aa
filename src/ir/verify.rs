//! Structural checks of the SSA form.
//!
//! Neither check is needed to compile correct input; they exist to catch
//! builder and pass defects early. [`Program::verify_ssa`] replays the tree
//! and tracks which values are defined at each point, [`Program::verify_uses`]
//! compares every use list against the references actually present.

use std::collections::HashMap;

use crate::{
    ir::{
        program::{ListLoc, Program, ValueSet},
        rhs::Rhs,
        stmt::{StmtId, StmtKind},
        value::ValueId,
    },
    Result,
};

impl Program {
    /// Checks that every referenced value is defined where it is used.
    ///
    /// Initial slot values count as defined from the start. Values defined in
    /// a branch are visible only inside it, except through the exit phis:
    /// slot 0 of an exit phi must be defined at the end of the consequent,
    /// slot 1 at the end of the alternative. Slot 0 of a loop entry phi must
    /// be defined before the loop, slot 1 at the end of the body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSsa`] naming the first violation found.
    pub fn verify_ssa(&self) -> Result<()> {
        let mut defined = self.new_value_set();
        for (id, value) in self.values() {
            if value.def().is_none() {
                defined.add(id);
            }
        }
        self.verify_list(ListLoc::Root, &mut defined)
    }

    fn verify_list(&self, loc: ListLoc, defined: &mut ValueSet) -> Result<()> {
        for &stmt in self.list(loc) {
            match &self.stmt(stmt).kind {
                StmtKind::Nop => {}
                StmtKind::Assign { lhs, rhs } => {
                    self.verify_rhs(stmt, rhs, defined)?;
                    self.define(stmt, *lhs, defined)?;
                }
                StmtKind::Phi { .. } => {
                    return Err(invalid_ssa!("{} is a phi outside of a merge list", stmt));
                }
                StmtKind::If {
                    condition, exit, ..
                } => {
                    self.verify_rhs(stmt, condition, defined)?;
                    let mut consequent = defined.clone();
                    self.verify_list(ListLoc::Consequent(stmt), &mut consequent)?;
                    let mut alternative = defined.clone();
                    self.verify_list(ListLoc::Alternative(stmt), &mut alternative)?;
                    for &phi in exit {
                        let Some((lhs, rhs)) = self.phi_parts(phi)? else {
                            continue;
                        };
                        self.verify_rhs(phi, &rhs[0], &consequent)?;
                        self.verify_rhs(phi, &rhs[1], &alternative)?;
                        self.define(phi, lhs, defined)?;
                    }
                }
                StmtKind::While {
                    entry, invariant, ..
                } => {
                    let before = defined.clone();
                    for &phi in entry {
                        let Some((lhs, rhs)) = self.phi_parts(phi)? else {
                            continue;
                        };
                        self.verify_rhs(phi, &rhs[0], &before)?;
                        self.define(phi, lhs, defined)?;
                    }
                    self.verify_rhs(stmt, invariant, defined)?;
                    let mut body = defined.clone();
                    self.verify_list(ListLoc::Body(stmt), &mut body)?;
                    for &phi in entry {
                        if let Some((_, rhs)) = self.phi_parts(phi)? {
                            self.verify_rhs(phi, &rhs[1], &body)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Merge lists hold phis, or nops left behind by dead code elimination.
    fn phi_parts(&self, stmt: StmtId) -> Result<Option<(ValueId, &[Rhs; 2])>> {
        match &self.stmt(stmt).kind {
            StmtKind::Phi { lhs, rhs, .. } => Ok(Some((*lhs, rhs))),
            StmtKind::Nop => Ok(None),
            other => Err(invalid_ssa!("{} in a merge list is not a phi: {:?}", stmt, other)),
        }
    }

    fn verify_rhs(&self, stmt: StmtId, rhs: &Rhs, defined: &ValueSet) -> Result<()> {
        for value in rhs.values() {
            if !defined.contains(value) {
                return Err(invalid_ssa!(
                    "{} uses {} ({}) which is not defined there",
                    stmt,
                    value,
                    self.value_name(value)
                ));
            }
        }
        Ok(())
    }

    fn define(&self, stmt: StmtId, lhs: ValueId, defined: &mut ValueSet) -> Result<()> {
        if defined.contains(lhs) {
            return Err(invalid_ssa!("{} defines {} a second time", stmt, lhs));
        }
        let value = self.value(lhs);
        if value.def() != Some(stmt) {
            return Err(invalid_ssa!(
                "{} defines {} but the value names {:?} as its definition",
                stmt,
                lhs,
                value.def()
            ));
        }
        if value.version().is_none() {
            return Err(invalid_ssa!("{} defines {} which was never committed", stmt, lhs));
        }
        defined.add(lhs);
        Ok(())
    }

    /// Checks that every use list matches the references in the statement tree.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSsa`] naming the first value whose use
    /// list disagrees with the tree.
    pub fn verify_uses(&self) -> Result<()> {
        let mut expected: HashMap<ValueId, Vec<StmtId>> = HashMap::new();
        for stmt in self.preorder() {
            for value in self.stmt(stmt).kind.referenced_values() {
                expected.entry(value).or_default().push(stmt);
            }
        }
        for (id, value) in self.values() {
            let mut actual = value.uses().to_vec();
            actual.sort_unstable();
            let mut wanted = expected.remove(&id).unwrap_or_default();
            wanted.sort_unstable();
            if actual != wanted {
                return Err(invalid_ssa!(
                    "use list of {} is {:?}, the tree references it from {:?}",
                    id,
                    actual,
                    wanted
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ir::{Primary, Rhs, StmtKind},
        test::factories::{abs_program, counter_loop_program},
        Error,
    };

    #[test]
    fn test_built_programs_verify() {
        for program in [abs_program(), counter_loop_program()] {
            program.verify_ssa().unwrap();
            program.verify_uses().unwrap();
        }
    }

    #[test]
    fn test_stale_use_list_is_reported() {
        let mut program = abs_program();
        let stmt = program.assign_statements()[0];
        let lhs = program.stmt(stmt).lhs().unwrap();
        program.add_use(lhs, stmt);
        assert!(matches!(program.verify_uses(), Err(Error::InvalidSsa { .. })));
    }

    #[test]
    fn test_use_of_branch_local_value_after_merge_is_reported() {
        let mut program = abs_program();
        let neg = program
            .assign_statements()
            .into_iter()
            .find(|&s| {
                program.stmt(s).parent().is_some()
                    && matches!(program.stmt(s).kind(), StmtKind::Assign { rhs: Rhs::Op { .. }, .. })
            })
            .unwrap();
        let branch_value = program.stmt(neg).lhs().unwrap();

        let last = *program.body().last().unwrap();
        let stale = program.stmt(last).kind().referenced_values()[0];
        program.rewrite_uses(stale, Primary::Value(branch_value), None);
        assert!(program.verify_ssa().is_err());
    }
}
