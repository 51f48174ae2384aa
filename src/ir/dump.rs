//! Human readable rendering of the statement tree.
//!
//! ```text
//! x[0]_1 (1) = y   y - y
//! if LESS(x[0]_1, 0)
//!   $t1_1 (1) = NEG(x[0]_1)   y - y
//! else
//!   nil
//! exit
//!   $t1_2 (1) = phi($t1_1, $t1_0)   y - y
//! end if
//! ```
//!
//! Each assignment shows its use count and, after the invariance analysis,
//! its own invariance followed by the least invariance of its direct and its
//! repeated uses.

use std::fmt::{self, Write};

use crate::ir::{
    program::{ListLoc, Program},
    rhs::{Primary, Rhs},
    stmt::{StmtId, StmtKind},
    value::ValueId,
};

impl Program {
    /// The display name of a value: its slot followed by its version.
    #[must_use]
    pub fn value_name(&self, value: ValueId) -> String {
        let slot = self.compvar_of(value);
        match self.value(value).version() {
            Some(version) => format!("{slot}_{version}"),
            None => format!("{slot}_0"),
        }
    }

    /// Renders a right-hand side with value names.
    #[must_use]
    pub fn rhs_string(&self, rhs: &Rhs) -> String {
        match rhs {
            Rhs::Primary(p) => self.primary_string(*p),
            Rhs::Internal(id) => self.internals.get(*id).name.clone(),
            Rhs::Op { op, args } => {
                let args: Vec<String> = args.iter().map(|p| self.primary_string(*p)).collect();
                format!("{}({})", op.name(), args.join(", "))
            }
        }
    }

    fn primary_string(&self, primary: Primary) -> String {
        match primary {
            Primary::Value(v) => self.value_name(v),
            other => other.to_string(),
        }
    }

    /// Renders the whole statement tree.
    #[must_use]
    pub fn dump(&self) -> String {
        self.to_string()
    }

    fn dump_list(&self, out: &mut impl Write, loc: ListLoc, depth: usize) -> fmt::Result {
        for &stmt in self.list(loc) {
            self.dump_stmt(out, stmt, depth)?;
        }
        Ok(())
    }

    fn dump_stmt(&self, out: &mut impl Write, stmt: StmtId, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match &self.stmt(stmt).kind {
            StmtKind::Nop => writeln!(out, "{pad}nil"),
            StmtKind::Assign { lhs, rhs } => {
                let rhs = self.rhs_string(rhs);
                self.dump_assign(out, &pad, *lhs, &rhs)
            }
            StmtKind::Phi { lhs, rhs, .. } => {
                let rhs = format!(
                    "phi({}, {})",
                    self.rhs_string(&rhs[0]),
                    self.rhs_string(&rhs[1])
                );
                self.dump_assign(out, &pad, *lhs, &rhs)
            }
            StmtKind::If { condition, .. } => {
                writeln!(out, "{pad}if {}", self.rhs_string(condition))?;
                self.dump_list(out, ListLoc::Consequent(stmt), depth + 1)?;
                writeln!(out, "{pad}else")?;
                self.dump_list(out, ListLoc::Alternative(stmt), depth + 1)?;
                writeln!(out, "{pad}exit")?;
                self.dump_list(out, ListLoc::Exit(stmt), depth + 1)?;
                writeln!(out, "{pad}end if")
            }
            StmtKind::While { invariant, .. } => {
                writeln!(out, "{pad}start while")?;
                self.dump_list(out, ListLoc::Entry(stmt), depth + 1)?;
                writeln!(out, "{pad}while {}", self.rhs_string(invariant))?;
                self.dump_list(out, ListLoc::Body(stmt), depth + 1)?;
                writeln!(out, "{pad}end while")
            }
        }
    }

    fn dump_assign(&self, out: &mut impl Write, pad: &str, lhs: ValueId, rhs: &str) -> fmt::Result {
        let value = self.value(lhs);
        writeln!(
            out,
            "{pad}{} ({}) = {rhs}   {} {} {}",
            self.value_name(lhs),
            value.uses().len(),
            value.invariance(),
            value.least_direct_use(),
            value.least_multiple_use(),
        )
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump_list(f, ListLoc::Root, 0)
    }
}
