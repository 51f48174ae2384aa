//! Incremental SSA construction over structured control flow.
//!
//! The builder never computes dominance frontiers. It relies on the input
//! being structured: every merge point is the end of an if or the head of a
//! loop, and both are known while they are open. Phis are created lazily the
//! first time a slot is assigned inside an open construct.
//!
//! # Phi placement
//!
//! ```text
//! if c          exit phi per slot assigned in either branch:
//!   y = a         slot 0 <- value at the end of the consequent
//! else            slot 1 <- value at the end of the alternative
//!   y = b         both start as the value live before the if
//! end if
//!
//! while c       entry phi per slot assigned in the body:
//!   i = i + 1     slot 0 <- value live before the loop
//! end while       slot 1 <- value at the end of the body
//! ```
//!
//! When a loop phi is created, reads of the pre-loop value that were already
//! emitted inside the loop are redirected to the phi, since at run time they
//! observe the loop-carried value.
//!
//! Closing a construct restores each merged slot to the value it had before
//! the construct opened and then commits the phi's own definition against
//! the enclosing construct, so merges compose across nesting levels.
//!
//! # Example
//!
//! ```rust
//! use filterc::builder::SsaBuilder;
//! use filterc::ir::{InternalTable, Operator, Primary, Program, Rhs};
//!
//! let mut builder = SsaBuilder::new(Program::new(InternalTable::standard()));
//! let i = builder.make_variable("i", 0);
//! builder.emit_assign(i, Rhs::Primary(Primary::Int(0)));
//!
//! let cond = builder.make_temporary();
//! let test = Rhs::op(Operator::Less, vec![builder.current(i).into(), Primary::Int(10)]);
//! builder.emit_assign(cond, test);
//! builder.start_while(cond)?;
//! let next = Rhs::op(Operator::Add, vec![builder.current(i).into(), Primary::Int(1)]);
//! builder.emit_assign(i, next);
//! let test = Rhs::op(Operator::Less, vec![builder.current(i).into(), Primary::Int(10)]);
//! builder.emit_assign(cond, test);
//! builder.end_while();
//!
//! let program = builder.finish();
//! program.verify_ssa()?;
//! # Ok::<(), filterc::Error>(())
//! ```

pub mod lower;

use tracing::trace;

use crate::{
    ir::{CompVarId, ListLoc, Primary, Program, Rhs, StmtId, StmtKind, ValueId},
    Error, Result,
};

/// Default maximum nesting of if/while constructs.
pub const DEFAULT_MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Consequent,
    Alternative,
    Body,
}

/// An open construct.
#[derive(Debug, Clone, Copy)]
struct Frame {
    stmt: StmtId,
    branch: Branch,
}

impl Frame {
    fn insertion_point(self) -> ListLoc {
        match self.branch {
            Branch::Consequent => ListLoc::Consequent(self.stmt),
            Branch::Alternative => ListLoc::Alternative(self.stmt),
            Branch::Body => ListLoc::Body(self.stmt),
        }
    }
}

/// Builds a [`Program`] in SSA form from structured control flow.
///
/// The builder is the whole mutable state of a compilation in progress: the
/// program under construction, the stack of open constructs and, implicitly
/// through that stack, the insertion point.
pub struct SsaBuilder {
    program: Program,
    stack: Vec<Frame>,
    max_depth: usize,
}

impl SsaBuilder {
    /// Creates a builder appending to the top level of `program`.
    #[must_use]
    pub fn new(program: Program) -> Self {
        SsaBuilder {
            program,
            stack: Vec::new(),
            max_depth: DEFAULT_MAX_NESTING,
        }
    }

    /// Sets the maximum construct nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The program built so far.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Number of currently open constructs.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns the finished program.
    ///
    /// # Panics
    ///
    /// Panics if a construct is still open.
    #[must_use]
    pub fn finish(self) -> Program {
        assert!(
            self.stack.is_empty(),
            "{} constructs are still open",
            self.stack.len()
        );
        self.program
    }

    /// Allocates a temporary slot.
    pub fn make_temporary(&mut self) -> CompVarId {
        self.program.make_temporary()
    }

    /// Allocates the slot for one component of a user variable.
    pub fn make_variable(&mut self, name: &str, component: usize) -> CompVarId {
        self.program.make_variable(name, component)
    }

    /// The value currently bound to `compvar`.
    #[must_use]
    pub fn current(&self, compvar: CompVarId) -> ValueId {
        self.program.current(compvar)
    }

    fn insertion_point(&self) -> ListLoc {
        self.stack
            .last()
            .map_or(ListLoc::Root, |frame| frame.insertion_point())
    }

    /// Appends a statement at the insertion point and records its uses.
    pub fn emit_statement(&mut self, kind: StmtKind) -> StmtId {
        let parent = self.stack.last().map(|frame| frame.stmt);
        let stmt = self.program.alloc_stmt(kind, parent);
        let loc = self.insertion_point();
        self.program.list_mut(loc).push(stmt);
        stmt
    }

    /// Appends a no-op.
    pub fn emit_nop(&mut self) -> StmtId {
        self.emit_statement(StmtKind::Nop)
    }

    /// Assigns `rhs` to a fresh value of `compvar` and commits it.
    pub fn emit_assign(&mut self, compvar: CompVarId, rhs: Rhs) -> ValueId {
        let lhs = self.program.make_lhs(compvar);
        self.emit_statement(StmtKind::Assign { lhs, rhs });
        self.commit_assign(lhs);
        lhs
    }

    /// Makes the freshly defined `lhs` the current value of its slot.
    ///
    /// Inside an open construct the definition is routed through the
    /// construct's phi for the slot, creating the phi on first use.
    pub fn commit_assign(&mut self, lhs: ValueId) {
        if let Some(frame) = self.stack.last().copied() {
            let compvar = self.program.value(lhs).compvar();
            match frame.branch {
                Branch::Consequent | Branch::Alternative => {
                    let slot = usize::from(frame.branch == Branch::Alternative);
                    let phi = match self.find_phi(ListLoc::Exit(frame.stmt), compvar) {
                        Some(phi) => phi,
                        None => self.create_exit_phi(frame.stmt, compvar),
                    };
                    self.program.replace_phi_slot(phi, slot, Rhs::value(lhs));
                }
                Branch::Body => match self.find_phi(ListLoc::Entry(frame.stmt), compvar) {
                    Some(phi) => self.program.replace_phi_slot(phi, 1, Rhs::value(lhs)),
                    None => self.create_entry_phi(frame.stmt, compvar, lhs),
                },
            }
        }
        self.program.assign_index_and_make_current(lhs);
    }

    fn find_phi(&self, loc: ListLoc, compvar: CompVarId) -> Option<StmtId> {
        self.program.list(loc).iter().copied().find(|&stmt| {
            matches!(self.program.stmt(stmt).kind(), StmtKind::Phi { lhs, .. }
                if self.program.value(*lhs).compvar() == compvar)
        })
    }

    fn create_exit_phi(&mut self, construct: StmtId, compvar: CompVarId) -> StmtId {
        let before = self.program.current(compvar);
        let lhs = self.program.make_lhs(compvar);
        let phi = self.program.alloc_stmt(
            StmtKind::Phi {
                lhs,
                rhs: [Rhs::value(before), Rhs::value(before)],
                old_value: Some(before),
            },
            Some(construct),
        );
        self.program.list_mut(ListLoc::Exit(construct)).push(phi);
        trace!(%construct, %phi, %before, "created exit phi");
        phi
    }

    fn create_entry_phi(&mut self, construct: StmtId, compvar: CompVarId, carried: ValueId) {
        let before = self.program.current(compvar);
        let lhs = self.program.make_lhs(compvar);
        let phi = self.program.alloc_stmt(
            StmtKind::Phi {
                lhs,
                rhs: [Rhs::value(before), Rhs::value(carried)],
                old_value: Some(before),
            },
            Some(construct),
        );
        self.program.list_mut(ListLoc::Entry(construct)).push(phi);
        let rewritten = self
            .program
            .rewrite_uses(before, Primary::Value(lhs), Some(construct));
        trace!(%construct, %phi, %before, rewritten, "created entry phi");
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::NestingTooDeep(self.max_depth));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn top(&self, expected: &[Branch]) -> Frame {
        let frame = *self.stack.last().unwrap_or_else(|| panic!("no construct is open"));
        assert!(
            expected.contains(&frame.branch),
            "{} is in {:?}, expected one of {:?}",
            frame.stmt,
            frame.branch,
            expected
        );
        frame
    }

    /// Opens an if-conditional. Subsequent statements go to the consequent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NestingTooDeep`] if the construct stack is full.
    pub fn start_if(&mut self, condition: Rhs) -> Result<StmtId> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::NestingTooDeep(self.max_depth));
        }
        let stmt = self.emit_statement(StmtKind::If {
            condition,
            consequent: Vec::new(),
            alternative: Vec::new(),
            exit: Vec::new(),
        });
        self.push(Frame {
            stmt,
            branch: Branch::Consequent,
        })?;
        Ok(stmt)
    }

    /// Moves the insertion point of the innermost if to its alternative.
    ///
    /// # Panics
    ///
    /// Panics if the innermost construct is not an if still in its consequent.
    pub fn switch_branch(&mut self) {
        let frame = self.top(&[Branch::Consequent]);
        if self.program.list(ListLoc::Consequent(frame.stmt)).is_empty() {
            self.emit_nop();
        }
        self.restore_slots(ListLoc::Exit(frame.stmt), false);
        if let Some(top) = self.stack.last_mut() {
            top.branch = Branch::Alternative;
        }
    }

    /// Closes the innermost if and commits its exit phis.
    ///
    /// An if closed straight from its consequent gets an empty alternative.
    ///
    /// # Panics
    ///
    /// Panics if the innermost construct is not an if.
    pub fn end_if(&mut self) {
        if self.top(&[Branch::Consequent, Branch::Alternative]).branch == Branch::Consequent {
            self.switch_branch();
        }
        let frame = self.top(&[Branch::Alternative]);
        if self.program.list(ListLoc::Alternative(frame.stmt)).is_empty() {
            self.emit_nop();
        }
        self.stack.pop();
        self.close(ListLoc::Exit(frame.stmt));
    }

    /// Opens a while-loop whose condition is the value of `condition`.
    ///
    /// The slot gets its entry phi right away, so the loop condition reads
    /// the loop-carried value. Statements re-evaluating the condition at the
    /// end of the body feed the phi's second slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NestingTooDeep`] if the construct stack is full.
    pub fn start_while(&mut self, condition: CompVarId) -> Result<StmtId> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::NestingTooDeep(self.max_depth));
        }
        let before = self.program.current(condition);
        let carried = self.program.make_lhs(condition);
        let stmt = self.emit_statement(StmtKind::While {
            entry: Vec::new(),
            invariant: Rhs::value(carried),
            body: Vec::new(),
        });
        let phi = self.program.alloc_stmt(
            StmtKind::Phi {
                lhs: carried,
                rhs: [Rhs::value(before), Rhs::value(before)],
                old_value: Some(before),
            },
            Some(stmt),
        );
        self.program.list_mut(ListLoc::Entry(stmt)).push(phi);
        self.program.set_current(condition, carried);
        self.push(Frame {
            stmt,
            branch: Branch::Body,
        })?;
        Ok(stmt)
    }

    /// Closes the innermost while-loop and commits its entry phis.
    ///
    /// # Panics
    ///
    /// Panics if the innermost construct is not a while-loop.
    pub fn end_while(&mut self) {
        let frame = self.top(&[Branch::Body]);
        if self.program.list(ListLoc::Body(frame.stmt)).is_empty() {
            self.emit_nop();
        }
        self.stack.pop();
        self.close(ListLoc::Entry(frame.stmt));
    }

    fn close(&mut self, merges: ListLoc) {
        self.restore_slots(merges, true);
        let phis: Vec<ValueId> = self
            .program
            .list(merges)
            .iter()
            .filter_map(|&stmt| self.program.stmt(stmt).lhs())
            .collect();
        for lhs in phis {
            self.commit_assign(lhs);
        }
    }

    /// Rebinds every merged slot to the value it had before the construct opened.
    fn restore_slots(&mut self, merges: ListLoc, forget: bool) {
        let phis = self.program.list(merges).to_vec();
        for phi in phis {
            let StmtKind::Phi { lhs, old_value, .. } = &mut self.program.stmt_mut(phi).kind else {
                continue;
            };
            let lhs = *lhs;
            let before = old_value.unwrap_or_else(|| panic!("{phi} has no pre-construct value"));
            if forget {
                *old_value = None;
            }
            let compvar = self.program.value(lhs).compvar();
            self.program.set_current(compvar, before);
        }
    }
}
