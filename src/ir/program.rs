//! The IR of one compilation and its mutation primitives.
//!
//! [`Program`] owns every slot, value and statement of a compilation in
//! arenas. Everything else in the crate edits the IR through the primitives
//! here, which keep one invariant above all others: a value's use list holds
//! exactly one entry per reference to it from a live statement.

use crate::{
    ir::{
        rhs::{InternalTable, Primary, Rhs},
        stmt::{SliceFlags, Statement, StmtId, StmtKind},
        value::{CompVar, CompVarId, CompVarKind, Value, ValueId},
    },
    utils::{Arena, BitSet},
};

/// A statement list inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLoc {
    /// The top-level list.
    Root,
    /// Consequent of an if.
    Consequent(StmtId),
    /// Alternative of an if.
    Alternative(StmtId),
    /// Exit phis of an if.
    Exit(StmtId),
    /// Entry phis of a while.
    Entry(StmtId),
    /// Body of a while.
    Body(StmtId),
}

impl ListLoc {
    /// The statement owning the list, `None` for the top level.
    #[must_use]
    pub const fn owner(self) -> Option<StmtId> {
        match self {
            ListLoc::Root => None,
            ListLoc::Consequent(s)
            | ListLoc::Alternative(s)
            | ListLoc::Exit(s)
            | ListLoc::Entry(s)
            | ListLoc::Body(s) => Some(s),
        }
    }
}

/// A set of values, sized to the values existing when it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSet {
    bits: BitSet,
}

impl ValueSet {
    /// Adds `value` to the set.
    ///
    /// # Panics
    ///
    /// Panics if `value` was created after the set.
    pub fn add(&mut self, value: ValueId) {
        assert!(
            value.index() < self.bits.capacity(),
            "{value} was created after the value set"
        );
        self.bits.insert(value.index());
    }

    /// Returns `true` if `value` is in the set.
    #[must_use]
    pub fn contains(&self, value: ValueId) -> bool {
        value.index() < self.bits.capacity() && self.bits.contains(value.index())
    }
}

/// The IR of one compilation.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) compvars: Arena<CompVarId, CompVar>,
    pub(crate) values: Arena<ValueId, Value>,
    pub(crate) stmts: Arena<StmtId, Statement>,
    pub(crate) internals: InternalTable,
    pub(crate) body: Vec<StmtId>,
    next_temporary: u32,
}

impl Program {
    /// Creates an empty program reading from `internals`.
    #[must_use]
    pub fn new(internals: InternalTable) -> Self {
        Program {
            compvars: Arena::new(),
            values: Arena::new(),
            stmts: Arena::new(),
            internals,
            body: Vec::new(),
            next_temporary: 1,
        }
    }

    /// The top-level statement list.
    #[must_use]
    pub fn body(&self) -> &[StmtId] {
        &self.body
    }

    /// The internals this program reads from.
    #[must_use]
    pub fn internals(&self) -> &InternalTable {
        &self.internals
    }

    /// Returns a statement.
    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Statement {
        &self.stmts[id]
    }

    /// Returns a value.
    #[must_use]
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id]
    }

    /// Returns a slot.
    #[must_use]
    pub fn compvar(&self, id: CompVarId) -> &CompVar {
        &self.compvars[id]
    }

    /// The slot owning `value`.
    #[must_use]
    pub fn compvar_of(&self, value: ValueId) -> &CompVar {
        &self.compvars[self.values[value].compvar]
    }

    /// Number of values created so far.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Number of statements created so far, removed ones included.
    #[must_use]
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    /// Iterates over every value with its id.
    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> + '_ {
        self.values.iter()
    }

    /// Allocates a temporary slot with one uncommitted initial value.
    pub fn make_temporary(&mut self) -> CompVarId {
        let number = self.next_temporary;
        self.next_temporary += 1;
        self.alloc_compvar(CompVarKind::Temporary { number })
    }

    /// Allocates the slot for component `component` of user variable `name`.
    pub fn make_variable(&mut self, name: &str, component: usize) -> CompVarId {
        self.alloc_compvar(CompVarKind::Variable {
            name: name.to_string(),
            component,
        })
    }

    fn alloc_compvar(&mut self, kind: CompVarKind) -> CompVarId {
        let id = self.compvars.next_id();
        let initial = self.values.alloc(Value::new(id));
        self.compvars.alloc(CompVar {
            kind,
            last_version: 0,
            current: initial,
            values: vec![initial],
        })
    }

    /// Allocates a fresh, uncommitted value for `compvar`. The slot's current value is untouched.
    pub fn make_lhs(&mut self, compvar: CompVarId) -> ValueId {
        let value = self.values.alloc(Value::new(compvar));
        self.compvars[compvar].values.push(value);
        value
    }

    /// Stamps `value` with the next version of its slot and makes it current.
    pub fn assign_index_and_make_current(&mut self, value: ValueId) {
        let compvar = &mut self.compvars[self.values[value].compvar];
        compvar.last_version += 1;
        compvar.current = value;
        self.values[value].version = Some(compvar.last_version);
    }

    /// The value currently bound to `compvar`.
    #[must_use]
    pub fn current(&self, compvar: CompVarId) -> ValueId {
        self.compvars[compvar].current
    }

    pub(crate) fn set_current(&mut self, compvar: CompVarId, value: ValueId) {
        self.compvars[compvar].current = value;
    }

    /// Records one reference to `value` from `stmt`.
    pub fn add_use(&mut self, value: ValueId, stmt: StmtId) {
        self.values[value].uses.push(stmt);
    }

    /// Drops one reference to `value` from `stmt`.
    ///
    /// # Panics
    ///
    /// Panics if `stmt` is not in the use list of `value`.
    pub fn remove_use(&mut self, value: ValueId, stmt: StmtId) {
        let uses = &mut self.values[value].uses;
        let pos = uses
            .iter()
            .position(|&s| s == stmt)
            .unwrap_or_else(|| panic!("{stmt} is not a use of {value}"));
        uses.swap_remove(pos);
    }

    /// Allocates a statement, records the uses it makes and binds its lhs to it.
    ///
    /// The statement is not linked into any list.
    pub(crate) fn alloc_stmt(&mut self, kind: StmtKind, parent: Option<StmtId>) -> StmtId {
        let referenced = kind.referenced_values();
        let stmt = self.stmts.alloc(Statement {
            kind,
            parent,
            slices: SliceFlags::empty(),
        });
        for value in referenced {
            self.add_use(value, stmt);
        }
        if let Some(lhs) = self.stmts[stmt].lhs() {
            let def = &mut self.values[lhs].def;
            assert!(def.is_none(), "{lhs} is already defined");
            *def = Some(stmt);
        }
        stmt
    }

    /// Replaces the right-hand side of an assignment, keeping use lists in sync.
    pub fn replace_rhs(&mut self, stmt: StmtId, rhs: Rhs) {
        let old: Vec<ValueId> = match &self.stmts[stmt].kind {
            StmtKind::Assign { rhs, .. } => rhs.values().collect(),
            other => panic!("{stmt} is not an assignment: {other:?}"),
        };
        for value in old {
            self.remove_use(value, stmt);
        }
        for value in rhs.values() {
            self.add_use(value, stmt);
        }
        if let StmtKind::Assign { rhs: slot, .. } = &mut self.stmts[stmt].kind {
            *slot = rhs;
        }
    }

    /// Replaces one incoming slot of a phi, keeping use lists in sync.
    pub fn replace_phi_slot(&mut self, stmt: StmtId, slot: usize, rhs: Rhs) {
        let old: Vec<ValueId> = match &self.stmts[stmt].kind {
            StmtKind::Phi { rhs, .. } => rhs[slot].values().collect(),
            other => panic!("{stmt} is not a phi: {other:?}"),
        };
        for value in old {
            self.remove_use(value, stmt);
        }
        for value in rhs.values() {
            self.add_use(value, stmt);
        }
        if let StmtKind::Phi { rhs: slots, .. } = &mut self.stmts[stmt].kind {
            slots[slot] = rhs;
        }
    }

    /// Turns `stmt` into a no-op and drops the uses it made.
    ///
    /// Returns the values whose use lists shrank, once per dropped reference.
    pub fn remove_stmt(&mut self, stmt: StmtId) -> Vec<ValueId> {
        let kind = std::mem::replace(&mut self.stmts[stmt].kind, StmtKind::Nop);
        assert!(
            matches!(kind, StmtKind::Assign { .. } | StmtKind::Phi { .. }),
            "only assignments can be removed, {stmt} is {kind:?}"
        );
        let released = kind.referenced_values();
        for &value in &released {
            self.remove_use(value, stmt);
        }
        released
    }

    /// Returns `true` if `stmt` is nested somewhere inside `limit`.
    ///
    /// Every statement is within `None`.
    #[must_use]
    pub fn is_within(&self, stmt: StmtId, limit: Option<StmtId>) -> bool {
        let Some(limit) = limit else {
            return true;
        };
        let mut cursor = self.stmts[stmt].parent;
        while let Some(parent) = cursor {
            if parent == limit {
                return true;
            }
            cursor = self.stmts[parent].parent;
        }
        false
    }

    /// Redirects the uses of `old` inside `limit` to `new`.
    ///
    /// Phis whose parent is `limit` itself keep referencing `old`: they are
    /// the loop entry merges that carry `old` into the construct. Returns the
    /// number of rewritten references.
    pub fn rewrite_uses(&mut self, old: ValueId, new: Primary, limit: Option<StmtId>) -> usize {
        assert_ne!(new, Primary::Value(old), "cannot rewrite {old} to itself");
        let uses = std::mem::take(&mut self.values[old].uses);
        let mut kept = Vec::with_capacity(uses.len());
        let mut rewritten = 0;
        for stmt in uses {
            let statement = &self.stmts[stmt];
            let merges_into_limit = limit.is_some() && statement.is_phi() && statement.parent == limit;
            if merges_into_limit || !self.is_within(stmt, limit) {
                kept.push(stmt);
                continue;
            }
            let replaced = self.stmts[stmt].kind.replace_value(old, new);
            assert!(replaced, "{stmt} is listed as a use of {old} but does not reference it");
            if let Primary::Value(value) = new {
                self.add_use(value, stmt);
            }
            rewritten += 1;
        }
        self.values[old].uses = kept;
        rewritten
    }

    /// Returns a statement list.
    ///
    /// # Panics
    ///
    /// Panics if `loc` names a list the statement does not have.
    #[must_use]
    pub fn list(&self, loc: ListLoc) -> &[StmtId] {
        let Some(owner) = loc.owner() else {
            return &self.body;
        };
        match &self.stmts[owner].kind {
            StmtKind::If {
                consequent,
                alternative,
                exit,
                ..
            } => match loc {
                ListLoc::Consequent(_) => consequent,
                ListLoc::Alternative(_) => alternative,
                ListLoc::Exit(_) => exit,
                _ => panic!("{loc:?} does not name a list of an if"),
            },
            StmtKind::While { entry, body, .. } => match loc {
                ListLoc::Entry(_) => entry,
                ListLoc::Body(_) => body,
                _ => panic!("{loc:?} does not name a list of a while"),
            },
            kind => panic!("{loc:?} does not name a list of {kind:?}"),
        }
    }

    pub(crate) fn list_mut(&mut self, loc: ListLoc) -> &mut Vec<StmtId> {
        let Some(owner) = loc.owner() else {
            return &mut self.body;
        };
        match &mut self.stmts[owner].kind {
            StmtKind::If {
                consequent,
                alternative,
                exit,
                ..
            } => match loc {
                ListLoc::Consequent(_) => consequent,
                ListLoc::Alternative(_) => alternative,
                ListLoc::Exit(_) => exit,
                _ => panic!("{loc:?} does not name a list of an if"),
            },
            StmtKind::While { entry, body, .. } => match loc {
                ListLoc::Entry(_) => entry,
                ListLoc::Body(_) => body,
                _ => panic!("{loc:?} does not name a list of a while"),
            },
            kind => panic!("{loc:?} does not name a list of {kind:?}"),
        }
    }

    /// The nested lists of a statement, in evaluation order.
    #[must_use]
    pub fn child_lists(&self, stmt: StmtId) -> Vec<ListLoc> {
        match self.stmts[stmt].kind {
            StmtKind::If { .. } => vec![
                ListLoc::Consequent(stmt),
                ListLoc::Alternative(stmt),
                ListLoc::Exit(stmt),
            ],
            StmtKind::While { .. } => vec![ListLoc::Entry(stmt), ListLoc::Body(stmt)],
            _ => Vec::new(),
        }
    }

    /// Every statement reachable from the top-level list, parents before children.
    #[must_use]
    pub fn preorder(&self) -> Vec<StmtId> {
        let mut order = Vec::with_capacity(self.stmts.len());
        let mut stack: Vec<StmtId> = self.body.iter().rev().copied().collect();
        while let Some(stmt) = stack.pop() {
            order.push(stmt);
            for loc in self.child_lists(stmt).into_iter().rev() {
                stack.extend(self.list(loc).iter().rev());
            }
        }
        order
    }

    /// Every assignment and phi, in [`preorder`](Self::preorder).
    #[must_use]
    pub fn assign_statements(&self) -> Vec<StmtId> {
        self.preorder()
            .into_iter()
            .filter(|&s| self.stmts[s].lhs().is_some())
            .collect()
    }

    /// An empty set sized to the values existing now.
    #[must_use]
    pub fn new_value_set(&self) -> ValueSet {
        ValueSet {
            bits: BitSet::new(self.values.len()),
        }
    }

    pub(crate) fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id]
    }

    pub(crate) fn stmt_mut(&mut self, id: StmtId) -> &mut Statement {
        &mut self.stmts[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ops::Operator, rhs::InternalTable};

    fn assign(program: &mut Program, compvar: CompVarId, rhs: Rhs) -> (StmtId, ValueId) {
        let lhs = program.make_lhs(compvar);
        let stmt = program.alloc_stmt(StmtKind::Assign { lhs, rhs }, None);
        program.body.push(stmt);
        program.assign_index_and_make_current(lhs);
        (stmt, lhs)
    }

    #[test]
    fn test_slots_start_with_uncommitted_value() {
        let mut program = Program::new(InternalTable::new());
        let t = program.make_temporary();
        let initial = program.current(t);
        assert_eq!(program.value(initial).version(), None);
        assert_eq!(program.value(initial).def(), None);

        let fresh = program.make_lhs(t);
        assert_eq!(program.current(t), initial);
        program.assign_index_and_make_current(fresh);
        assert_eq!(program.current(t), fresh);
        assert_eq!(program.value(fresh).version(), Some(1));
        assert_eq!(program.compvar(t).values(), &[initial, fresh]);
    }

    #[test]
    fn test_alloc_registers_every_reference() {
        let mut program = Program::new(InternalTable::new());
        let a = program.make_variable("a", 0);
        let b = program.make_variable("b", 0);
        let (_, a1) = assign(&mut program, a, Rhs::Primary(Primary::Int(1)));
        let (sum, b1) = assign(
            &mut program,
            b,
            Rhs::op(Operator::Add, vec![a1.into(), a1.into()]),
        );

        assert_eq!(program.value(a1).uses(), &[sum, sum]);
        assert_eq!(program.value(b1).def(), Some(sum));

        program.remove_use(a1, sum);
        assert_eq!(program.value(a1).uses(), &[sum]);
    }

    #[test]
    #[should_panic(expected = "is not a use of")]
    fn test_remove_unknown_use_panics() {
        let mut program = Program::new(InternalTable::new());
        let t = program.make_temporary();
        let (stmt, v) = assign(&mut program, t, Rhs::Primary(Primary::Int(0)));
        program.remove_use(v, stmt);
    }

    #[test]
    fn test_rewrite_uses_everywhere() {
        let mut program = Program::new(InternalTable::new());
        let a = program.make_variable("a", 0);
        let c = program.make_variable("c", 0);
        let (_, a1) = assign(&mut program, a, Rhs::Primary(Primary::Float(2.0)));
        let (use_stmt, _) = assign(
            &mut program,
            c,
            Rhs::op(Operator::Mul, vec![a1.into(), Primary::Int(3)]),
        );

        assert_eq!(program.rewrite_uses(a1, Primary::Float(2.0), None), 1);
        assert!(program.value(a1).uses().is_empty());
        assert_eq!(
            program.stmt(use_stmt).kind(),
            &StmtKind::Assign {
                lhs: program.current(c),
                rhs: Rhs::op(Operator::Mul, vec![Primary::Float(2.0), Primary::Int(3)]),
            }
        );
    }

    #[test]
    fn test_remove_stmt_releases_operands() {
        let mut program = Program::new(InternalTable::new());
        let a = program.make_variable("a", 0);
        let b = program.make_variable("b", 0);
        let (_, a1) = assign(&mut program, a, Rhs::Primary(Primary::Int(1)));
        let (neg, _) = assign(&mut program, b, Rhs::op(Operator::Neg, vec![a1.into()]));

        assert_eq!(program.remove_stmt(neg), vec![a1]);
        assert!(program.stmt(neg).is_nop());
        assert!(program.value(a1).uses().is_empty());
    }

    #[test]
    fn test_value_set_is_sized_at_creation() {
        let mut program = Program::new(InternalTable::new());
        let t = program.make_temporary();
        let mut set = program.new_value_set();
        set.add(program.current(t));
        let late = program.make_lhs(t);
        assert!(!set.contains(late));
        let grown = std::panic::catch_unwind(move || set.add(late));
        assert!(grown.is_err());
    }
}
