//! Statements of the structured SSA tree.
//!
//! Control flow is never flattened into basic blocks. An if-conditional owns
//! its two branches and the list of phis merging them; a while-loop owns the
//! phis at its head and its body. Every statement points back at the
//! construct it is nested in.
//!
//! ```text
//! If { condition, consequent: [..], alternative: [..], exit: [phi, ..] }
//! While { entry: [phi, ..], invariant, body: [..] }
//! ```

use bitflags::bitflags;

use crate::{
    ir::{
        invariance::Invariance,
        rhs::{Primary, Rhs},
        value::ValueId,
    },
    utils::arena::arena_id,
};

arena_id!(
    /// Id of a statement.
    StmtId,
    "s"
);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Code regions a statement has been sliced into.
    pub struct SliceFlags: u8 {
        /// Computed once per invocation.
        const XY = 0x01;
        /// Computed once per row.
        const X = 0x02;
        /// Computed once per column.
        const Y = 0x04;
        /// Computed for every element.
        const VARYING = 0x08;
    }
}

impl SliceFlags {
    /// The region flag for code of the given invariance.
    #[must_use]
    pub fn for_invariance(invariance: Invariance) -> SliceFlags {
        if invariance == Invariance::XY {
            SliceFlags::XY
        } else if invariance == Invariance::X {
            SliceFlags::X
        } else if invariance == Invariance::Y {
            SliceFlags::Y
        } else {
            SliceFlags::VARYING
        }
    }
}

/// The shape of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Does nothing. Removed statements become no-ops.
    Nop,
    /// `lhs = rhs`.
    Assign {
        /// Defined value
        lhs: ValueId,
        /// Right-hand side
        rhs: Rhs,
    },
    /// `lhs = phi(rhs[0], rhs[1])`.
    ///
    /// In an if exit, slot 0 flows in from the consequent and slot 1 from the
    /// alternative. In a loop entry, slot 0 flows in from before the loop and
    /// slot 1 from the end of the body.
    Phi {
        /// Defined value
        lhs: ValueId,
        /// Incoming operands, one per edge
        rhs: [Rhs; 2],
        /// The slot's value before the construct opened, kept until the construct closes
        old_value: Option<ValueId>,
    },
    /// `if (condition) consequent else alternative`, merged by `exit`.
    If {
        /// Branch condition
        condition: Rhs,
        /// Taken when the condition holds
        consequent: Vec<StmtId>,
        /// Taken otherwise
        alternative: Vec<StmtId>,
        /// Phis merging the branches
        exit: Vec<StmtId>,
    },
    /// `while (invariant) body`, with loop-carried values merged by `entry`.
    While {
        /// Phis at the loop head
        entry: Vec<StmtId>,
        /// Loop condition
        invariant: Rhs,
        /// Loop body
        body: Vec<StmtId>,
    },
}

impl StmtKind {
    /// Every value referenced by this statement itself, once per reference.
    ///
    /// Nested statement lists are not included.
    #[must_use]
    pub fn referenced_values(&self) -> Vec<ValueId> {
        match self {
            StmtKind::Nop => Vec::new(),
            StmtKind::Assign { rhs, .. } => rhs.values().collect(),
            StmtKind::Phi { rhs, .. } => rhs.iter().flat_map(Rhs::values).collect(),
            StmtKind::If { condition, .. } => condition.values().collect(),
            StmtKind::While { invariant, .. } => invariant.values().collect(),
        }
    }

    /// Replaces the first reference to `old`. Returns `false` if there is none.
    pub(crate) fn replace_value(&mut self, old: ValueId, new: Primary) -> bool {
        match self {
            StmtKind::Nop => false,
            StmtKind::Assign { rhs, .. } => rhs.replace_value(old, new),
            StmtKind::Phi { rhs, .. } => {
                rhs[0].replace_value(old, new) || rhs[1].replace_value(old, new)
            }
            StmtKind::If { condition, .. } => condition.replace_value(old, new),
            StmtKind::While { invariant, .. } => invariant.replace_value(old, new),
        }
    }
}

/// A statement and its position in the tree.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(crate) kind: StmtKind,
    pub(crate) parent: Option<StmtId>,
    pub(crate) slices: SliceFlags,
}

impl Statement {
    /// The shape of this statement.
    #[must_use]
    pub fn kind(&self) -> &StmtKind {
        &self.kind
    }

    /// The if or while this statement is nested in, `None` at top level.
    #[must_use]
    pub const fn parent(&self) -> Option<StmtId> {
        self.parent
    }

    /// Regions this statement has been sliced into.
    #[must_use]
    pub const fn slices(&self) -> SliceFlags {
        self.slices
    }

    /// The value defined by an assignment or phi.
    #[must_use]
    pub fn lhs(&self) -> Option<ValueId> {
        match self.kind {
            StmtKind::Assign { lhs, .. } | StmtKind::Phi { lhs, .. } => Some(lhs),
            _ => None,
        }
    }

    /// Returns `true` for phi assignments.
    #[must_use]
    pub fn is_phi(&self) -> bool {
        matches!(self.kind, StmtKind::Phi { .. })
    }

    /// Returns `true` for removed statements.
    #[must_use]
    pub fn is_nop(&self) -> bool {
        matches!(self.kind, StmtKind::Nop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ops::Operator;

    #[test]
    fn test_phi_replaces_slot_zero_first() {
        let old = ValueId::new(0);
        let mut kind = StmtKind::Phi {
            lhs: ValueId::new(2),
            rhs: [Rhs::value(old), Rhs::value(old)],
            old_value: Some(old),
        };
        assert_eq!(kind.referenced_values(), vec![old, old]);
        assert!(kind.replace_value(old, Primary::Value(ValueId::new(1))));
        match kind {
            StmtKind::Phi { rhs, .. } => {
                assert_eq!(rhs[0], Rhs::value(ValueId::new(1)));
                assert_eq!(rhs[1], Rhs::value(old));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_constructs_reference_only_their_condition() {
        let cond = ValueId::new(4);
        let kind = StmtKind::If {
            condition: Rhs::op(Operator::Not, vec![cond.into()]),
            consequent: vec![StmtId::new(1)],
            alternative: vec![],
            exit: vec![],
        };
        assert_eq!(kind.referenced_values(), vec![cond]);
    }

    #[test]
    fn test_region_flags() {
        assert_eq!(SliceFlags::for_invariance(Invariance::XY), SliceFlags::XY);
        assert_eq!(SliceFlags::for_invariance(Invariance::Y), SliceFlags::Y);
        assert_eq!(SliceFlags::for_invariance(Invariance::NONE), SliceFlags::VARYING);
    }
}
