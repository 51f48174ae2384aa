//! Operands and right-hand sides.

use std::fmt;

use crate::{
    ir::{
        invariance::Invariance,
        ops::{Operator, MAX_OP_ARGS},
        types::ValueType,
        value::ValueId,
    },
    utils::{arena::arena_id, Arena},
};

/// An operand: a value reference or an inline literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primary {
    /// Reference to an SSA value.
    Value(ValueId),
    /// Integer literal.
    Int(i32),
    /// Float literal.
    Float(f32),
}

impl Primary {
    /// The referenced value, if this operand is not a literal.
    #[must_use]
    pub const fn value(self) -> Option<ValueId> {
        match self {
            Primary::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<ValueId> for Primary {
    fn from(value: ValueId) -> Self {
        Primary::Value(value)
    }
}

arena_id!(
    /// Id of an environment-provided quantity in an [`InternalTable`].
    InternalId,
    "i"
);

/// A quantity provided by the evaluation environment, such as the current coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Internal {
    /// Name the front end refers to it by, also its C identifier.
    pub name: String,
    /// Type of the quantity.
    pub ty: ValueType,
    /// Axes along which the quantity is constant.
    pub invariance: Invariance,
}

/// The set of internals a program may read.
#[derive(Debug, Clone, Default)]
pub struct InternalTable {
    internals: Arena<InternalId, Internal>,
}

impl InternalTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The internals of a two-dimensional filter.
    ///
    /// `x` and `y` are the cartesian coordinates, `r` and `a` the polar ones,
    /// `t` the time. `X`, `Y`, `W`, `H` and `R` describe the image extent and
    /// `frame` the animation frame; those never change within an invocation.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.add("x", Invariance::Y);
        table.add("y", Invariance::X);
        table.add("r", Invariance::NONE);
        table.add("a", Invariance::NONE);
        for name in ["t", "X", "Y", "W", "H", "R", "frame"] {
            table.add(name, Invariance::XY);
        }
        table
    }

    /// Registers a float internal and returns its id.
    pub fn add(&mut self, name: impl Into<String>, invariance: Invariance) -> InternalId {
        self.internals.alloc(Internal {
            name: name.into(),
            ty: ValueType::Float,
            invariance,
        })
    }

    /// Looks up an internal by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<InternalId> {
        self.internals
            .iter()
            .find(|(_, internal)| internal.name == name)
            .map(|(id, _)| id)
    }

    /// Returns the internal with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this table.
    #[must_use]
    pub fn get(&self, id: InternalId) -> &Internal {
        &self.internals[id]
    }

    /// Number of registered internals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.internals.len()
    }

    /// Returns `true` if no internal is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.internals.is_empty()
    }
}

/// The right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    /// A plain operand.
    Primary(Primary),
    /// An environment quantity.
    Internal(InternalId),
    /// An operator application.
    Op {
        /// The operator.
        op: Operator,
        /// Exactly `op.arity()` operands.
        args: Vec<Primary>,
    },
}

impl Rhs {
    /// Builds an operator application.
    ///
    /// # Panics
    ///
    /// Panics if the number of arguments does not match the operator's arity.
    #[must_use]
    pub fn op(op: Operator, args: Vec<Primary>) -> Self {
        assert!(args.len() <= MAX_OP_ARGS, "{op} takes too many arguments");
        assert_eq!(args.len(), op.arity(), "wrong argument count for {op}");
        Rhs::Op { op, args }
    }

    /// A reference to `value`.
    #[must_use]
    pub const fn value(value: ValueId) -> Self {
        Rhs::Primary(Primary::Value(value))
    }

    /// Every value referenced, once per reference.
    pub fn values(&self) -> impl Iterator<Item = ValueId> + '_ {
        let primaries: &[Primary] = match self {
            Rhs::Primary(p) => std::slice::from_ref(p),
            Rhs::Internal(_) => &[],
            Rhs::Op { args, .. } => args,
        };
        primaries.iter().filter_map(|p| p.value())
    }

    /// Returns `true` if evaluating this right-hand side has no side effects.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        match self {
            Rhs::Op { op, .. } => op.is_pure(),
            _ => true,
        }
    }

    /// Replaces the first reference to `old` with `new`. Returns `false` if there is none.
    pub(crate) fn replace_value(&mut self, old: ValueId, new: Primary) -> bool {
        let slot = match self {
            Rhs::Primary(p) => Some(p),
            Rhs::Internal(_) => None,
            Rhs::Op { args, .. } => args.iter_mut().find(|p| **p == Primary::Value(old)),
        };
        match slot {
            Some(p) if *p == Primary::Value(old) => {
                *p = new;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primary::Value(v) => write!(f, "{v}"),
            Primary::Int(i) => write!(f, "{i}"),
            Primary::Float(x) => write!(f, "{x:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_keep_multiplicity() {
        let v = ValueId::new(3);
        let rhs = Rhs::op(Operator::Add, vec![v.into(), v.into()]);
        assert_eq!(rhs.values().collect::<Vec<_>>(), vec![v, v]);
        assert_eq!(Rhs::Internal(InternalId::new(0)).values().count(), 0);
    }

    #[test]
    fn test_replace_first_reference_only() {
        let v = ValueId::new(1);
        let mut rhs = Rhs::op(Operator::Mul, vec![v.into(), v.into()]);
        assert!(rhs.replace_value(v, Primary::Int(2)));
        assert_eq!(rhs, Rhs::op(Operator::Mul, vec![Primary::Int(2), v.into()]));
        assert!(!Rhs::Primary(Primary::Float(1.0)).replace_value(v, Primary::Int(0)));
    }

    #[test]
    #[should_panic(expected = "wrong argument count")]
    fn test_op_checks_arity() {
        let _ = Rhs::op(Operator::Neg, vec![]);
    }

    #[test]
    fn test_standard_internals() {
        let table = InternalTable::standard();
        let x = table.lookup("x").unwrap();
        let y = table.lookup("y").unwrap();
        assert_eq!(table.get(x).invariance, Invariance::Y);
        assert_eq!(table.get(y).invariance, Invariance::X);
        assert_eq!(table.get(table.lookup("W").unwrap()).invariance, Invariance::XY);
        assert!(table.lookup("z").is_none());
        assert_eq!(table.len(), 11);
    }
}
