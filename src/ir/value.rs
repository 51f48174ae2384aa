//! Compile-time variables and their SSA values.
//!
//! A [`CompVar`] is a slot the front end assigns to: one component of a user
//! variable, or a temporary. Every assignment to a slot creates a new
//! [`Value`]; the slot remembers all of them and which one is current while
//! the program is being built.

use std::fmt;

use crate::{
    ir::{invariance::Invariance, stmt::StmtId, types::ValueType},
    utils::arena::arena_id,
};

arena_id!(
    /// Dense global id of an SSA value, never reused within a compilation.
    ValueId,
    "v"
);

arena_id!(
    /// Id of a compile-time variable slot.
    CompVarId,
    "c"
);

/// What a [`CompVar`] stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompVarKind {
    /// Component `component` of the user variable `name`.
    Variable {
        /// Source level variable name
        name: String,
        /// Tuple component
        component: usize,
    },
    /// Compiler generated temporary.
    Temporary {
        /// Unique temporary number
        number: u32,
    },
}

/// A compile-time variable slot.
#[derive(Debug, Clone)]
pub struct CompVar {
    pub(crate) kind: CompVarKind,
    pub(crate) last_version: u32,
    pub(crate) current: ValueId,
    pub(crate) values: Vec<ValueId>,
}

impl CompVar {
    /// What this slot stands for.
    #[must_use]
    pub fn kind(&self) -> &CompVarKind {
        &self.kind
    }

    /// Returns `true` for compiler generated temporaries.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        matches!(self.kind, CompVarKind::Temporary { .. })
    }

    /// The value live at the builder's insertion point.
    #[must_use]
    pub const fn current(&self) -> ValueId {
        self.current
    }

    /// Every value ever bound to this slot, oldest first.
    #[must_use]
    pub fn values(&self) -> &[ValueId] {
        &self.values
    }
}

impl fmt::Display for CompVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CompVarKind::Variable { name, component } => write!(f, "{name}[{component}]"),
            CompVarKind::Temporary { number } => write!(f, "$t{number}"),
        }
    }
}

/// One SSA definition.
#[derive(Debug, Clone)]
pub struct Value {
    pub(crate) compvar: CompVarId,
    pub(crate) version: Option<u32>,
    pub(crate) def: Option<StmtId>,
    pub(crate) uses: Vec<StmtId>,
    pub(crate) ty: ValueType,
    pub(crate) invariance: Invariance,
    pub(crate) least_direct_use: Invariance,
    pub(crate) least_multiple_use: Invariance,
    pub(crate) declared: bool,
}

impl Value {
    pub(crate) fn new(compvar: CompVarId) -> Self {
        Value {
            compvar,
            version: None,
            def: None,
            uses: Vec::new(),
            ty: ValueType::Int,
            invariance: Invariance::NONE,
            least_direct_use: Invariance::XY,
            least_multiple_use: Invariance::XY,
            declared: false,
        }
    }

    /// The slot this value belongs to.
    #[must_use]
    pub const fn compvar(&self) -> CompVarId {
        self.compvar
    }

    /// Version within the slot, `None` until the value is committed.
    #[must_use]
    pub const fn version(&self) -> Option<u32> {
        self.version
    }

    /// The defining statement, `None` for a slot's initial value.
    #[must_use]
    pub const fn def(&self) -> Option<StmtId> {
        self.def
    }

    /// Statements referencing this value, one entry per reference.
    #[must_use]
    pub fn uses(&self) -> &[StmtId] {
        &self.uses
    }

    /// Inferred type.
    #[must_use]
    pub const fn ty(&self) -> ValueType {
        self.ty
    }

    /// Axes along which the value is constant.
    #[must_use]
    pub const fn invariance(&self) -> Invariance {
        self.invariance
    }

    /// Least invariance among the statements using this value directly.
    #[must_use]
    pub const fn least_direct_use(&self) -> Invariance {
        self.least_direct_use
    }

    /// Least invariance among uses that repeat inside a loop.
    #[must_use]
    pub const fn least_multiple_use(&self) -> Invariance {
        self.least_multiple_use
    }

    /// The invariance the value can be computed at, taking repeated uses into account.
    #[must_use]
    pub fn effective_invariance(&self) -> Invariance {
        self.invariance & self.least_multiple_use
    }

    /// Returns `true` if the value is computed once at its own invariance and stored.
    ///
    /// That is the case when no repeated use forces it down, while some
    /// direct use lives in a more variant region.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.least_multiple_use == self.invariance && self.least_direct_use != self.invariance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_requires_more_variant_direct_use() {
        let mut value = Value::new(CompVarId::new(0));
        value.invariance = Invariance::X;
        value.least_multiple_use = Invariance::X;
        value.least_direct_use = Invariance::X;
        assert!(!value.is_permanent());

        value.least_direct_use = Invariance::NONE;
        assert!(value.is_permanent());

        value.least_multiple_use = Invariance::NONE;
        assert!(!value.is_permanent());
        assert_eq!(value.effective_invariance(), Invariance::NONE);
    }
}
