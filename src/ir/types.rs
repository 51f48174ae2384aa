//! Value types and numeric promotion.

use std::fmt;

/// The type of an SSA value.
///
/// `Int`, `Float` and `Complex` are ordered and promote into each other; the
/// composite types never promote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ValueType {
    /// 32-bit integer, also used for booleans.
    #[default]
    Int,
    /// Single precision float.
    Float,
    /// Single precision complex number.
    Complex,
    /// RGBA color.
    Color,
    /// Heap allocated matrix.
    Matrix,
    /// Heap allocated vector.
    Vector,
}

impl ValueType {
    /// Returns `true` for the types taking part in numeric promotion.
    #[must_use]
    pub const fn is_promotable(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float | ValueType::Complex)
    }

    /// The promoted type of two operands.
    ///
    /// # Panics
    ///
    /// Panics if the types differ and one of them is composite; the front end
    /// guarantees such values are never combined.
    #[must_use]
    pub fn max(self, other: ValueType) -> ValueType {
        if self == other {
            return self;
        }
        assert!(
            self.is_promotable() && other.is_promotable(),
            "cannot promote between {self} and {other}"
        );
        std::cmp::max(self, other)
    }

    /// The C type used to declare a value of this type.
    #[must_use]
    pub const fn c_type(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Complex => "complex float",
            ValueType::Color => "color_t",
            ValueType::Matrix => "gsl_matrix *",
            ValueType::Vector => "gsl_vector *",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Complex => "complex",
            ValueType::Color => "color",
            ValueType::Matrix => "matrix",
            ValueType::Vector => "vector",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMITIVES: [ValueType; 3] = [ValueType::Int, ValueType::Float, ValueType::Complex];

    #[test]
    fn test_max_is_commutative() {
        for a in PRIMITIVES {
            for b in PRIMITIVES {
                assert_eq!(a.max(b), b.max(a), "{a} vs {b}");
            }
        }
        assert_eq!(ValueType::Int.max(ValueType::Complex), ValueType::Complex);
        assert_eq!(ValueType::Float.max(ValueType::Int), ValueType::Float);
    }

    #[test]
    fn test_composites_only_agree_with_themselves() {
        assert_eq!(ValueType::Color.max(ValueType::Color), ValueType::Color);
        let diverged = std::panic::catch_unwind(|| ValueType::Color.max(ValueType::Float));
        assert!(diverged.is_err());
    }
}
