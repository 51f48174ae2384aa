//! The two-axis invariance lattice.
//!
//! A filter is evaluated over a two-dimensional grid. Each flag names an axis
//! along which a value stays constant: a value tagged [`Invariance::X`] is the
//! same for every `x` of a row, one tagged [`Invariance::Y`] the same for every
//! `y` of a column. The bottom element (no flag) varies per element, the top
//! (both flags) is constant for the whole invocation.
//!
//! ```text
//!          X | Y            computed once per invocation
//!         /     \
//!        X       Y          once per row / once per column
//!         \     /
//!         (none)            once per element
//! ```
//!
//! Meet is bitwise AND; analyses only ever clear flags.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Axes along which a value does not vary.
    pub struct Invariance: u8 {
        /// Constant while `x` changes.
        const X = 0x01;
        /// Constant while `y` changes.
        const Y = 0x02;
    }
}

impl Invariance {
    /// Varies along both axes.
    pub const NONE: Invariance = Invariance::empty();
    /// Constant along both axes.
    pub const XY: Invariance = Invariance::X.union(Invariance::Y);

    /// Returns `true` if `self` lies between `lower` and `upper` in the lattice.
    ///
    /// # Panics
    ///
    /// Panics if `lower` is not below `upper`.
    #[must_use]
    pub fn is_within(self, lower: Invariance, upper: Invariance) -> bool {
        assert!(upper.contains(lower), "{lower} is not below {upper}");
        self.contains(lower) && upper.contains(self)
    }
}

impl fmt::Display for Invariance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        if self.contains(Invariance::X) {
            f.write_str("x")?;
        }
        if self.contains(Invariance::Y) {
            f.write_str("y")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meet_clears_flags() {
        assert_eq!(Invariance::XY & Invariance::X, Invariance::X);
        assert_eq!(Invariance::X & Invariance::Y, Invariance::NONE);
        assert_eq!(Invariance::XY.to_string(), "xy");
        assert_eq!(Invariance::NONE.to_string(), "-");
    }

    #[test]
    fn test_is_within() {
        assert!(Invariance::X.is_within(Invariance::NONE, Invariance::XY));
        assert!(Invariance::X.is_within(Invariance::X, Invariance::X));
        assert!(!Invariance::NONE.is_within(Invariance::X, Invariance::XY));
        assert!(!Invariance::Y.is_within(Invariance::NONE, Invariance::X));
    }
}
