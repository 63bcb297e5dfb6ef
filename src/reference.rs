use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// A signed handle to a node in the manager.
///
/// The sign encodes a complement edge: `-f` represents the negation of `f`
/// without allocating any nodes. Index 0 is never a valid node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Ref(i32);

impl Ref {
    pub const fn new(index: i32) -> Self {
        Self(index)
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// The handle with the complement bit cleared.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }

    /// Re-apply the sign of `self` to `other`.
    ///
    /// Used when an operation has been computed on `self.regular()` and the
    /// result must be complemented back (negation is a homomorphism for
    /// structure-preserving traversals).
    pub const fn apply_sign(self, other: Ref) -> Ref {
        if self.is_negated() {
            other.negate()
        } else {
            other
        }
    }

    /// Raw signed representation.
    pub const fn inner(self) -> i32 {
        self.0
    }

    /// Node index (sign stripped).
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let f = Ref::new(42);
        assert!(!f.is_negated());
        assert!((-f).is_negated());
        assert_eq!(-(-f), f);
        assert_eq!((-f).index(), 42);
        assert_eq!((-f).regular(), f);
    }

    #[test]
    fn test_apply_sign() {
        let f = Ref::new(3);
        let g = Ref::new(7);
        assert_eq!(f.apply_sign(g), g);
        assert_eq!((-f).apply_sign(g), -g);
    }
}
