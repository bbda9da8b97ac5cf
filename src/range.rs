//! Closed length intervals used for operator widths and subtree reach.
//!
//! All lengths are counted in characters.

use std::fmt;

/// A closed interval `[min, max]` of character counts.
///
/// An interval with `min > max` is empty. [`LengthRange::EMPTY`] is the
/// canonical empty interval and is the identity for [`LengthRange::hull`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

impl LengthRange {
    /// Contains nothing. `min` is a sentinel larger than any real length.
    pub const EMPTY: LengthRange = LengthRange {
        min: usize::MAX,
        max: 0,
    };

    /// Only the empty match.
    pub const ZERO: LengthRange = LengthRange { min: 0, max: 0 };

    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// A single length.
    pub const fn exactly(len: usize) -> Self {
        Self { min: len, max: len }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, len: usize) -> bool {
        self.min <= len && len <= self.max
    }

    /// Intersection of two intervals.
    pub fn intersect(self, other: LengthRange) -> LengthRange {
        LengthRange {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Smallest interval covering both.
    pub fn hull(self, other: LengthRange) -> LengthRange {
        LengthRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Lengths reachable by consuming one length from `self` and then one
    /// from `other`. Saturates so that the [`EMPTY`](Self::EMPTY) sentinel
    /// stays empty.
    pub fn then(self, other: LengthRange) -> LengthRange {
        LengthRange {
            min: self.min.saturating_add(other.min),
            max: self.max.saturating_add(other.max),
        }
    }

    /// Lower `max` to at most `cap`.
    pub fn cap(self, cap: usize) -> LengthRange {
        LengthRange {
            min: self.min,
            max: self.max.min(cap),
        }
    }

    /// Lengths `n` such that `n + m` could equal `remaining` for some `m` in
    /// `rest`. Negative differences clamp to zero.
    pub fn leaving(remaining: usize, rest: LengthRange) -> LengthRange {
        LengthRange {
            min: remaining.saturating_sub(rest.max),
            max: remaining.saturating_sub(rest.min),
        }
    }
}

impl fmt::Display for LengthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_contains_nothing() {
        assert!(LengthRange::EMPTY.is_empty());
        assert!(!LengthRange::EMPTY.contains(0));
        assert!(!LengthRange::EMPTY.contains(usize::MAX));
    }

    #[test]
    fn hull_with_empty_is_identity() {
        let r = LengthRange::new(2, 5);
        assert_eq!(LengthRange::EMPTY.hull(r), r);
        assert_eq!(r.hull(LengthRange::EMPTY), r);
    }

    #[test]
    fn then_saturates_sentinel() {
        let r = LengthRange::new(1, 3).then(LengthRange::EMPTY);
        assert_eq!(r.min, usize::MAX);
        assert!(r.is_empty());
    }

    #[test]
    fn then_adds_bounds() {
        assert_eq!(
            LengthRange::new(1, 3).then(LengthRange::new(2, 2)),
            LengthRange::new(3, 5)
        );
    }

    #[test]
    fn intersect_may_be_empty() {
        let r = LengthRange::new(0, 2).intersect(LengthRange::new(3, 4));
        assert!(r.is_empty());
        assert_eq!(
            LengthRange::new(0, 5).intersect(LengthRange::new(3, 9)),
            LengthRange::new(3, 5)
        );
    }

    #[test]
    fn leaving_clamps_negative_to_zero() {
        // 3 chars left, the rest needs 1..=5 of them
        assert_eq!(
            LengthRange::leaving(3, LengthRange::new(1, 5)),
            LengthRange::new(0, 2)
        );
        assert_eq!(
            LengthRange::leaving(3, LengthRange::ZERO),
            LengthRange::exactly(3)
        );
    }

    #[test]
    fn cap_lowers_max_only() {
        assert_eq!(LengthRange::new(2, 100).cap(64), LengthRange::new(2, 64));
        assert_eq!(LengthRange::new(2, 10).cap(64), LengthRange::new(2, 10));
    }
}
