//! `AxisRange`: a one-dimensional, inclusive, unit-stride integer range.
//!
//! A range `[first, last]` is empty when `last < first`. Empty ranges only
//! appear transiently, as one side of a split of a length-1 range or of an
//! extreme ratio split; they keep their `first` so that the pair of split
//! results still describes a position on the axis.

use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct AxisRange {
    first: i64,
    last: i64,
}

impl AxisRange {
    /// Range covering `first..=last`.
    #[inline]
    pub const fn new(first: i64, last: i64) -> Self {
        Self { first, last }
    }

    /// Range `[0, n-1]`; empty when `n == 0`.
    #[inline]
    pub const fn with_length(n: usize) -> Self {
        Self {
            first: 0,
            last: n as i64 - 1,
        }
    }

    /// Empty range positioned at `first`.
    #[inline]
    pub const fn empty_at(first: i64) -> Self {
        Self {
            first,
            last: first - 1,
        }
    }

    #[inline]
    pub const fn first(&self) -> i64 {
        self.first
    }

    #[inline]
    pub const fn last(&self) -> i64 {
        self.last
    }

    /// Number of indices in the range.
    #[inline]
    pub const fn length(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            (self.last - self.first + 1) as usize
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.last < self.first
    }

    #[inline]
    pub const fn contains(&self, i: i64) -> bool {
        self.first <= i && i <= self.last
    }

    /// True if every index of `other` lies in `self`. An empty `other` is
    /// contained only if its position lies within `[first, last + 1]`.
    pub fn contains_range(&self, other: &AxisRange) -> bool {
        if other.is_empty() {
            return self.first <= other.first && other.first <= self.last + 1;
        }
        self.first <= other.first && other.last <= self.last
    }

    /// True if the two ranges share at least one index.
    #[inline]
    pub fn touches(&self, other: &AxisRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.first <= other.last
            && other.first <= self.last
    }

    /// Common sub-range (possibly empty).
    pub fn intersect(&self, other: &AxisRange) -> AxisRange {
        let first = self.first.max(other.first);
        let last = self.last.min(other.last);
        if last < first {
            AxisRange::empty_at(first)
        } else {
            AxisRange::new(first, last)
        }
    }

    /// Extend by `left` indices below and `right` above. Empty ranges stay empty.
    pub fn grow(&self, left: usize, right: usize) -> AxisRange {
        if self.is_empty() {
            return *self;
        }
        AxisRange::new(self.first - left as i64, self.last + right as i64)
    }

    /// Split into two halves; the left side receives `floor(len / 2)` indices.
    pub fn split_half(&self) -> (AxisRange, AxisRange) {
        self.split_at_length(self.length() / 2)
    }

    /// Split at ratio `a`; the left side receives `round(len * a)` indices
    /// (half-up), clamped to `[0, len]`.
    pub fn split_ratio(&self, a: f64) -> (AxisRange, AxisRange) {
        let len = self.length();
        let raw = (len as f64 * a + 0.5).floor();
        let left_len = if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(len)
        };
        self.split_at_length(left_len)
    }

    fn split_at_length(&self, left_len: usize) -> (AxisRange, AxisRange) {
        let mid = self.first + left_len as i64 - 1;
        let left = AxisRange::new(self.first, mid);
        let right = AxisRange::new(mid + 1, self.last.max(mid));
        (left, right)
    }

    /// Iterate over the contained indices.
    pub fn iter(&self) -> std::ops::RangeInclusive<i64> {
        self.first..=self.last
    }
}

impl fmt::Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}:1]", self.first, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_split_of_odd_length() {
        let r = AxisRange::new(3, 9); // 7 indices
        let (l, rr) = r.split_half();
        assert_eq!(l, AxisRange::new(3, 5));
        assert_eq!(rr, AxisRange::new(6, 9));
        assert_eq!(l.length() + rr.length(), r.length());
    }

    #[test]
    fn ratio_split_rounds_half_up() {
        let r = AxisRange::with_length(8);
        let (l, rr) = r.split_ratio(1.0 / 3.0);
        // 8/3 = 2.67 -> 3
        assert_eq!(l.length(), 3);
        assert_eq!(rr, AxisRange::new(3, 7));
    }

    #[test]
    fn split_of_single_index_leaves_empty_left() {
        let r = AxisRange::new(4, 4);
        let (l, rr) = r.split_half();
        assert!(l.is_empty());
        assert_eq!(l.first(), 4);
        assert_eq!(rr, r);
    }

    #[test]
    fn extreme_ratio_leaves_empty_right() {
        let r = AxisRange::new(0, 3);
        let (l, rr) = r.split_ratio(1.0);
        assert_eq!(l, r);
        assert!(rr.is_empty());
        assert_eq!(rr.length(), 0);
    }

    #[test]
    fn intersect_and_touch() {
        let a = AxisRange::new(0, 5);
        let b = AxisRange::new(5, 9);
        assert!(a.touches(&b));
        assert_eq!(a.intersect(&b), AxisRange::new(5, 5));
        let c = AxisRange::new(7, 9);
        assert!(!a.touches(&c));
        assert!(a.intersect(&c).is_empty());
    }

    #[test]
    fn grow_keeps_empty_ranges_empty() {
        assert_eq!(AxisRange::new(2, 4).grow(1, 2), AxisRange::new(1, 6));
        assert!(AxisRange::empty_at(3).grow(1, 1).is_empty());
    }
}
