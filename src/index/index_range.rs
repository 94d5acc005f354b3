//! `IndexRange<D>`: a rectangular block of a `D`-dimensional index space.
//!
//! This is the value type every vnode carries. It is `Copy`, totally
//! ordered (lexicographically by axis) so it can key maps, and it splits
//! along one axis into two blocks that tile the parent exactly.

use std::fmt;
use std::ops::Index;

use super::axis_range::AxisRange;
use super::guard::GuardCellSizes;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct IndexRange<const D: usize> {
    axes: [AxisRange; D],
}

impl<const D: usize> IndexRange<D> {
    pub const fn new(axes: [AxisRange; D]) -> Self {
        Self { axes }
    }

    /// Block `[0, n_d - 1]` along every axis `d`.
    pub fn from_lengths(lengths: [usize; D]) -> Self {
        Self {
            axes: lengths.map(AxisRange::with_length),
        }
    }

    #[inline]
    pub fn axes(&self) -> &[AxisRange; D] {
        &self.axes
    }

    #[inline]
    pub fn axis(&self, d: usize) -> AxisRange {
        self.axes[d]
    }

    /// Replace the range along axis `d`.
    pub fn with_axis(mut self, d: usize, r: AxisRange) -> Self {
        self.axes[d] = r;
        self
    }

    pub fn lengths(&self) -> [usize; D] {
        self.axes.map(|a| a.length())
    }

    /// Number of index points in the block.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|a| a.length()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.iter().any(|a| a.is_empty())
    }

    /// True if `other` lies completely inside `self`.
    pub fn contains(&self, other: &IndexRange<D>) -> bool {
        self.axes
            .iter()
            .zip(other.axes.iter())
            .all(|(a, b)| a.contains_range(b))
    }

    pub fn contains_point(&self, p: [i64; D]) -> bool {
        self.axes.iter().zip(p).all(|(a, i)| a.contains(i))
    }

    /// True if the blocks share at least one index point.
    pub fn touches(&self, other: &IndexRange<D>) -> bool {
        self.axes
            .iter()
            .zip(other.axes.iter())
            .all(|(a, b)| a.touches(b))
    }

    pub fn intersect(&self, other: &IndexRange<D>) -> IndexRange<D> {
        let mut axes = self.axes;
        for (a, b) in axes.iter_mut().zip(other.axes.iter()) {
            *a = a.intersect(b);
        }
        Self { axes }
    }

    /// Add guard cells on every axis.
    pub fn grow(&self, gc: &GuardCellSizes<D>) -> IndexRange<D> {
        let mut axes = self.axes;
        for (d, a) in axes.iter_mut().enumerate() {
            *a = a.grow(gc.left(d), gc.right(d));
        }
        Self { axes }
    }

    /// Split in half along `axis`; the other axes are copied unchanged.
    pub fn split_half(&self, axis: usize) -> (IndexRange<D>, IndexRange<D>) {
        let (l, r) = self.axes[axis].split_half();
        (self.with_axis(axis, l), self.with_axis(axis, r))
    }

    /// Split along `axis` so the left block receives `round(len * a)` indices.
    pub fn split_ratio(&self, axis: usize, a: f64) -> (IndexRange<D>, IndexRange<D>) {
        let (l, r) = self.axes[axis].split_ratio(a);
        (self.with_axis(axis, l), self.with_axis(axis, r))
    }

    /// Iterate over every index point, last axis fastest.
    pub fn points(&self) -> impl Iterator<Item = [i64; D]> + '_ {
        let total = self.size();
        let lengths = self.lengths();
        (0..total).map(move |mut flat| {
            let mut p = [0i64; D];
            for d in (0..D).rev() {
                let len = lengths[d];
                p[d] = self.axes[d].first() + (flat % len) as i64;
                flat /= len;
            }
            p
        })
    }
}

impl<const D: usize> Index<usize> for IndexRange<D> {
    type Output = AxisRange;

    fn index(&self, d: usize) -> &AxisRange {
        &self.axes[d]
    }
}

impl<const D: usize> fmt::Display for IndexRange<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (d, a) in self.axes.iter().enumerate() {
            if d > 0 {
                write!(f, ",")?;
            }
            write!(f, "{a}")?;
        }
        write!(f, "}}")
    }
}
