//! Guard-cell (halo) widths.

use std::fmt;

/// Number of guard cells added below (`left`) and above (`right`) a domain
/// along each axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuardCellSizes<const D: usize> {
    left: [usize; D],
    right: [usize; D],
}

impl<const D: usize> GuardCellSizes<D> {
    pub const fn new(left: [usize; D], right: [usize; D]) -> Self {
        Self { left, right }
    }

    /// No guard cells; the key of the base remote table.
    pub const fn zero() -> Self {
        Self {
            left: [0; D],
            right: [0; D],
        }
    }

    /// `w` guard cells on both sides of every axis.
    pub const fn uniform(w: usize) -> Self {
        Self {
            left: [w; D],
            right: [w; D],
        }
    }

    #[inline]
    pub fn left(&self, axis: usize) -> usize {
        self.left[axis]
    }

    #[inline]
    pub fn right(&self, axis: usize) -> usize {
        self.right[axis]
    }

    pub fn is_zero(&self) -> bool {
        self.left.iter().chain(self.right.iter()).all(|&w| w == 0)
    }
}

impl<const D: usize> Default for GuardCellSizes<D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const D: usize> fmt::Display for GuardCellSizes<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for d in 0..D {
            if d > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}/{}", self.left[d], self.right[d])?;
        }
        write!(f, "}}")
    }
}
