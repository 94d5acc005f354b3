//! Seven-point finite-difference stencils.

use serde::{Deserialize, Serialize};

/// The six axis-aligned neighbour directions of a grid cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// `x - 1`
    West,
    /// `x + 1`
    East,
    /// `y - 1`
    South,
    /// `y + 1`
    North,
    /// `z - 1`
    Front,
    /// `z + 1`
    Back,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
        Direction::Front,
        Direction::Back,
    ];

    #[inline]
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    /// `-1` towards lower indices, `+1` towards higher ones.
    #[inline]
    pub fn sign(self) -> i64 {
        if self as usize % 2 == 0 { -1 } else { 1 }
    }

    /// Unit vector along the direction.
    pub fn unit(self) -> [f64; 3] {
        let mut v = [0.0; 3];
        v[self.axis()] = self.sign() as f64;
        v
    }

    /// Coordinates of the neighbour of `c` in this direction.
    pub fn neighbor(self, c: [i64; 3]) -> [i64; 3] {
        let mut n = c;
        n[self.axis()] += self.sign();
        n
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// How boundary cells are discretized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Uniform spacing; missing neighbours simply drop out.
    Constant,
    /// Shortened arm to the boundary intersection on missing sides.
    #[default]
    Linear,
}

/// Coefficients of one row of the discrete Laplacian.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Stencil {
    pub center: f64,
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
    pub front: f64,
    pub back: f64,
}

impl Stencil {
    pub fn get(&self, dir: Direction) -> f64 {
        match dir {
            Direction::West => self.west,
            Direction::East => self.east,
            Direction::South => self.south,
            Direction::North => self.north,
            Direction::Front => self.front,
            Direction::Back => self.back,
        }
    }

    pub fn set(&mut self, dir: Direction, value: f64) {
        let slot = match dir {
            Direction::West => &mut self.west,
            Direction::East => &mut self.east,
            Direction::South => &mut self.south,
            Direction::North => &mut self.north,
            Direction::Front => &mut self.front,
            Direction::Back => &mut self.back,
        };
        *slot = value;
    }

    /// Sum of the six neighbour coefficients.
    pub fn off_diagonal_sum(&self) -> f64 {
        Direction::ALL.iter().map(|&d| self.get(d)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_pair_up_by_axis() {
        for d in Direction::ALL {
            let n = d.neighbor([5, 5, 5]);
            assert_eq!(n[d.axis()], 5 + d.sign());
        }
        assert_eq!(Direction::Front.unit(), [0.0, 0.0, -1.0]);
        assert_eq!(Direction::North.axis(), 1);
    }

    #[test]
    fn stencil_accessors_agree() {
        let mut s = Stencil::default();
        for (i, d) in Direction::ALL.into_iter().enumerate() {
            s.set(d, i as f64);
        }
        assert_eq!(s.east, 1.0);
        assert_eq!(s.back, 5.0);
        assert_eq!(s.off_diagonal_sum(), 15.0);
    }
}
