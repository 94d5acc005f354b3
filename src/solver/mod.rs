//! Poisson discretization on irregular domains.

pub mod arbitrary_domain;
pub mod boundary;
pub mod stencil;

pub use arbitrary_domain::{ArbitraryDomain, Coord};
pub use boundary::{BoundaryGeometry, BoxBoundary, Point, SphereBoundary};
pub use stencil::{Direction, Interpolation, Stencil};
