#![cfg_attr(docsrs, feature(doc_cfg))]
//! # opal-domain
//!
//! opal-domain is the domain-decomposition and irregular-boundary
//! discretization layer of a parallel beam-dynamics code. It splits a
//! structured `D`-dimensional index space into vnodes owned by ranks, keeps
//! track of which vnodes are local and which are remote (with optional
//! guard-cell views), and turns a boundary geometry on a Cartesian grid
//! into seven-point Poisson stencils with a global unknown numbering.
//!
//! ## Features
//! - `IndexRange` / `AxisRange` index-space primitives with exact splits
//! - Deterministic recursive bisection for any vnode count, with a balanced
//!   round-robin path for powers of two
//! - `FieldLayout` with local and per-halo remote vnode tables, repartition
//!   callbacks and layouts preserved from external vnode sets
//! - `ArbitraryDomain`: inside/outside classification, ray-boundary
//!   distances, constant and linear boundary stencils, rank-ordered DOF maps
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Determinism
//!
//! The tiling depends only on `(domain, axis tags, vnode count)` and is
//! computed identically on every rank. DOF numbering is fixed by the rank
//! order of the prefix sum and the z, y, x traversal within a rank.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! opal-domain = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! ```
//! use opal_domain::prelude::*;
//!
//! let domain = IndexRange::from_lengths([8, 8]);
//! let layout = FieldLayout::initialize(&NoComm, domain, None, Some(3)).unwrap();
//! assert_eq!(layout.num_vnodes(), 3);
//! ```

pub mod algs;
pub mod config;
pub mod debug_invariants;
pub mod domain_error;
pub mod index;
pub mod layout;
pub mod solver;

pub use debug_invariants::DebugInvariants;
pub use domain_error::DomainError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::config::{DiscretizerConfig, LayoutConfig};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::domain_error::DomainError;
    pub use crate::index::{AxisRange, AxisTag, GuardCellSizes, IndexRange};
    pub use crate::layout::{
        Centering, FieldLayout, FieldLayoutUser, UserId, Vnode, VnodeRef, centered_layout,
    };
    pub use crate::solver::{
        ArbitraryDomain, BoundaryGeometry, BoxBoundary, Direction, Interpolation, SphereBoundary,
        Stencil,
    };
}
