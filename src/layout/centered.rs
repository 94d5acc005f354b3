//! Layouts sized from mesh vertex counts.
//!
//! A mesh with `n` vertices along an axis carries `n` vertex-centred values
//! and `n - 1` cell-centred values there.

use serde::{Deserialize, Serialize};

use crate::algs::communicator::Communicator;
use crate::domain_error::DomainError;
use crate::index::{AxisTag, IndexRange};
use crate::layout::field_layout::FieldLayout;

/// Where field values live on the mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Centering {
    #[default]
    Cell,
    Vertex,
}

impl Centering {
    /// Number of values along an axis with `vertices` mesh vertices.
    pub fn points(self, vertices: usize) -> usize {
        match self {
            Centering::Cell => vertices.saturating_sub(1),
            Centering::Vertex => vertices,
        }
    }

    /// Index domain for a mesh with `vertices[d]` vertices along axis `d`.
    pub fn domain<const D: usize>(self, vertices: [usize; D]) -> Result<IndexRange<D>, DomainError> {
        let lengths = vertices.map(|n| self.points(n));
        if let Some(d) = lengths.iter().position(|&l| l == 0) {
            return Err(DomainError::InvalidGrid(format!(
                "{} vertices along axis {d} leave no {self:?}-centred points",
                vertices[d]
            )));
        }
        Ok(IndexRange::from_lengths(lengths))
    }
}

/// Partition the `centering` domain of a mesh with `vertices` vertices per
/// axis, as [`FieldLayout::initialize`] does.
pub fn centered_layout<C: Communicator, const D: usize>(
    comm: &C,
    vertices: [usize; D],
    centering: Centering,
    tags: Option<[AxisTag; D]>,
    vnodes: Option<usize>,
) -> Result<FieldLayout<D>, DomainError> {
    let domain = centering.domain(vertices)?;
    FieldLayout::initialize(comm, domain, tags, vnodes)
}
