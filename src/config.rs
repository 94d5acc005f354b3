//! Knobs for layout construction and the irregular-domain discretizer.

use serde::{Deserialize, Serialize};

use crate::domain_error::DomainError;
use crate::index::AxisTag;
use crate::solver::stencil::Interpolation;

/// Settings for [`FieldLayout::with_config`](crate::layout::FieldLayout::with_config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// One tag per axis; all parallel when absent.
    pub axis_tags: Option<Vec<AxisTag>>,
    /// Requested vnode count; one per rank when absent or zero.
    pub vnodes: Option<usize>,
}

impl LayoutConfig {
    /// Axis tags for a `D`-dimensional layout.
    pub fn tags<const D: usize>(&self) -> Result<[AxisTag; D], DomainError> {
        match &self.axis_tags {
            None => Ok([AxisTag::Parallel; D]),
            Some(tags) => {
                <[AxisTag; D]>::try_from(tags.as_slice()).map_err(|_| DomainError::DimensionMismatch {
                    expected: D,
                    got: tags.len(),
                })
            }
        }
    }
}

/// Settings for [`ArbitraryDomain::with_config`](crate::solver::ArbitraryDomain::with_config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscretizerConfig {
    pub interpolation: Interpolation,
    /// Physical `(min, max)` corners of the grid. Defaults to the geometry's
    /// bounding box.
    pub range: Option<([f64; 3], [f64; 3])>,
}
