//! Per-axis decomposition flags.

use serde::{Deserialize, Serialize};

/// Whether an axis takes part in domain decomposition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisTag {
    /// The axis may be split between vnodes.
    #[default]
    Parallel,
    /// The axis is never split; every vnode spans it completely.
    Serial,
}

impl AxisTag {
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, AxisTag::Parallel)
    }
}

/// Number of parallel axes in `tags`.
pub fn parallel_count(tags: &[AxisTag]) -> usize {
    tags.iter().filter(|t| t.is_parallel()).count()
}
