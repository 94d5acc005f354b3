//! DomainError: unified error type for opal-domain public APIs
//!
//! Layout construction, repartitioning and the irregular-domain
//! discretizer all report failures through this enum instead of aborting.
//! A failed partition leaves no partial state behind; the driver is
//! expected to propagate the error and stop the run on every rank.

use crate::layout::user::UserId;
use thiserror::Error;

/// Unified error type for opal-domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Every axis of the requested layout was tagged serial.
    #[error("at least one dimension of a FieldLayout must be PARALLEL")]
    NoParallelAxis,
    /// The bit-reversal bisection produced a different number of domains
    /// than requested. This is an internal consistency failure.
    #[error("domain splitting produced {produced} vnodes, expected {expected}")]
    SplitCountMismatch { expected: usize, produced: usize },
    /// `vnodes_per_direction` queried on a layout that was not built by the
    /// power-of-two splitter.
    #[error("vnodes per direction are only known for power-of-two layouts")]
    VnodesPerDirectionUnavailable,
    /// An axis index beyond the layout dimension.
    #[error("axis {axis} out of range for a {dim}-dimensional layout")]
    AxisOutOfRange { axis: usize, dim: usize },
    /// A per-axis setting has the wrong number of entries.
    #[error("expected {expected} entries, one per axis, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// `check_out` of a user that was never checked in.
    #[error("layout user {0:?} is not checked in")]
    UnknownUser(UserId),
    /// The boundary geometry could not provide a reference point inside it.
    #[error("no point inside geometry found/set")]
    NoInsidePoint,
    /// The boundary geometry oracle is not ready for queries.
    #[error("boundary geometry is not ready")]
    GeometryNotReady,
    /// Grid resolution or spacing is unusable.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    /// DOF numbering requires each rank to own complete x/y planes.
    #[error("local range {x:?}/{y:?} does not span the full x/y grid extent")]
    NonSlabDecomposition { x: (i64, i64), y: (i64, i64) },
    /// A point-to-point message failed or never arrived.
    #[error("communication error with rank {neighbor}: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A received buffer has an unexpected length.
    #[error("buffer size mismatch with rank {neighbor}: expected {expected} bytes, got {got}")]
    BufferSizeMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
    /// A wire record could not be decoded.
    #[error("wire decode error: {0}")]
    WireDecode(String),
    /// A debug invariant check failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
