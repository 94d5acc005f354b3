//! Index-space primitives: 1-D ranges, N-dimensional rectangles, axis tags
//! and guard-cell widths.

pub mod axis_range;
pub mod axis_tag;
pub mod guard;
pub mod index_range;

pub use axis_range::AxisRange;
pub use axis_tag::AxisTag;
pub use guard::GuardCellSizes;
pub use index_range::IndexRange;
