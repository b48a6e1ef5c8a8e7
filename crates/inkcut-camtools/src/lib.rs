//! # Inkcut CAM Tools
//!
//! Path processing applied between a job's geometry and the device:
//!
//! - **Flatten**: curve to polyline conversion at a configurable quality
//! - **Filters**: blade offset, overcut, short segment removal, repeat passes
//! - **Ordering**: bounding box sorts, greedy shortest travel over a KD-tree,
//!   Hilbert and Z curve orderings

pub mod filters;
pub mod flatten;
pub mod ordering;

pub use filters::{
    apply_all, BladeOffsetConfig, BladeOffsetFilter, FilterConfig, MinLineConfig, MinLineFilter,
    OvercutConfig, OvercutFilter, PathFilter, RepeatConfig, RepeatFilter,
};
pub use flatten::{flatten_subpath, polyline_length, to_polylines, tolerance_for};
pub use ordering::{KdTree, OrderKind, ShortestPath};
