//! # WeldKit Path
//!
//! Turns an unordered outline into an ordered weld path.
//!
//! ## Pipeline
//!
//! ```text
//! Segments (from CAD flattening)
//!   └── assemble_contours  -> VertexChain (open/closed)
//!         ├── generate_points -> WeldPoint sequence
//!         └── place_heads / distribute_heads -> HeadFootprint sequence
//! ```
//!
//! Everything here is pure and synchronous, so it can run on any thread.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weldkit_path::{assemble_contours, generate_points, Segment};
//!
//! let chains = assemble_contours(&segments, 1e-4);
//! let points = generate_points(&chains, 2.0)?;
//! ```

pub mod contour;
pub mod geometry;
pub mod head;
pub mod points;

pub use contour::{assemble_contours, dedup_segments, VertexChain, DEFAULT_CONTOUR_TOLERANCE};
pub use geometry::{
    point_in_outline, point_in_polygon, point_in_polygon_with_tolerance, point_on_segment,
    Segment, ON_SEGMENT_TOLERANCE,
};
pub use head::{distribute_heads, place_heads, HeadFootprint, HeadGeometry};
pub use points::{bounds, generate_points, swap_xy, translate, Bounds, WeldPoint, MIN_EDGE_LENGTH};
