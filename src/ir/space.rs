//! Coordinate space markers.
//!
//! Zero-sized types used as type parameters so pixel-space and normalized
//! boxes cannot be mixed up when encoding annotations.

/// Absolute pixel coordinates, origin at the top-left corner of the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Coordinates expressed as fractions of the canvas width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Normalized {}
