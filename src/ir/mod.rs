//! Data model for synthetic example generation.
//!
//! This module holds the types that flow through the compositing pipeline,
//! plus the collaborators that load assets from disk and persist generated
//! examples.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: class ids are a newtype and boxes carry a marker for
//!    their coordinate space, so pixel placements and normalized labels
//!    cannot be confused.
//!
//! 2. **Paths stay at the edge**: class ids are attached to object assets
//!    when they are loaded. The compositing core only sees decoded pixels.
//!
//! # Example
//!
//! ```
//! use synthdet::ir::{Annotation, Placement};
//!
//! let placement = Placement::new(50, 20, 40, 40);
//! let bbox = placement.bbox().to_normalized(200.0, 100.0);
//! let (cx, cy, w, h) = bbox.to_cxcywh();
//! let ann = Annotation::new(0u32, cx, cy, w, h);
//! assert_eq!(ann.to_string(), "0 0.350000 0.400000 0.200000 0.400000");
//! ```

mod bbox;
mod ids;
pub mod io_assets;
pub mod io_yolo;
mod model;
mod space;

// Re-export core types for convenient access
pub use bbox::BBoxXYXY;
pub use ids::ClassId;
pub use model::{Annotation, BackgroundAsset, Example, ObjectAsset, Placement};
pub use space::{Normalized, Pixel};
