//! Assets, placements and annotations.
//!
//! Images are held as RGB8 buffers (`image::RgbImage`). Assets are decoded by
//! [`io_assets`](super::io_assets) and handed to the generator already
//! labeled; nothing in the compositing core looks at file paths.

use image::RgbImage;
use serde::Serialize;
use std::fmt;

use super::bbox::BBoxXYXY;
use super::ids::ClassId;
use super::space::{Normalized, Pixel};

/// A cropped object cut-out with its detector class.
///
/// Pixels equal to pure white are treated as transparent when the object is
/// composited.
#[derive(Clone, Debug)]
pub struct ObjectAsset {
    pub image: RgbImage,
    pub class_id: ClassId,
}

impl ObjectAsset {
    pub fn new(image: RgbImage, class_id: impl Into<ClassId>) -> Self {
        Self {
            image,
            class_id: class_id.into(),
        }
    }
}

/// A scene image that objects are pasted onto.
#[derive(Clone, Debug)]
pub struct BackgroundAsset {
    pub image: RgbImage,
}

impl BackgroundAsset {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }
}

/// Where a (scaled) object lands on the canvas, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    pub fn new(offset_x: u32, offset_y: u32, width: u32, height: u32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    /// The placement rectangle as a pixel-space box.
    pub fn bbox(&self) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xywh(
            self.offset_x as f64,
            self.offset_y as f64,
            self.width as f64,
            self.height as f64,
        )
    }

    /// Returns true if the rectangle lies entirely on a canvas of the given size.
    pub fn fits_within(&self, canvas_width: u32, canvas_height: u32) -> bool {
        self.offset_x as u64 + self.width as u64 <= canvas_width as u64
            && self.offset_y as u64 + self.height as u64 <= canvas_height as u64
    }
}

/// A normalized, center-based bounding box label.
///
/// All geometric fields are fractions of the background width or height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Annotation {
    pub class_id: ClassId,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Annotation {
    pub fn new(
        class_id: impl Into<ClassId>,
        center_x: f64,
        center_y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// The label as a normalized XYXY box.
    pub fn bbox(&self) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_cxcywh(self.center_x, self.center_y, self.width, self.height)
    }

    /// Maps the label back onto a canvas of the given size.
    pub fn to_pixel_bbox(&self, canvas_width: u32, canvas_height: u32) -> BBoxXYXY<Pixel> {
        self.bbox().to_pixel(canvas_width as f64, canvas_height as f64)
    }

    /// Returns true if every geometric field lies in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        [self.center_x, self.center_y, self.width, self.height]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

/// Renders the label as one YOLO line (without the trailing newline).
impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.center_x, self.center_y, self.width, self.height
        )
    }
}

/// One generated training example.
#[derive(Clone, Debug)]
pub struct Example {
    /// The background after all overlays.
    pub image: RgbImage,
    /// One label per placed object, in placement order.
    pub annotations: Vec<Annotation>,
}
