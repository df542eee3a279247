//! Overlaying object cut-outs onto a background canvas.
//!
//! Pure white pixels of the (scaled, not yet augmented) object mark its
//! transparent surroundings. Every other pixel is copied from the augmented
//! object into the placement rectangle. Nothing outside the rectangle is
//! written.

use image::{Rgb, RgbImage};
use rand::Rng;

use crate::error::SynthError;
use crate::ir::{Annotation, ClassId, Placement};
use crate::photometric::{PhotometricMode, PhotometricParams, PhotometricTransform};
use crate::random;

/// Color keyed out as transparent.
pub const SENTINEL: Rgb<u8> = Rgb([255, 255, 255]);

/// The outcome of pasting one object.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedObject {
    pub placement: Placement,
    pub annotation: Annotation,
    pub mode: PhotometricMode,
}

/// Draws a top-left offset so an object of `object` size lies fully on a
/// canvas of `canvas` size.
///
/// Offsets are drawn from `[0, canvas - object)`; an axis with no slack
/// gets offset 0.
pub fn sample_placement<R: Rng + ?Sized>(
    rng: &mut R,
    canvas: (u32, u32),
    object: (u32, u32),
) -> Result<Placement, SynthError> {
    let (canvas_width, canvas_height) = canvas;
    let (object_width, object_height) = object;

    if object_width == 0 || object_height == 0 {
        return Err(SynthError::DegenerateObject {
            message: format!("object image is {}x{}", object_width, object_height),
        });
    }
    if object_width > canvas_width || object_height > canvas_height {
        return Err(SynthError::ObjectTooLarge {
            object_width,
            object_height,
            background_width: canvas_width,
            background_height: canvas_height,
        });
    }

    let offset_x = random::uniform_offset(rng, canvas_width - object_width);
    let offset_y = random::uniform_offset(rng, canvas_height - object_height);

    Ok(Placement::new(offset_x, offset_y, object_width, object_height))
}

/// Copies `augmented` onto `canvas` at the placement offset, skipping every
/// pixel whose counterpart in `original` equals [`SENTINEL`].
///
/// `original` and `augmented` must have the placement's dimensions and the
/// placement must fit on the canvas.
pub fn overlay_masked(
    canvas: &mut RgbImage,
    original: &RgbImage,
    augmented: &RgbImage,
    placement: &Placement,
) {
    debug_assert_eq!(original.dimensions(), augmented.dimensions());
    debug_assert_eq!(original.dimensions(), (placement.width, placement.height));
    debug_assert!(placement.fits_within(canvas.width(), canvas.height()));

    for (x, y, source) in original.enumerate_pixels() {
        if *source == SENTINEL {
            continue;
        }
        canvas.put_pixel(
            placement.offset_x + x,
            placement.offset_y + y,
            *augmented.get_pixel(x, y),
        );
    }
}

/// Converts a placement into a normalized, center-based label.
pub fn encode_annotation(
    class_id: ClassId,
    placement: &Placement,
    canvas_width: u32,
    canvas_height: u32,
) -> Annotation {
    let bbox = placement
        .bbox()
        .to_normalized(canvas_width as f64, canvas_height as f64);
    let (cx, cy, w, h) = bbox.to_cxcywh();
    Annotation::new(class_id, cx, cy, w, h)
}

/// Places an already scaled object on the canvas: draws the offset, draws a
/// photometric transform, overlays with masking and encodes the label.
pub fn paste_object<R: Rng + ?Sized>(
    rng: &mut R,
    canvas: &mut RgbImage,
    object: &RgbImage,
    class_id: ClassId,
    params: &PhotometricParams,
) -> Result<PlacedObject, SynthError> {
    let placement = sample_placement(rng, canvas.dimensions(), object.dimensions())?;

    let transform = PhotometricTransform::sample(rng, params);
    let augmented = transform.apply(object);
    overlay_masked(canvas, object, &augmented, &placement);

    let annotation = encode_annotation(class_id, &placement, canvas.width(), canvas.height());

    Ok(PlacedObject {
        placement,
        annotation,
        mode: transform.mode(),
    })
}
