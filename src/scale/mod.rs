//! Aspect-preserving object scaling.
//!
//! Objects are resized so their longer axis matches a target length drawn as
//! a fraction of the background's shorter side. The shorter axis follows
//! proportionally.

use image::imageops::{self, FilterType};
use image::RgbImage;
use rand::Rng;
use serde::Deserialize;

use crate::error::SynthError;
use crate::random;

/// Bounds for the fraction of the background's shorter side that an
/// object's longer side is scaled to.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self { min: 0.1, max: 0.5 }
    }
}

impl ScaleRange {
    pub(crate) fn validate(&self) -> Result<(), SynthError> {
        let in_unit = |v: f64| v > 0.0 && v <= 1.0;
        if !in_unit(self.min) || !in_unit(self.max) {
            return Err(SynthError::InvalidGenerateParams {
                message: format!(
                    "scale bounds must be in the interval (0.0, 1.0], got {}..{}",
                    self.min, self.max
                ),
            });
        }
        if self.min > self.max {
            return Err(SynthError::InvalidGenerateParams {
                message: format!(
                    "scale minimum {} is greater than maximum {}",
                    self.min, self.max
                ),
            });
        }
        Ok(())
    }
}

/// Draws the target long-side length for an object on a background of the
/// given size: `round(U(min, max) * min(width, height))`.
pub fn sample_long_side<R: Rng + ?Sized>(
    rng: &mut R,
    background_width: u32,
    background_height: u32,
    range: &ScaleRange,
) -> Result<u32, SynthError> {
    let fraction = random::uniform_f64(rng, range.min, range.max);
    let shorter = background_width.min(background_height);
    let long_side = (fraction * shorter as f64).round() as u32;

    if long_side == 0 {
        return Err(SynthError::DegenerateObject {
            message: format!(
                "background of {}x{} is too small for scale fraction {:.3}",
                background_width, background_height, fraction
            ),
        });
    }

    Ok(long_side)
}

/// Computes the (width, height) an image of the given size takes when its
/// longer axis is set to `long_side`.
///
/// Rows win only when strictly longer than columns; square images take the
/// column branch. The shorter axis never rounds below one pixel.
pub fn target_size(width: u32, height: u32, long_side: u32) -> Result<(u32, u32), SynthError> {
    if width == 0 || height == 0 {
        return Err(SynthError::DegenerateObject {
            message: format!("object image is {}x{}", width, height),
        });
    }
    if long_side == 0 {
        return Err(SynthError::DegenerateObject {
            message: "target size is zero".to_string(),
        });
    }

    let proportional = |short: u32, long: u32| {
        let ratio = long_side as f64 / long as f64;
        ((ratio * short as f64).round() as u32).max(1)
    };

    if height > width {
        Ok((proportional(width, height), long_side))
    } else {
        Ok((long_side, proportional(height, width)))
    }
}

/// Picks the resampling filter: cubic when enlarging, triangle (area-like)
/// when shrinking or keeping the size.
pub fn interpolation_for(source: (u32, u32), target: (u32, u32)) -> FilterType {
    let source_long = source.0.max(source.1);
    let target_long = target.0.max(target.1);
    if target_long > source_long {
        FilterType::CatmullRom
    } else {
        FilterType::Triangle
    }
}

/// Resizes `image` so its longer axis equals `long_side`.
pub fn resize_to_long_side(image: &RgbImage, long_side: u32) -> Result<RgbImage, SynthError> {
    let source = image.dimensions();
    let target = target_size(source.0, source.1, long_side)?;
    if target == source {
        return Ok(image.clone());
    }

    let filter = interpolation_for(source, target);
    Ok(imageops::resize(image, target.0, target.1, filter))
}
