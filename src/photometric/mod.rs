//! Photometric augmentation of object cut-outs.
//!
//! Each placed object gets exactly one of two transforms, picked by a fair
//! coin:
//!
//! - **Linear**: `out = saturate(alpha * in + beta)` per channel, a contrast
//!   multiplier plus a brightness offset.
//! - **Gamma**: `out = table[in]` where
//!   `table[i] = saturate(255 * (i / 255)^gamma)`.
//!
//! The same transform applies to every pixel of one object.

use image::{Rgb, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SynthError;
use crate::random;

/// Sampling ranges for the photometric transforms.
///
/// `alpha` and `gamma` are drawn from `[min, max)`; `beta` from
/// `[beta_min, beta_max]` inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhotometricParams {
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub beta_min: i32,
    pub beta_max: i32,
    pub gamma_min: f64,
    pub gamma_max: f64,
}

impl Default for PhotometricParams {
    fn default() -> Self {
        Self {
            alpha_min: 0.5,
            alpha_max: 1.5,
            beta_min: -40,
            beta_max: 40,
            gamma_min: 0.5,
            gamma_max: 1.5,
        }
    }
}

impl PhotometricParams {
    pub(crate) fn validate(&self) -> Result<(), SynthError> {
        check_positive_range("alpha", self.alpha_min, self.alpha_max)?;
        check_positive_range("gamma", self.gamma_min, self.gamma_max)?;
        if self.beta_min > self.beta_max {
            return Err(SynthError::InvalidGenerateParams {
                message: format!(
                    "beta minimum {} is greater than maximum {}",
                    self.beta_min, self.beta_max
                ),
            });
        }
        Ok(())
    }
}

fn check_positive_range(name: &str, min: f64, max: f64) -> Result<(), SynthError> {
    if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
        return Err(SynthError::InvalidGenerateParams {
            message: format!(
                "{name} range must be positive and ordered, got {}..{}",
                min, max
            ),
        });
    }
    Ok(())
}

/// Which branch of the coin flip was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotometricMode {
    Linear,
    Gamma,
}

/// A sampled photometric transform, ready to apply.
#[derive(Clone, Debug, PartialEq)]
pub enum PhotometricTransform {
    Linear { alpha: f64, beta: i32 },
    Gamma { gamma: f64, table: [u8; 256] },
}

impl PhotometricTransform {
    pub fn linear(alpha: f64, beta: i32) -> Self {
        PhotometricTransform::Linear { alpha, beta }
    }

    /// Builds a gamma transform together with its lookup table.
    pub fn gamma(gamma: f64) -> Self {
        PhotometricTransform::Gamma {
            gamma,
            table: gamma_table(gamma),
        }
    }

    /// Flips a fair coin between the linear and gamma transforms and draws
    /// the parameters of the chosen one.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, params: &PhotometricParams) -> Self {
        if rng.random_bool(0.5) {
            let alpha = random::uniform_f64(rng, params.alpha_min, params.alpha_max);
            let beta = random::uniform_inclusive(rng, params.beta_min, params.beta_max);
            Self::linear(alpha, beta)
        } else {
            let gamma = random::uniform_f64(rng, params.gamma_min, params.gamma_max);
            Self::gamma(gamma)
        }
    }

    pub fn mode(&self) -> PhotometricMode {
        match self {
            PhotometricTransform::Linear { .. } => PhotometricMode::Linear,
            PhotometricTransform::Gamma { .. } => PhotometricMode::Gamma,
        }
    }

    /// Transforms a single pixel.
    #[inline]
    pub fn apply_pixel(&self, pixel: Rgb<u8>) -> Rgb<u8> {
        let Rgb([r, g, b]) = pixel;
        match self {
            PhotometricTransform::Linear { alpha, beta } => {
                let map = |v: u8| saturate(alpha * v as f64 + *beta as f64);
                Rgb([map(r), map(g), map(b)])
            }
            PhotometricTransform::Gamma { table, .. } => {
                Rgb([table[r as usize], table[g as usize], table[b as usize]])
            }
        }
    }

    /// Returns a transformed copy of the whole image.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let mut out = image.clone();
        match self {
            PhotometricTransform::Gamma { table, .. } => {
                for value in out.iter_mut() {
                    *value = table[*value as usize];
                }
            }
            PhotometricTransform::Linear { .. } => {
                for pixel in out.pixels_mut() {
                    *pixel = self.apply_pixel(*pixel);
                }
            }
        }
        out
    }
}

/// Builds the 256-entry gamma lookup table.
pub fn gamma_table(gamma: f64) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = saturate((i as f64 / 255.0).powf(gamma) * 255.0);
    }
    table
}

/// Rounds to the nearest integer and clamps into `[0, 255]`.
#[inline]
pub fn saturate(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = ((x * 37 + y * 11) % 256) as u8;
            Rgb([v, v.wrapping_add(85), v.wrapping_add(170)])
        })
    }

    #[test]
    fn saturate_rounds_and_clamps() {
        assert_eq!(saturate(-3.0), 0);
        assert_eq!(saturate(12.4), 12);
        assert_eq!(saturate(12.6), 13);
        assert_eq!(saturate(300.0), 255);
    }

    #[test]
    fn unit_gamma_table_is_identity() {
        let table = gamma_table(1.0);
        for (i, v) in table.iter().enumerate() {
            assert_eq!(*v as usize, i);
        }
    }

    #[test]
    fn gamma_table_keeps_endpoints() {
        for gamma in [0.5, 0.8, 1.3, 1.5] {
            let table = gamma_table(gamma);
            assert_eq!(table[0], 0);
            assert_eq!(table[255], 255);
        }
    }

    #[test]
    fn gamma_below_one_brightens() {
        let table = gamma_table(0.5);
        assert!(table[64] > 64);
        let table = gamma_table(1.5);
        assert!(table[64] < 64);
    }

    #[test]
    fn identity_transforms_leave_pixels_unchanged() {
        let image = gradient(17, 9);
        assert_eq!(PhotometricTransform::linear(1.0, 0).apply(&image), image);
        assert_eq!(PhotometricTransform::gamma(1.0).apply(&image), image);
    }

    #[test]
    fn linear_transform_saturates() {
        let t = PhotometricTransform::linear(1.5, 40);
        assert_eq!(t.apply_pixel(Rgb([0, 100, 200])), Rgb([40, 190, 255]));

        let t = PhotometricTransform::linear(0.5, -40);
        assert_eq!(t.apply_pixel(Rgb([0, 100, 200])), Rgb([0, 10, 60]));
    }

    #[test]
    fn whole_image_matches_per_pixel() {
        let image = gradient(8, 8);
        for t in [
            PhotometricTransform::linear(1.2, -7),
            PhotometricTransform::gamma(0.7),
        ] {
            let out = t.apply(&image);
            for (x, y, pixel) in image.enumerate_pixels() {
                assert_eq!(out.get_pixel(x, y), &t.apply_pixel(*pixel));
            }
        }
    }

    #[test]
    fn sampled_parameters_respect_ranges() {
        let mut rng = StdRng::seed_from_u64(99);
        let params = PhotometricParams::default();
        let mut linear = 0;
        let mut gamma = 0;

        for _ in 0..2000 {
            match PhotometricTransform::sample(&mut rng, &params) {
                PhotometricTransform::Linear { alpha, beta } => {
                    linear += 1;
                    assert!((0.5..1.5).contains(&alpha));
                    assert!((-40..=40).contains(&beta));
                }
                PhotometricTransform::Gamma { gamma: g, table } => {
                    gamma += 1;
                    assert!((0.5..1.5).contains(&g));
                    assert_eq!(table, gamma_table(g));
                }
            }
        }

        // Fair coin: both branches show up in roughly equal measure.
        assert!(linear > 800 && gamma > 800, "linear={linear} gamma={gamma}");
    }

    #[test]
    fn params_validation() {
        assert!(PhotometricParams::default().validate().is_ok());

        let bad_alpha = PhotometricParams {
            alpha_min: 0.0,
            ..Default::default()
        };
        assert!(bad_alpha.validate().is_err());

        let bad_beta = PhotometricParams {
            beta_min: 10,
            beta_max: -10,
            ..Default::default()
        };
        assert!(bad_beta.validate().is_err());

        let bad_gamma = PhotometricParams {
            gamma_min: 2.0,
            gamma_max: 1.0,
            ..Default::default()
        };
        assert!(bad_gamma.validate().is_err());
    }
}
