//! Box-aware augmentation of finished composites.
//!
//! Each augmented variant runs a finished example through a randomly
//! ordered sequence of steps:
//!
//! - horizontal flip (with probability)
//! - brightness multiplier and contrast around mid-gray
//! - partial grayscale blend
//! - sharpen and Gaussian blur (each with probability)
//! - additive noise, one draw per pixel shared by the three channels
//! - affine scale, translation and rotation about the image center (with
//!   probability), filling uncovered pixels with black
//!
//! Photometric steps leave the boxes alone. Geometric steps move every box
//! with the image; a rotated box becomes the axis-aligned hull of its
//! corners. Boxes are clipped to the image at the end, and a box narrower or
//! shorter than one pixel after clipping is dropped.

use image::{imageops, Rgb, RgbImage};
use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::error::SynthError;
use crate::ir::{Annotation, BBoxXYXY, ClassId, Example, Pixel};
use crate::photometric::saturate;
use crate::random;

/// Boxes thinner than this many pixels after clipping are dropped.
pub const MIN_BOX_SIDE: f64 = 1.0;

/// Augmentation settings.
///
/// Ranges are drawn uniformly from `[min, max)`. Also the `augment` section
/// of a YAML recipe; missing fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AugmentParams {
    /// Augmented copies written per example. 0 disables augmentation.
    pub variants: usize,
    pub flip_probability: f64,
    pub brightness_min: f64,
    pub brightness_max: f64,
    /// Contrast factor, applied as `128 + c * (v - 128)`.
    pub contrast_min: f64,
    pub contrast_max: f64,
    /// Largest blend weight toward the grayscale image.
    pub grayscale_max: f64,
    pub sharpen_probability: f64,
    pub sharpen_alpha_max: f64,
    pub sharpen_lightness_min: f64,
    pub sharpen_lightness_max: f64,
    pub blur_probability: f64,
    pub blur_sigma_min: f64,
    pub blur_sigma_max: f64,
    /// Largest noise amplitude, in intensity levels.
    pub noise_max: f64,
    pub affine_probability: f64,
    pub affine_scale_min: f64,
    pub affine_scale_max: f64,
    /// Largest shift on each axis, as a fraction of the image size.
    pub affine_translate_max: f64,
    pub affine_rotate_max_degrees: f64,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            variants: 0,
            flip_probability: 0.5,
            brightness_min: 0.6,
            brightness_max: 1.2,
            contrast_min: 0.5,
            contrast_max: 1.25,
            grayscale_max: 0.5,
            sharpen_probability: 0.4,
            sharpen_alpha_max: 0.65,
            sharpen_lightness_min: 0.75,
            sharpen_lightness_max: 1.15,
            blur_probability: 0.5,
            blur_sigma_min: 0.1,
            blur_sigma_max: 1.0,
            noise_max: 0.05 * 255.0,
            affine_probability: 0.5,
            affine_scale_min: 0.5,
            affine_scale_max: 1.2,
            affine_translate_max: 0.2,
            affine_rotate_max_degrees: 30.0,
        }
    }
}

impl AugmentParams {
    pub(crate) fn validate(&self) -> Result<(), SynthError> {
        for (name, p) in [
            ("flip", self.flip_probability),
            ("sharpen", self.sharpen_probability),
            ("blur", self.blur_probability),
            ("affine", self.affine_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(format!(
                    "{name} probability must be in [0, 1], got {p}"
                )));
            }
        }

        check_range("brightness", self.brightness_min, self.brightness_max, 0.0)?;
        check_range("contrast", self.contrast_min, self.contrast_max, 0.0)?;
        check_range("grayscale", 0.0, self.grayscale_max, 0.0)?;
        check_range(
            "sharpen lightness",
            self.sharpen_lightness_min,
            self.sharpen_lightness_max,
            0.0,
        )?;
        check_range("noise", 0.0, self.noise_max, 0.0)?;
        check_range(
            "affine rotation",
            0.0,
            self.affine_rotate_max_degrees,
            0.0,
        )?;

        if !(0.0..=1.0).contains(&self.grayscale_max) {
            return Err(invalid(format!(
                "grayscale maximum must be in [0, 1], got {}",
                self.grayscale_max
            )));
        }
        if !(0.0..=1.0).contains(&self.sharpen_alpha_max) {
            return Err(invalid(format!(
                "sharpen alpha maximum must be in [0, 1], got {}",
                self.sharpen_alpha_max
            )));
        }
        check_range("blur sigma", self.blur_sigma_min, self.blur_sigma_max, 0.0)?;
        if self.blur_sigma_min == 0.0 {
            return Err(invalid(
                "blur sigma minimum must be positive, got 0".to_string(),
            ));
        }
        check_range(
            "affine scale",
            self.affine_scale_min,
            self.affine_scale_max,
            0.0,
        )?;
        if self.affine_scale_min == 0.0 {
            return Err(invalid(
                "affine scale minimum must be positive, got 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.affine_translate_max) {
            return Err(invalid(format!(
                "affine translation must be in [0, 1), got {}",
                self.affine_translate_max
            )));
        }

        Ok(())
    }
}

fn invalid(message: String) -> SynthError {
    SynthError::InvalidGenerateParams { message }
}

fn check_range(name: &str, min: f64, max: f64, floor: f64) -> Result<(), SynthError> {
    if !(min.is_finite() && max.is_finite()) || min < floor || min > max {
        return Err(invalid(format!(
            "{name} range must be finite, at least {floor} and ordered, got {min}..{max}"
        )));
    }
    Ok(())
}

/// An affine warp about the image center.
///
/// A point `p` maps to `c + t + R * S * (p - c)`, where `c` is the image
/// center, `t` the translation, `R` the rotation and `S` the axis scales.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub scale_x: f64,
    pub scale_y: f64,
    /// Shift as a fraction of the image width.
    pub translate_x: f64,
    /// Shift as a fraction of the image height.
    pub translate_y: f64,
    pub rotate_degrees: f64,
}

impl Affine {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            rotate_degrees: 0.0,
        }
    }

    fn sample<R: Rng + ?Sized>(rng: &mut R, params: &AugmentParams) -> Self {
        let shift = params.affine_translate_max;
        let angle = params.affine_rotate_max_degrees;
        Self {
            scale_x: random::uniform_f64(rng, params.affine_scale_min, params.affine_scale_max),
            scale_y: random::uniform_f64(rng, params.affine_scale_min, params.affine_scale_max),
            translate_x: random::uniform_f64(rng, -shift, shift),
            translate_y: random::uniform_f64(rng, -shift, shift),
            rotate_degrees: random::uniform_f64(rng, -angle, angle),
        }
    }

    /// Forward map on a `width x height` image as `[a, b, c, d, e, f]`, with
    /// `x' = a x + b y + c` and `y' = d x + e y + f`.
    fn matrix(&self, width: f64, height: f64) -> [f64; 6] {
        let (sin, cos) = self.rotate_degrees.to_radians().sin_cos();
        let (a, b) = (cos * self.scale_x, -sin * self.scale_y);
        let (d, e) = (sin * self.scale_x, cos * self.scale_y);
        let (cx, cy) = (width / 2.0, height / 2.0);
        [
            a,
            b,
            cx + self.translate_x * width - a * cx - b * cy,
            d,
            e,
            cy + self.translate_y * height - d * cx - e * cy,
        ]
    }

    fn inverse(m: [f64; 6]) -> [f64; 6] {
        let [a, b, c, d, e, f] = m;
        let det = a * e - b * d;
        let (ia, ib, id, ie) = (e / det, -b / det, -d / det, a / det);
        [ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)]
    }
}

fn map_point(m: &[f64; 6], x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
}

/// One sampled augmentation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    FlipHorizontal,
    Brightness(f64),
    Contrast(f64),
    Grayscale(f64),
    Sharpen { alpha: f64, lightness: f64 },
    Blur(f32),
    Noise(f64),
    Affine(Affine),
}

/// Draws the steps for one variant, in the order they will run.
pub fn sample_steps<R: Rng + ?Sized>(rng: &mut R, params: &AugmentParams) -> Vec<Step> {
    let mut steps = Vec::with_capacity(8);

    if rng.random_bool(params.flip_probability) {
        steps.push(Step::FlipHorizontal);
    }
    steps.push(Step::Brightness(random::uniform_f64(
        rng,
        params.brightness_min,
        params.brightness_max,
    )));
    steps.push(Step::Contrast(random::uniform_f64(
        rng,
        params.contrast_min,
        params.contrast_max,
    )));
    steps.push(Step::Grayscale(random::uniform_f64(
        rng,
        0.0,
        params.grayscale_max,
    )));
    if rng.random_bool(params.sharpen_probability) {
        steps.push(Step::Sharpen {
            alpha: random::uniform_f64(rng, 0.0, params.sharpen_alpha_max),
            lightness: random::uniform_f64(
                rng,
                params.sharpen_lightness_min,
                params.sharpen_lightness_max,
            ),
        });
    }
    if rng.random_bool(params.blur_probability) {
        let sigma = random::uniform_f64(rng, params.blur_sigma_min, params.blur_sigma_max);
        steps.push(Step::Blur(sigma as f32));
    }
    steps.push(Step::Noise(random::uniform_f64(rng, 0.0, params.noise_max)));
    if rng.random_bool(params.affine_probability) {
        steps.push(Step::Affine(Affine::sample(rng, params)));
    }

    steps.shuffle(rng);
    steps
}

/// One augmented copy of an example.
#[derive(Clone, Debug)]
pub struct Variant {
    pub example: Example,
    /// Boxes that left the image (or shrank below one pixel) and were
    /// dropped.
    pub dropped: usize,
}

/// Draws a step sequence and applies it to a copy of `example`.
pub fn augment_example<R: Rng + ?Sized>(
    rng: &mut R,
    example: &Example,
    params: &AugmentParams,
) -> Variant {
    let steps = sample_steps(rng, params);
    apply_steps(rng, example, &steps)
}

/// Applies `steps` in order to a copy of `example`, then clips its boxes.
///
/// `rng` is only drawn from by noise steps.
pub fn apply_steps<R: Rng + ?Sized>(rng: &mut R, example: &Example, steps: &[Step]) -> Variant {
    let (width, height) = example.image.dimensions();
    let mut frame = Frame {
        image: example.image.clone(),
        boxes: example
            .annotations
            .iter()
            .map(|ann| (ann.class_id, ann.to_pixel_bbox(width, height)))
            .collect(),
    };

    trace!("augment steps: {:?}", steps);
    for step in steps {
        frame.apply(rng, *step);
    }

    frame.finish()
}

struct Frame {
    image: RgbImage,
    boxes: Vec<(ClassId, BBoxXYXY<Pixel>)>,
}

impl Frame {
    fn apply<R: Rng + ?Sized>(&mut self, rng: &mut R, step: Step) {
        match step {
            Step::FlipHorizontal => {
                imageops::flip_horizontal_in_place(&mut self.image);
                let width = self.image.width() as f64;
                for (_, bbox) in self.boxes.iter_mut() {
                    *bbox = BBoxXYXY::from_xyxy(
                        width - bbox.xmax(),
                        bbox.ymin(),
                        width - bbox.xmin(),
                        bbox.ymax(),
                    );
                }
            }
            Step::Brightness(factor) => {
                for value in self.image.iter_mut() {
                    *value = saturate(*value as f64 * factor);
                }
            }
            Step::Contrast(factor) => {
                for value in self.image.iter_mut() {
                    *value = saturate(128.0 + factor * (*value as f64 - 128.0));
                }
            }
            Step::Grayscale(alpha) => {
                for pixel in self.image.pixels_mut() {
                    let [r, g, b] = pixel.0.map(f64::from);
                    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
                    *pixel = Rgb([r, g, b].map(|v| saturate((1.0 - alpha) * v + alpha * luma)));
                }
            }
            Step::Sharpen { alpha, lightness } => {
                let center = (1.0 - alpha) + alpha * (8.0 + lightness);
                let edge = -alpha;
                let kernel =
                    [edge, edge, edge, edge, center, edge, edge, edge, edge].map(|v| v as f32);
                self.image = imageops::filter3x3(&self.image, &kernel);
            }
            Step::Blur(sigma) => {
                self.image = imageops::blur(&self.image, sigma);
            }
            Step::Noise(amplitude) => {
                if amplitude > 0.0 {
                    for pixel in self.image.pixels_mut() {
                        let noise = random::uniform_f64(rng, -amplitude, amplitude);
                        *pixel = Rgb(pixel.0.map(|v| saturate(v as f64 + noise)));
                    }
                }
            }
            Step::Affine(affine) => self.warp(&affine),
        }
    }

    fn warp(&mut self, affine: &Affine) {
        let (width, height) = self.image.dimensions();
        let forward = affine.matrix(width as f64, height as f64);
        let inverse = Affine::inverse(forward);

        let source = &self.image;
        self.image = RgbImage::from_fn(width, height, |x, y| {
            let (sx, sy) = map_point(&inverse, x as f64 + 0.5, y as f64 + 0.5);
            sample_bilinear(source, sx - 0.5, sy - 0.5)
        });

        for (_, bbox) in self.boxes.iter_mut() {
            let corners = [
                map_point(&forward, bbox.xmin(), bbox.ymin()),
                map_point(&forward, bbox.xmax(), bbox.ymin()),
                map_point(&forward, bbox.xmin(), bbox.ymax()),
                map_point(&forward, bbox.xmax(), bbox.ymax()),
            ];
            let xs = corners.map(|(x, _)| x);
            let ys = corners.map(|(_, y)| y);
            *bbox = BBoxXYXY::from_xyxy(
                xs.iter().copied().fold(f64::INFINITY, f64::min),
                ys.iter().copied().fold(f64::INFINITY, f64::min),
                xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            );
        }
    }

    fn finish(self) -> Variant {
        let (width, height) = self.image.dimensions();
        let (w, h) = (width as f64, height as f64);
        let total = self.boxes.len();

        let annotations: Vec<Annotation> = self
            .boxes
            .into_iter()
            .filter_map(|(class_id, bbox)| {
                let clipped = clip_box(&bbox, w, h)?;
                let (cx, cy, bw, bh) = clipped.to_normalized(w, h).to_cxcywh();
                Some(Annotation::new(class_id, cx, cy, bw, bh))
            })
            .collect();

        Variant {
            dropped: total - annotations.len(),
            example: Example {
                image: self.image,
                annotations,
            },
        }
    }
}

/// Clips `bbox` to `[0, width] x [0, height]`. Returns `None` when less than
/// [`MIN_BOX_SIDE`] remains on either axis.
pub fn clip_box(bbox: &BBoxXYXY<Pixel>, width: f64, height: f64) -> Option<BBoxXYXY<Pixel>> {
    let xmin = bbox.xmin().clamp(0.0, width);
    let ymin = bbox.ymin().clamp(0.0, height);
    let xmax = bbox.xmax().clamp(0.0, width);
    let ymax = bbox.ymax().clamp(0.0, height);
    if xmax - xmin < MIN_BOX_SIDE || ymax - ymin < MIN_BOX_SIDE {
        return None;
    }
    Some(BBoxXYXY::from_xyxy(xmin, ymin, xmax, ymax))
}

// Pixels outside the image read as black.
fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);

    let mut acc = [0.0f64; 3];
    for (dx, dy, weight) in [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ] {
        if weight == 0.0 {
            continue;
        }
        let (px, py) = (x0 as i64 + dx, y0 as i64 + dy);
        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
            continue;
        }
        let pixel = image.get_pixel(px as u32, py as u32);
        for (sum, v) in acc.iter_mut().zip(pixel.0) {
            *sum += weight * v as f64;
        }
    }

    Rgb(acc.map(saturate))
}
