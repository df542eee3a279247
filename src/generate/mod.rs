//! Synthetic example generation.
//!
//! Each example starts from a uniformly drawn background and receives a
//! uniformly drawn number of objects, each drawn with replacement from the
//! object pool, scaled, augmented and pasted in turn:
//!
//! ```text
//! background -> { object -> scale -> augment -> composite -> annotate } x K
//!            -> { flip / jitter / blur / noise / affine } x V -> emit
//! ```
//!
//! The second stage is optional: with `augment.variants > 0`, every finished
//! composite also yields that many augmented copies whose boxes follow the
//! geometric steps.
//!
//! Examples are independent. Every example gets its own random stream whose
//! seed is drawn from the run's master stream, so a seeded run produces the
//! same dataset whether it runs on one worker or many.

mod report;

pub use report::{ClassCount, GenerateReport, ModeCounts};

use std::path::Path;

use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::Deserialize;

use crate::augment::{self, AugmentParams};
use crate::composite::{self, PlacedObject};
use crate::error::SynthError;
use crate::ir::{BackgroundAsset, Example, ObjectAsset};
use crate::photometric::PhotometricParams;
use crate::random;
use crate::scale::{self, ScaleRange};
use report::ExampleSummary;

/// Generation options.
///
/// Also the schema of a YAML generation recipe; missing fields keep their
/// defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateOptions {
    /// Number of examples to generate.
    pub count: usize,
    /// Minimum number of objects per example (inclusive).
    pub min_objects: usize,
    /// Maximum number of objects per example (inclusive).
    pub max_objects: usize,
    /// Object long side as a fraction of the background's shorter side.
    pub scale: ScaleRange,
    /// Photometric sampling ranges.
    pub photometric: PhotometricParams,
    /// Post-composite augmentation of finished examples.
    pub augment: AugmentParams,
    /// Master seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Number of worker threads. 1 generates sequentially.
    pub jobs: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            count: 1500,
            min_objects: 0,
            max_objects: 4,
            scale: ScaleRange::default(),
            photometric: PhotometricParams::default(),
            augment: AugmentParams::default(),
            seed: None,
            jobs: 1,
        }
    }
}

/// Reads generation options from a YAML recipe.
pub fn load_recipe(path: &Path) -> Result<GenerateOptions, SynthError> {
    let data = std::fs::read_to_string(path).map_err(SynthError::Io)?;
    serde_yaml::from_str(&data).map_err(|source| SynthError::RecipeParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate generation options before running.
pub fn validate_generate_options(opts: &GenerateOptions) -> Result<(), SynthError> {
    if opts.min_objects > opts.max_objects {
        return Err(SynthError::InvalidGenerateParams {
            message: format!(
                "--min-objects ({}) must not exceed --max-objects ({})",
                opts.min_objects, opts.max_objects
            ),
        });
    }

    if opts.jobs == 0 {
        return Err(SynthError::InvalidGenerateParams {
            message: "--jobs must be greater than 0".to_string(),
        });
    }

    opts.scale.validate()?;
    opts.photometric.validate()?;
    opts.augment.validate()?;

    Ok(())
}

fn check_pools(
    objects: &[ObjectAsset],
    backgrounds: &[BackgroundAsset],
    opts: &GenerateOptions,
) -> Result<(), SynthError> {
    if backgrounds.is_empty() {
        return Err(SynthError::EmptyAssetPool { kind: "background" });
    }
    if objects.is_empty() && opts.max_objects > 0 {
        return Err(SynthError::EmptyAssetPool { kind: "object" });
    }
    Ok(())
}

/// Generate a single example from the given pools.
pub fn generate_example<R: Rng + ?Sized>(
    rng: &mut R,
    objects: &[ObjectAsset],
    backgrounds: &[BackgroundAsset],
    opts: &GenerateOptions,
) -> Result<Example, SynthError> {
    validate_generate_options(opts)?;
    check_pools(objects, backgrounds, opts)?;
    generate_example_traced(rng, objects, backgrounds, opts).map(|(example, _)| example)
}

fn generate_example_traced<R: Rng + ?Sized>(
    rng: &mut R,
    objects: &[ObjectAsset],
    backgrounds: &[BackgroundAsset],
    opts: &GenerateOptions,
) -> Result<(Example, Vec<PlacedObject>), SynthError> {
    let background_index = random::uniform_index(rng, backgrounds.len());
    let mut canvas = backgrounds[background_index].image.clone();
    let (width, height) = canvas.dimensions();

    let count = random::uniform_count(rng, opts.min_objects, opts.max_objects);
    let mut placed = Vec::with_capacity(count);

    for _ in 0..count {
        let object = &objects[random::uniform_index(rng, objects.len())];
        let long_side = scale::sample_long_side(rng, width, height, &opts.scale)?;
        let scaled = scale::resize_to_long_side(&object.image, long_side)?;
        let result =
            composite::paste_object(rng, &mut canvas, &scaled, object.class_id, &opts.photometric)?;

        debug!(
            "placed class {} at ({}, {}) size {}x{} [{:?}]",
            object.class_id,
            result.placement.offset_x,
            result.placement.offset_y,
            result.placement.width,
            result.placement.height,
            result.mode
        );
        placed.push(result);
    }

    let example = Example {
        image: canvas,
        annotations: placed.iter().map(|p| p.annotation).collect(),
    };
    Ok((example, placed))
}

/// A finished composite and its augmented copies.
#[derive(Clone, Debug)]
pub struct GeneratedExample {
    pub example: Example,
    /// `opts.augment.variants` copies, empty when augmentation is off.
    pub variants: Vec<Example>,
}

/// Generate `opts.count` examples and hand each to `sink` with its index.
///
/// The sink may be called from several threads when `opts.jobs > 1`, in no
/// particular order. The first error from generation or from the sink
/// aborts the run.
pub fn generate_dataset<F>(
    objects: &[ObjectAsset],
    backgrounds: &[BackgroundAsset],
    opts: &GenerateOptions,
    sink: F,
) -> Result<GenerateReport, SynthError>
where
    F: Fn(usize, GeneratedExample) -> Result<(), SynthError> + Sync,
{
    validate_generate_options(opts)?;
    check_pools(objects, backgrounds, opts)?;

    let mut master = random::master_rng(opts.seed);
    let seeds = random::derive_seeds(&mut master, opts.count);

    let run_one = |index: usize, seed: u64| -> Result<ExampleSummary, SynthError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (example, placed) = generate_example_traced(&mut rng, objects, backgrounds, opts)?;
        debug!("example {} has {} object(s)", index, placed.len());

        let mut summary = ExampleSummary::from_placed(&placed);
        let mut variants = Vec::with_capacity(opts.augment.variants);
        for _ in 0..opts.augment.variants {
            let variant = augment::augment_example(&mut rng, &example, &opts.augment);
            summary.dropped_boxes += variant.dropped;
            variants.push(variant.example);
        }
        summary.variants = variants.len();

        sink(index, GeneratedExample { example, variants })?;
        Ok(summary)
    };

    let summaries: Vec<ExampleSummary> = if opts.jobs == 1 {
        seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| run_one(index, *seed))
            .collect::<Result<_, _>>()?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.jobs)
            .build()
            .map_err(|err| SynthError::InvalidGenerateParams {
                message: format!("failed to start {} worker threads: {err}", opts.jobs),
            })?;
        pool.install(|| {
            seeds
                .par_iter()
                .enumerate()
                .map(|(index, seed)| run_one(index, *seed))
                .collect::<Result<_, _>>()
        })?
    };

    Ok(GenerateReport::from_summaries(&summaries, opts.seed))
}
