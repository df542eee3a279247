//! Synthdet: synthetic object-detection data generator.
//!
//! Synthdet builds detection training sets by compositing object cut-outs
//! onto background photographs. Each object is scaled relative to the
//! background, photometrically augmented and pasted at a random spot; pure
//! white (255, 255, 255) pixels of the cut-out are treated as transparent. Every paste
//! yields a normalized YOLO bounding box.
//!
//! # Modules
//!
//! - [`ir`]: Data model (assets, placements, annotations) and file I/O
//! - [`scale`]: Aspect-preserving object scaling
//! - [`photometric`]: Linear and gamma intensity transforms
//! - [`composite`]: Masked overlay and annotation encoding
//! - [`augment`]: Box-aware augmentation of finished composites
//! - [`generate`]: Example generation and run reports
//! - [`validation`]: Checks for generated output directories
//! - [`error`]: Error types for synthdet operations

pub mod augment;
pub mod composite;
pub mod error;
pub mod generate;
pub mod ir;
pub mod photometric;
mod random;
pub mod scale;
pub mod validation;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

pub use error::SynthError;

use generate::GenerateOptions;
use ir::io_yolo::{self, ImageEncoding, YoloWriter};

/// The synthdet CLI application.
#[derive(Parser)]
#[command(name = "synthdet")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Only log warnings and errors, and hide the progress bar.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic YOLO dataset.
    Generate(GenerateArgs),
    /// Validate a generated output directory.
    Validate(ValidateArgs),
}

/// Arguments for the generate subcommand.
///
/// Unset options fall back to the recipe (when given), then to the built-in
/// defaults.
#[derive(clap::Args)]
struct GenerateArgs {
    /// Directory of object cut-outs on a white backdrop.
    #[arg(long)]
    objects: PathBuf,

    /// Directory of background images.
    #[arg(long)]
    backgrounds: PathBuf,

    /// Output directory (created if missing).
    #[arg(long, short)]
    output: PathBuf,

    /// YAML recipe with generation options.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of examples to generate [default: 1500].
    #[arg(long = "count", short = 'n')]
    count: Option<usize>,

    /// Minimum objects per example [default: 0].
    #[arg(long)]
    min_objects: Option<usize>,

    /// Maximum objects per example [default: 4].
    #[arg(long)]
    max_objects: Option<usize>,

    /// Smallest object long side, as a fraction of the background's shorter side [default: 0.1].
    #[arg(long)]
    scale_min: Option<f64>,

    /// Largest object long side, as a fraction of the background's shorter side [default: 0.5].
    #[arg(long)]
    scale_max: Option<f64>,

    /// Random seed. Unseeded runs draw from OS entropy.
    #[arg(long, env = "SYNTHDET_SEED")]
    seed: Option<u64>,

    /// Augmented copies to write per example; 0 disables augmentation [default: 0].
    #[arg(long = "augment", value_name = "N")]
    augment: Option<usize>,

    /// Worker threads [default: 1].
    #[arg(long, short)]
    jobs: Option<usize>,

    /// File name prefix for generated examples.
    #[arg(long, default_value = "example")]
    prefix: String,

    /// Image format for composites ('png', 'jpg', or 'bmp').
    #[arg(long, default_value = "png")]
    image_format: String,

    /// Class names, one per line, in class id order.
    #[arg(long, value_name = "FILE")]
    class_names: Option<PathBuf>,

    /// Output format for the run report ('text' or 'json').
    #[arg(long, default_value = "text")]
    report: String,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Generated output directory to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the synthdet CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), SynthError> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Some(Commands::Generate(args)) => run_generate(args, cli.quiet),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("synthdet {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Synthetic object-detection data generator.");
            println!();
            println!("Run 'synthdet --help' for usage information.");
            Ok(())
        }
    }
}

impl GenerateArgs {
    /// Layers the CLI flags over the recipe (or the defaults).
    fn options(&self) -> Result<GenerateOptions, SynthError> {
        let mut opts = match &self.config {
            Some(path) => generate::load_recipe(path)?,
            None => GenerateOptions::default(),
        };

        if let Some(count) = self.count {
            opts.count = count;
        }
        if let Some(min) = self.min_objects {
            opts.min_objects = min;
        }
        if let Some(max) = self.max_objects {
            opts.max_objects = max;
        }
        if let Some(min) = self.scale_min {
            opts.scale.min = min;
        }
        if let Some(max) = self.scale_max {
            opts.scale.max = max;
        }
        if self.seed.is_some() {
            opts.seed = self.seed;
        }
        if let Some(variants) = self.augment {
            opts.augment.variants = variants;
        }
        if let Some(jobs) = self.jobs {
            opts.jobs = jobs;
        }

        Ok(opts)
    }
}

/// Execute the generate subcommand.
fn run_generate(args: GenerateArgs, quiet: bool) -> Result<(), SynthError> {
    let opts = args.options()?;
    generate::validate_generate_options(&opts)?;

    if !matches!(args.report.as_str(), "text" | "json") {
        return Err(SynthError::UnsupportedFormat(format!(
            "'{}' (supported report formats: text, json)",
            args.report
        )));
    }
    let encoding = ImageEncoding::from_name(&args.image_format)?;

    let objects = ir::io_assets::load_objects(&args.objects)?;
    let backgrounds = ir::io_assets::load_backgrounds(&args.backgrounds)?;
    info!(
        "loaded {} object(s) and {} background(s)",
        objects.len(),
        backgrounds.len()
    );

    let writer = YoloWriter::create(&args.output, args.prefix.as_str(), encoding)?;
    info!(
        "generating {} example(s) into {}",
        opts.count,
        args.output.display()
    );

    let progress = progress_bar(opts.count as u64, quiet);
    let mut report =
        generate::generate_dataset(&objects, &backgrounds, &opts, |index, generated| {
            writer.write_example(index, &generated.example)?;
            for (variant, example) in generated.variants.iter().enumerate() {
                writer.write_variant(index, variant, example)?;
            }
            progress.inc(1);
            Ok(())
        })?;
    progress.finish_and_clear();

    writer.write_manifest(opts.count, opts.augment.variants)?;
    let max_class = objects.iter().map(|object| object.class_id).max();
    let names = io_yolo::class_names(max_class, args.class_names.as_deref())?;
    writer.write_data_yaml(&names)?;

    report.output_dir = Some(args.output.display().to_string());
    info!(
        "wrote {} example(s) with {} object(s)",
        report.examples, report.objects_placed
    );

    match args.report.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report).map_err(SynthError::ReportSerialize)?;
            println!("{}", json);
        }
        _ => print!("{}", report),
    }

    Ok(())
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [Generate] [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), SynthError> {
    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_output_dir(&args.input)?;

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "error_count": report.error_count(),
                "warning_count": report.warning_count(),
                "label_files": report.label_files,
                "annotations": report.annotations,
                "issues": report.issues,
            }))
            .map_err(SynthError::ReportSerialize)?;
            println!("{}", json);
        }
        "text" => print!("{}", report),
        other => {
            return Err(SynthError::UnsupportedFormat(format!(
                "'{}' (supported report formats: text, json)",
                other
            )));
        }
    }

    if opts.fails(&report) {
        Err(SynthError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}
