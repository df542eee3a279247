//! Output directory validation.
//!
//! Checks a generated YOLO tree for:
//! - Structural integrity (every label file has an image and vice versa)
//! - Label syntax (five tokens, integer class, float fields)
//! - Geometric validity (finite, normalized, positive-area boxes inside the image)
//! - Class coverage (every class id has a name in `data.yaml`)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::SynthError;
use crate::ir::io_assets::IMAGE_EXTENSIONS;
use crate::ir::io_yolo::{self, DATA_YAML_FILE, LABEL_EXTENSION};
use crate::ir::Annotation;

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

impl ValidateOptions {
    /// Whether `report` should fail the run under these options.
    pub fn fails(&self, report: &ValidationReport) -> bool {
        !report.is_ok() || (self.strict && report.warning_count() > 0)
    }
}

// Slack for values written with six decimals.
const TOLERANCE: f64 = 1e-6;

/// Validates a generated output directory and returns a report of all
/// issues found.
///
/// Fails outright only when the directory layout itself is missing; every
/// problem inside label files is recorded as an issue. Whether the report
/// fails a run is decided by [`ValidateOptions::fails`].
pub fn validate_output_dir(root: &Path) -> Result<ValidationReport, SynthError> {
    let images_dir = root.join("images");
    let labels_dir = root.join("labels");
    for dir in [&images_dir, &labels_dir] {
        if !dir.is_dir() {
            return Err(SynthError::AssetDirInvalid {
                path: dir.clone(),
                message: "expected a generated output directory with images/ and labels/"
                    .to_string(),
            });
        }
    }

    let mut report = ValidationReport::new();

    let images = files_by_stem(&images_dir, |path| {
        has_any_extension(path, &IMAGE_EXTENSIONS)
    })?;
    let labels = files_by_stem(&labels_dir, |path| {
        has_any_extension(path, &[LABEL_EXTENSION])
    })?;

    let class_names = load_class_names(root, &mut report);

    for (stem, label_path) in &labels {
        let display = rel_string(root, label_path);
        if !images.contains_key(stem) {
            report.add(ValidationIssue::error(
                IssueCode::LabelWithoutImage,
                format!("No image named '{}' in images/", stem),
                IssueContext::File {
                    path: display.clone(),
                },
            ));
        }

        report.label_files += 1;
        validate_label_file(label_path, &display, class_names.as_deref(), &mut report)?;
    }

    for (stem, image_path) in &images {
        if !labels.contains_key(stem) {
            report.add(ValidationIssue::warning(
                IssueCode::MissingLabelFile,
                format!("No label file '{}.{}' in labels/", stem, LABEL_EXTENSION),
                IssueContext::File {
                    path: rel_string(root, image_path),
                },
            ));
        }
    }

    debug!(
        "validated {} label file(s) and {} image(s) under {}",
        labels.len(),
        images.len(),
        root.display()
    );

    Ok(report)
}

fn load_class_names(root: &Path, report: &mut ValidationReport) -> Option<Vec<String>> {
    let path = root.join(DATA_YAML_FILE);
    if !path.is_file() {
        report.add(ValidationIssue::warning(
            IssueCode::UnknownClass,
            "data.yaml not found; class ids cannot be checked",
            IssueContext::Dataset,
        ));
        return None;
    }

    match io_yolo::read_data_yaml_names(&path) {
        Ok(names) => Some(names),
        Err(err) => {
            report.add(ValidationIssue::warning(
                IssueCode::UnknownClass,
                format!("data.yaml is unreadable ({}); class ids cannot be checked", err),
                IssueContext::File {
                    path: DATA_YAML_FILE.to_string(),
                },
            ));
            None
        }
    }
}

fn validate_label_file(
    path: &Path,
    display: &str,
    class_names: Option<&[String]>,
    report: &mut ValidationReport,
) -> Result<(), SynthError> {
    let content = fs::read_to_string(path).map_err(SynthError::Io)?;

    for (line_idx, line) in content.lines().enumerate() {
        let line_num = line_idx + 1;
        let context = IssueContext::Line {
            path: display.to_string(),
            line: line_num,
        };

        match io_yolo::parse_label_line(line, path, line_num) {
            Ok(Some(annotation)) => {
                report.annotations += 1;
                validate_annotation(&annotation, class_names, context, report);
            }
            Ok(None) => {}
            Err(SynthError::LabelParse { message, .. }) => {
                report.add(ValidationIssue::error(
                    IssueCode::LabelParse,
                    message,
                    context,
                ));
            }
            Err(other) => return Err(other),
        }
    }

    Ok(())
}

fn validate_annotation(
    annotation: &Annotation,
    class_names: Option<&[String]>,
    context: IssueContext,
    report: &mut ValidationReport,
) {
    let fields = [
        ("x_center", annotation.center_x),
        ("y_center", annotation.center_y),
        ("width", annotation.width),
        ("height", annotation.height),
    ];

    if let Some((name, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
        report.add(ValidationIssue::error(
            IssueCode::BBoxNotFinite,
            format!("Non-finite {}: {}", name, value),
            context,
        ));
        return;
    }

    for (name, value) in fields {
        if !(-TOLERANCE..=1.0 + TOLERANCE).contains(&value) {
            report.add(ValidationIssue::error(
                IssueCode::ValueOutOfRange,
                format!("{} {} is outside [0, 1]", name, value),
                context.clone(),
            ));
        }
    }

    if annotation.width <= 0.0 || annotation.height <= 0.0 {
        report.add(ValidationIssue::error(
            IssueCode::InvalidBBoxArea,
            format!(
                "Zero or negative size: {}x{}",
                annotation.width, annotation.height
            ),
            context.clone(),
        ));
    }

    let bbox = annotation.bbox();
    if !bbox.is_within(1.0, 1.0, TOLERANCE) {
        report.add(ValidationIssue::error(
            IssueCode::BBoxOutOfBounds,
            format!(
                "Box ({:.6}, {:.6}, {:.6}, {:.6}) extends outside the image",
                bbox.xmin(),
                bbox.ymin(),
                bbox.xmax(),
                bbox.ymax()
            ),
            context.clone(),
        ));
    }

    if let Some(names) = class_names {
        if annotation.class_id.index() >= names.len() {
            report.add(ValidationIssue::warning(
                IssueCode::UnknownClass,
                format!(
                    "Class {} has no name in data.yaml ({} class(es) listed)",
                    annotation.class_id,
                    names.len()
                ),
                context,
            ));
        }
    }
}

fn files_by_stem(
    dir: &Path,
    keep: impl Fn(&Path) -> bool,
) -> Result<BTreeMap<String, PathBuf>, SynthError> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(SynthError::Io)? {
        let path = entry.map_err(SynthError::Io)?.path();
        if !path.is_file() || !keep(&path) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            files.insert(stem.to_string(), path.clone());
        }
    }
    Ok(files)
}

fn has_any_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
