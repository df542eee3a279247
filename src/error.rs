use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for synthdet operations.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid asset directory {path}: {message}")]
    AssetDirInvalid { path: PathBuf, message: String },

    #[error("The {kind} pool is empty")]
    EmptyAssetPool { kind: &'static str },

    #[error("Cannot determine class id for object image {path}: expected a numeric class directory or a '_<id>' file name suffix")]
    ClassIdMissing { path: PathBuf },

    #[error("Image {path} has zero width or height")]
    ZeroSizedAsset { path: PathBuf },

    #[error("Object of {object_width}x{object_height} does not fit on background of {background_width}x{background_height}")]
    ObjectTooLarge {
        object_width: u32,
        object_height: u32,
        background_width: u32,
        background_height: u32,
    },

    #[error("Degenerate object size: {message}")]
    DegenerateObject { message: String },

    #[error("Invalid generate parameters: {message}")]
    InvalidGenerateParams { message: String },

    #[error("Failed to read generation recipe {path}: {source}")]
    RecipeParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read data.yaml {path}: {source}")]
    DataYamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse label file {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[source] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
