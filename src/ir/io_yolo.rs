//! Ultralytics-style YOLO output.
//!
//! Generated examples are written as an `images/` + `labels/` tree with one
//! label file per image, plus `data.yaml` (class names) and `train.txt`
//! (one image path per line). Label files use one
//! `class cx cy w h` line per object, coordinates normalized to the image
//! size, and may be empty.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::warn;
use serde::Deserialize;

use super::{Annotation, ClassId, Example};
use crate::error::SynthError;

pub const LABEL_EXTENSION: &str = "txt";
pub const MANIFEST_FILE: &str = "train.txt";
pub const DATA_YAML_FILE: &str = "data.yaml";
/// File name prefix of augmented variants.
pub const AUGMENTED_PREFIX: &str = "aug_";

/// Encoding used for composite images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageEncoding {
    Png,
    Jpeg,
    Bmp,
}

impl ImageEncoding {
    /// Parse a CLI format name.
    pub fn from_name(name: &str) -> Result<Self, SynthError> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageEncoding::Png),
            "jpg" | "jpeg" => Ok(ImageEncoding::Jpeg),
            "bmp" => Ok(ImageEncoding::Bmp),
            other => Err(SynthError::UnsupportedFormat(format!(
                "'{}' (supported image formats: png, jpg, bmp)",
                other
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Png => "png",
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Bmp => "bmp",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageEncoding::Png => ImageFormat::Png,
            ImageEncoding::Jpeg => ImageFormat::Jpeg,
            ImageEncoding::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Writes generated examples into a YOLO directory.
#[derive(Clone, Debug)]
pub struct YoloWriter {
    root: PathBuf,
    images_dir: PathBuf,
    labels_dir: PathBuf,
    prefix: String,
    encoding: ImageEncoding,
}

impl YoloWriter {
    /// Creates the output layout under `root`.
    pub fn create(
        root: &Path,
        prefix: impl Into<String>,
        encoding: ImageEncoding,
    ) -> Result<Self, SynthError> {
        let images_dir = root.join("images");
        let labels_dir = root.join("labels");
        fs::create_dir_all(&images_dir).map_err(SynthError::Io)?;
        fs::create_dir_all(&labels_dir).map_err(SynthError::Io)?;

        Ok(Self {
            root: root.to_path_buf(),
            images_dir,
            labels_dir,
            prefix: prefix.into(),
            encoding,
        })
    }

    // File names are assembled whole: `Path::with_extension` would cut a
    // dotted prefix at its last dot.
    fn stem(&self, index: usize, variant: Option<usize>) -> String {
        match variant {
            None => format!("{}_{}", self.prefix, index),
            Some(k) => format!("{}{}_{}_{}", AUGMENTED_PREFIX, self.prefix, index, k),
        }
    }

    fn image_file(&self, index: usize, variant: Option<usize>) -> PathBuf {
        self.images_dir.join(format!(
            "{}.{}",
            self.stem(index, variant),
            self.encoding.extension()
        ))
    }

    fn label_file(&self, index: usize, variant: Option<usize>) -> PathBuf {
        self.labels_dir
            .join(format!("{}.{}", self.stem(index, variant), LABEL_EXTENSION))
    }

    pub fn image_path(&self, index: usize) -> PathBuf {
        self.image_file(index, None)
    }

    pub fn label_path(&self, index: usize) -> PathBuf {
        self.label_file(index, None)
    }

    /// Image path of augmented variant `variant` of example `index`.
    pub fn variant_image_path(&self, index: usize, variant: usize) -> PathBuf {
        self.image_file(index, Some(variant))
    }

    pub fn variant_label_path(&self, index: usize, variant: usize) -> PathBuf {
        self.label_file(index, Some(variant))
    }

    /// Writes the composite image and its label file.
    pub fn write_example(&self, index: usize, example: &Example) -> Result<(), SynthError> {
        self.write_pair(&self.image_path(index), &self.label_path(index), example)
    }

    /// Writes augmented variant `variant` of example `index`.
    pub fn write_variant(
        &self,
        index: usize,
        variant: usize,
        example: &Example,
    ) -> Result<(), SynthError> {
        self.write_pair(
            &self.variant_image_path(index, variant),
            &self.variant_label_path(index, variant),
            example,
        )
    }

    fn write_pair(
        &self,
        image_path: &Path,
        label_path: &Path,
        example: &Example,
    ) -> Result<(), SynthError> {
        example
            .image
            .save_with_format(image_path, self.encoding.format())
            .map_err(|source| SynthError::ImageEncode {
                path: image_path.to_path_buf(),
                source,
            })?;

        write_label_file(label_path, &example.annotations)
    }

    /// Writes `train.txt` listing the first `count` images, each followed by
    /// its `variants` augmented copies, relative to the output root.
    pub fn write_manifest(&self, count: usize, variants: usize) -> Result<PathBuf, SynthError> {
        let path = self.root.join(MANIFEST_FILE);
        let mut out = BufWriter::new(fs::File::create(&path).map_err(SynthError::Io)?);
        for index in 0..count {
            let image_path = self.image_path(index);
            writeln!(out, "{}", rel_string(&self.root, &image_path)).map_err(SynthError::Io)?;
            for variant in 0..variants {
                let image_path = self.variant_image_path(index, variant);
                writeln!(out, "{}", rel_string(&self.root, &image_path))
                    .map_err(SynthError::Io)?;
            }
        }
        out.flush().map_err(SynthError::Io)?;
        Ok(path)
    }

    /// Writes `data.yaml` with the class-name table.
    pub fn write_data_yaml(&self, names: &[String]) -> Result<(), SynthError> {
        let mut yaml = format!("train: {}\nnc: {}\nnames:\n", MANIFEST_FILE, names.len());
        for (idx, name) in names.iter().enumerate() {
            yaml.push_str(&format!("  {}: {}\n", idx, yaml_single_quoted(name)));
        }

        fs::write(self.root.join(DATA_YAML_FILE), yaml).map_err(SynthError::Io)
    }
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

#[derive(Debug, Deserialize)]
struct DataYaml {
    names: DataYamlNames,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

/// Reads the class-name table from a `data.yaml` file.
///
/// Accepts both the list form and the `index: name` mapping form. Gaps in a
/// mapping are filled with `class_<id>`.
pub fn read_data_yaml_names(path: &Path) -> Result<Vec<String>, SynthError> {
    let data = fs::read_to_string(path).map_err(SynthError::Io)?;
    let parsed: DataYaml =
        serde_yaml::from_str(&data).map_err(|source| SynthError::DataYamlParse {
            path: path.to_path_buf(),
            source,
        })?;

    let names = match parsed.names {
        DataYamlNames::Sequence(names) => names,
        DataYamlNames::Mapping(mapping) => {
            let len = mapping.keys().next_back().map(|max| max + 1).unwrap_or(0);
            (0..len)
                .map(|index| {
                    mapping
                        .get(&index)
                        .cloned()
                        .unwrap_or_else(|| format!("class_{}", index))
                })
                .collect()
        }
    };

    Ok(names)
}

/// Writes one label line per annotation, newline-terminated. Zero
/// annotations produce an empty file.
pub fn write_label_file(path: &Path, annotations: &[Annotation]) -> Result<(), SynthError> {
    let mut out = BufWriter::new(fs::File::create(path).map_err(SynthError::Io)?);
    for ann in annotations {
        writeln!(out, "{}", ann).map_err(SynthError::Io)?;
    }
    out.flush().map_err(SynthError::Io)
}

/// Reads a label file back into annotations, skipping blank lines.
pub fn read_label_file(path: &Path) -> Result<Vec<Annotation>, SynthError> {
    let content = fs::read_to_string(path).map_err(SynthError::Io)?;
    let mut annotations = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if let Some(ann) = parse_label_line(line, path, line_idx + 1)? {
            annotations.push(ann);
        }
    }
    Ok(annotations)
}

/// Builds the class-name table covering ids `0..=max_class`.
///
/// Names come from `names_file` (one per line) when given; ids without a
/// name in the file fall back to `class_<id>`.
pub fn class_names(
    max_class: Option<ClassId>,
    names_file: Option<&Path>,
) -> Result<Vec<String>, SynthError> {
    let mut names: Vec<String> = match names_file {
        Some(path) => fs::read_to_string(path)
            .map_err(SynthError::Io)?
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        None => Vec::new(),
    };

    let needed = max_class.map(|id| id.index() + 1).unwrap_or(0);
    if names_file.is_some() && names.len() < needed {
        warn!(
            "class names file lists {} name(s) but class ids go up to {}",
            names.len(),
            needed - 1
        );
    }
    while names.len() < needed {
        names.push(format!("class_{}", names.len()));
    }

    Ok(names)
}

pub(crate) fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<Annotation>, SynthError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 6 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();

    if tokens.len() < 5 {
        return Err(SynthError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("expected 5 tokens, found {}", tokens.len()),
        });
    }

    if tokens.len() > 5 {
        return Err(SynthError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: "expected 5 tokens; segmentation/pose rows are not produced by synthdet"
                .to_string(),
        });
    }

    let class_id = tokens[0]
        .parse::<ClassId>()
        .map_err(|_| SynthError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class_id '{}'; expected non-negative integer",
                tokens[0]
            ),
        })?;

    let cx = parse_f64_token(tokens[1], "x_center", file_path, line_num)?;
    let cy = parse_f64_token(tokens[2], "y_center", file_path, line_num)?;
    let w = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let h = parse_f64_token(tokens[4], "height", file_path, line_num)?;

    Ok(Some(Annotation::new(class_id, cx, cy, w, h)))
}

/// Fuzz-only entrypoint for YOLO single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), SynthError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, SynthError> {
    raw.parse::<f64>().map_err(|_| SynthError::LabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message: format!("invalid {field_name} '{raw}'; expected floating-point number"),
    })
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
