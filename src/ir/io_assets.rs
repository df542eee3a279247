//! Asset pool loading.
//!
//! Object and background pools are directory trees of image files. Files are
//! collected recursively, sorted by their path relative to the pool root (so
//! a seeded run always sees the same pool order) and decoded to RGB8.
//!
//! Object class ids are resolved here, once, from the file's location:
//!
//! 1. the nearest parent directory below the pool root whose name is an
//!    integer (`objects/3/mug.png` has class 3), otherwise
//! 2. the digits after the last `_` or `-` of the file stem
//!    (`objects/mug_03.png` has class 3).

use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, warn};
use walkdir::WalkDir;

use super::{BackgroundAsset, ClassId, ObjectAsset};
use crate::error::SynthError;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "png", "jpeg", "bmp", "webp"];

/// Load every object image under `root`, attaching class ids.
pub fn load_objects(root: &Path) -> Result<Vec<ObjectAsset>, SynthError> {
    let files = collect_image_files(root)?;
    if files.is_empty() {
        return Err(SynthError::AssetDirInvalid {
            path: root.to_path_buf(),
            message: "no object images found".to_string(),
        });
    }

    let mut objects = Vec::with_capacity(files.len());
    for path in files {
        let class_id = resolve_class_id(root, &path)
            .ok_or_else(|| SynthError::ClassIdMissing { path: path.clone() })?;
        let image = decode_rgb(&path)?;
        debug!(
            "object {} -> class {} ({}x{})",
            rel_string(root, &path),
            class_id,
            image.width(),
            image.height()
        );
        objects.push(ObjectAsset::new(image, class_id));
    }

    Ok(objects)
}

/// Load every background image under `root`.
pub fn load_backgrounds(root: &Path) -> Result<Vec<BackgroundAsset>, SynthError> {
    let files = collect_image_files(root)?;
    if files.is_empty() {
        return Err(SynthError::AssetDirInvalid {
            path: root.to_path_buf(),
            message: "no background images found".to_string(),
        });
    }

    files
        .iter()
        .map(|path| decode_rgb(path).map(BackgroundAsset::new))
        .collect()
}

/// Resolve the class id of an object image from its location under `root`.
pub fn resolve_class_id(root: &Path, path: &Path) -> Option<ClassId> {
    let rel = path.strip_prefix(root).unwrap_or(path);

    let from_dir = rel
        .parent()
        .into_iter()
        .flat_map(|parent| parent.components().rev())
        .filter_map(|component| component.as_os_str().to_str())
        .find_map(|name| name.parse::<ClassId>().ok());
    if from_dir.is_some() {
        return from_dir;
    }

    let stem = rel.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once(['_', '-'])?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<ClassId>().ok()
}

fn decode_rgb(path: &Path) -> Result<RgbImage, SynthError> {
    let image = image::open(path)
        .map_err(|source| SynthError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgb8();

    if image.width() == 0 || image.height() == 0 {
        return Err(SynthError::ZeroSizedAsset {
            path: path.to_path_buf(),
        });
    }

    Ok(image)
}

fn collect_image_files(root: &Path) -> Result<Vec<PathBuf>, SynthError> {
    if !root.is_dir() {
        return Err(SynthError::AssetDirInvalid {
            path: root.to_path_buf(),
            message: "input must be a directory".to_string(),
        });
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| SynthError::AssetDirInvalid {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), &IMAGE_EXTENSIONS) {
            files.push(entry.path().to_path_buf());
        } else {
            warn!("skipping non-image file {}", entry.path().display());
        }
    }

    files.sort_by_cached_key(|path| rel_string(root, path));
    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
