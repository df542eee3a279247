#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

pub fn write_png(path: &Path, image: &RgbImage) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    image.save(path).expect("write png file");
}

/// A cut-out on a white backdrop: a solid block of `color` with a white
/// border of `border` pixels.
pub fn object_image(width: u32, height: u32, border: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = x >= border && y >= border && x + border < width && y + border < height;
        if inside {
            Rgb(color)
        } else {
            Rgb([255, 255, 255])
        }
    })
}

/// A background with a horizontal gradient, so pasted regions are easy to
/// tell apart from untouched ones.
pub fn background_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        let v = (x * 200 / width.max(1)) as u8;
        Rgb([v, 60, 90])
    })
}

pub struct Pools {
    pub objects: PathBuf,
    pub backgrounds: PathBuf,
}

/// Writes a small object pool (classes 0, 1 and 2) and two backgrounds under
/// `root`.
pub fn write_pools(root: &Path) -> Pools {
    let objects = root.join("objects");
    let backgrounds = root.join("backgrounds");

    write_png(
        &objects.join("0").join("box.png"),
        &object_image(40, 24, 4, [200, 30, 30]),
    );
    write_png(
        &objects.join("1").join("tall.png"),
        &object_image(12, 36, 2, [30, 180, 40]),
    );
    write_png(
        &objects.join("mug_2.png"),
        &object_image(30, 30, 3, [20, 20, 160]),
    );

    write_png(&backgrounds.join("wide.png"), &background_image(160, 96));
    write_png(&backgrounds.join("tall.png"), &background_image(90, 140));

    Pools {
        objects,
        backgrounds,
    }
}
