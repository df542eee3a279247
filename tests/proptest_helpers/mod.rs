#![allow(dead_code)]

use image::{Rgb, RgbImage};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use synthdet::photometric::PhotometricTransform;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Canvas and object dimensions where the object always fits.
pub fn arb_fitting_sizes() -> BoxedStrategy<((u32, u32), (u32, u32))> {
    (1u32..=96, 1u32..=96)
        .prop_flat_map(|(cw, ch)| ((Just(cw), Just(ch)), (1u32..=cw, 1u32..=ch)))
        .boxed()
}

/// Small images with a mix of sentinel-white and colored pixels.
pub fn arb_object_image(max_side: u32) -> BoxedStrategy<RgbImage> {
    (1u32..=max_side, 1u32..=max_side)
        .prop_flat_map(|(w, h)| {
            let len = (w * h) as usize;
            (
                Just(w),
                Just(h),
                proptest::collection::vec((any::<bool>(), any::<[u8; 3]>()), len..=len),
            )
        })
        .prop_map(|(w, h, pixels)| {
            RgbImage::from_fn(w, h, |x, y| {
                let (white, color) = pixels[(y * w + x) as usize];
                if white {
                    Rgb([255, 255, 255])
                } else {
                    Rgb(color)
                }
            })
        })
        .boxed()
}

pub fn arb_transform() -> BoxedStrategy<PhotometricTransform> {
    prop_oneof![
        (0.5f64..1.5, -40i32..=40).prop_map(|(alpha, beta)| PhotometricTransform::linear(alpha, beta)),
        (0.5f64..1.5).prop_map(PhotometricTransform::gamma),
    ]
    .boxed()
}
