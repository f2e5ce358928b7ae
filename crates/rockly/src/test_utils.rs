//! Synthetic images and depth fields for unit tests.

use image::{Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::depth::DepthField;

/// Solid gray RGB image.
pub(crate) fn uniform_rgb(w: u32, h: u32, level: u8) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb([level, level, level]))
}

/// Black/white checkerboard with square cells of `cell` pixels.
pub(crate) fn checkerboard_rgb(w: u32, h: u32, cell: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        let v = if ((x / cell) + (y / cell)) % 2 == 0 { 0 } else { 255 };
        Rgb([v, v, v])
    })
}

/// Depth field matching [`checkerboard_rgb`] (0.0 on dark cells, 1.0 on bright).
pub(crate) fn checkerboard_depth(w: u32, h: u32, cell: u32) -> DepthField {
    DepthField::from_fn(w, h, |x, y| {
        Luma([if ((x / cell) + (y / cell)) % 2 == 0 { 0.0 } else { 1.0 }])
    })
}

/// Constant depth field.
pub(crate) fn flat_depth(w: u32, h: u32, value: f32) -> DepthField {
    DepthField::from_pixel(w, h, Luma([value]))
}

/// Horizontal ramp from 0 (left) to 1 (right).
pub(crate) fn ramp_depth(w: u32, h: u32) -> DepthField {
    let denom = (w.max(2) - 1) as f32;
    DepthField::from_fn(w, h, |x, _| Luma([x as f32 / denom]))
}

/// Uniform RGB noise from a fixed seed.
pub(crate) fn noise_rgb(w: u32, h: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(w, h, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]))
}

/// Uniform depth noise in `[0, scale)` from a fixed seed.
pub(crate) fn noise_depth(w: u32, h: u32, scale: f32, seed: u64) -> DepthField {
    let mut rng = StdRng::seed_from_u64(seed);
    DepthField::from_fn(w, h, |_, _| Luma([rng.gen::<f32>() * scale]))
}
