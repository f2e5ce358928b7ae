//! Rock-specific photo enhancement ahead of depth estimation.
//!
//! Four passes, in order:
//! 1. CLAHE on the luma channel only (chroma is carried through untouched),
//! 2. high-pass sharpening to lift mineral boundaries and crystal faces,
//! 3. brightening inside a dilated edge mask,
//! 4. bilateral denoising.

use image::{GrayImage, RgbImage};

use crate::imgproc;

/// Configuration for [`preprocess_rock_image`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Relative CLAHE clip limit; 0 disables clipping.
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis.
    pub clahe_tile_grid: u32,
    /// Edge detector low threshold (0-255 scale).
    pub canny_low: f32,
    /// Edge detector high threshold (0-255 scale).
    pub canny_high: f32,
    /// Intensity multiplier applied inside the dilated edge mask.
    pub edge_boost: f32,
    /// Bilateral window diameter (pixels).
    pub bilateral_diameter: u32,
    /// Bilateral range sigma (0-255 scale).
    pub bilateral_sigma_color: f32,
    /// Bilateral spatial sigma (pixels).
    pub bilateral_sigma_space: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 3.0,
            clahe_tile_grid: 8,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_boost: 1.2,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
        }
    }
}

/// Luma/chroma split (BT.601 YCbCr, full range, chroma kept as floats).
struct LumaChroma {
    luma: GrayImage,
    cb: Vec<f32>,
    cr: Vec<f32>,
}

fn split_luma_chroma(rgb: &RgbImage) -> LumaChroma {
    let (w, h) = rgb.dimensions();
    let n = (w * h) as usize;
    let mut luma = GrayImage::new(w, h);
    let mut cb = Vec::with_capacity(n);
    let mut cr = Vec::with_capacity(n);
    for (dst, p) in luma.pixels_mut().zip(rgb.pixels()) {
        let [r, g, b] = p.0.map(|v| v as f32);
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        dst.0[0] = y.round().clamp(0.0, 255.0) as u8;
        cb.push(-0.168_736 * r - 0.331_264 * g + 0.5 * b);
        cr.push(0.5 * r - 0.418_688 * g - 0.081_312 * b);
    }
    LumaChroma { luma, cb, cr }
}

fn merge_luma_chroma(parts: &LumaChroma) -> RgbImage {
    let (w, h) = parts.luma.dimensions();
    let mut out = RgbImage::new(w, h);
    for (i, (dst, y)) in out.pixels_mut().zip(parts.luma.pixels()).enumerate() {
        let y = y.0[0] as f32;
        let (cb, cr) = (parts.cb[i], parts.cr[i]);
        let r = y + 1.402 * cr;
        let g = y - 0.344_136 * cb - 0.714_136 * cr;
        let b = y + 1.772 * cb;
        dst.0 = [r, g, b].map(|c| c.round().clamp(0.0, 255.0) as u8);
    }
    out
}

/// Local contrast enhancement restricted to luminance.
pub fn enhance_luminance(rgb: &RgbImage, clip_limit: f32, tile_grid: u32) -> RgbImage {
    let mut parts = split_luma_chroma(rgb);
    parts.luma = imgproc::clahe(&parts.luma, clip_limit, tile_grid);
    merge_luma_chroma(&parts)
}

/// Multiply every channel by `boost` where `mask` is set (saturating at 255).
fn boost_masked(img: &mut RgbImage, mask: &GrayImage, boost: f32) {
    for (p, m) in img.pixels_mut().zip(mask.pixels()) {
        if m.0[0] != 0 {
            p.0 = p.0.map(|c| (c as f32 * boost).min(255.0) as u8);
        }
    }
}

/// Enhance a raw rock photograph. Output has the input's dimensions.
pub fn preprocess_rock_image(rgb: &RgbImage, config: &PreprocessConfig) -> RgbImage {
    let contrasted = enhance_luminance(rgb, config.clahe_clip_limit, config.clahe_tile_grid);
    let mut sharpened = imgproc::convolve3x3_rgb(&contrasted, &imgproc::SHARPEN);

    let edges = imgproc::canny(
        &imgproc::to_gray(&sharpened),
        config.canny_low,
        config.canny_high,
    );
    let edge_zone = imgproc::dilate3x3(&edges);
    tracing::debug!(
        "preprocess: {} edge pixels, {} in dilated zone",
        imgproc::count_nonzero(&edges),
        imgproc::count_nonzero(&edge_zone)
    );
    boost_masked(&mut sharpened, &edge_zone, config.edge_boost);

    imgproc::bilateral_rgb(
        &sharpened,
        config.bilateral_diameter,
        config.bilateral_sigma_color,
        config.bilateral_sigma_space,
    )
}
