//! Edge-preserving bilateral smoothing.

use image::RgbImage;

use super::reflect101;
use crate::depth::DepthField;

/// Spatial taps of a circular window: (dx, dy, weight).
fn spatial_taps(diameter: u32, sigma_space: f32) -> Vec<(i64, i64, f32)> {
    let radius = (diameter / 2).max(1) as i64;
    let coeff = -0.5 / (sigma_space * sigma_space).max(f32::EPSILON);
    let mut taps = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2.sqrt() > radius as f32 {
                continue;
            }
            taps.push((dx, dy, (r2 * coeff).exp()));
        }
    }
    taps
}

/// Bilateral filter over an interleaved plane with `channels` samples per pixel.
///
/// The range distance between two pixels is the L1 norm of their channel
/// differences.
fn bilateral_planar(
    src: &[f32],
    w: usize,
    h: usize,
    channels: usize,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> Vec<f32> {
    let taps = spatial_taps(diameter, sigma_space);
    let color_coeff = -0.5 / (sigma_color * sigma_color).max(f32::EPSILON);
    let mut out = vec![0.0f32; src.len()];
    let mut acc = vec![0.0f32; channels];
    for y in 0..h {
        for x in 0..w {
            let center = (y * w + x) * channels;
            acc.iter_mut().for_each(|a| *a = 0.0);
            let mut wsum = 0.0f32;
            for &(dx, dy, ws) in &taps {
                let sx = reflect101(x as i64 + dx, w);
                let sy = reflect101(y as i64 + dy, h);
                let idx = (sy * w + sx) * channels;
                let mut dist = 0.0f32;
                for c in 0..channels {
                    dist += (src[idx + c] - src[center + c]).abs();
                }
                let weight = ws * (dist * dist * color_coeff).exp();
                for (c, a) in acc.iter_mut().enumerate() {
                    *a += weight * src[idx + c];
                }
                wsum += weight;
            }
            for (c, a) in acc.iter().enumerate() {
                out[center + c] = if wsum > 0.0 { a / wsum } else { src[center + c] };
            }
        }
    }
    out
}

/// Bilateral filter of an RGB image (range sigma on the 0-255 scale).
pub fn bilateral_rgb(
    img: &RgbImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> RgbImage {
    let (w, h) = img.dimensions();
    let src: Vec<f32> = img.as_raw().iter().map(|&v| v as f32).collect();
    let filtered = bilateral_planar(
        &src,
        w as usize,
        h as usize,
        3,
        diameter,
        sigma_color,
        sigma_space,
    );
    let bytes = filtered
        .iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    RgbImage::from_raw(w, h, bytes).unwrap_or_else(|| img.clone())
}

/// Bilateral filter of a float plane (range sigma in the plane's own units).
pub fn bilateral_f32(
    field: &DepthField,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> DepthField {
    let (w, h) = field.dimensions();
    let filtered = bilateral_planar(
        field.as_raw(),
        w as usize,
        h as usize,
        1,
        diameter,
        sigma_color,
        sigma_space,
    );
    DepthField::from_raw(w, h, filtered).unwrap_or_else(|| field.clone())
}
