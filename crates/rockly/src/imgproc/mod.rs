//! Image and depth-plane primitives shared by the pipeline stages.
//!
//! Everything here works on owned `image` buffers with explicit loops.
//! Border handling for the hand-written kernels is reflect-101
//! (`gfedcb|abcdefgh|gfedcba`); the `imageproc` delegates use their own
//! clamp-to-edge borders.

mod bilateral;
mod clahe;

pub use bilateral::{bilateral_f32, bilateral_rgb};
pub use clahe::clahe;

use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;

use crate::depth::DepthField;

/// Horizontal Sobel derivative.
pub const SOBEL_X: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
/// Vertical Sobel derivative.
pub const SOBEL_Y: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];
/// Mixed second derivative (d/dx d/dy) with 3-tap Sobel factors.
pub const SOBEL_XY: [f32; 9] = [1.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0];
/// 4-neighbour Laplacian.
pub const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];
/// High-pass sharpening kernel (sums to 1, so flat areas are unchanged).
pub const SHARPEN: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Reflect-101 index folding for an axis of length `n`.
#[inline]
pub(crate) fn reflect101(i: i64, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let n = n as i64;
    let period = 2 * n - 2;
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

/// BT.601 luma, rounded to the nearest integer.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

/// Convert an RGB image to grayscale using BT.601 weights.
pub fn to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let mut out = GrayImage::new(w, h);
    for (dst, src) in out.pixels_mut().zip(rgb.pixels()) {
        dst.0[0] = luma(src.0[0], src.0[1], src.0[2]);
    }
    out
}

/// Correlate a `w x h` plane with a 3x3 kernel.
fn correlate3x3(
    w: usize,
    h: usize,
    kernel: &[f32; 9],
    sample: impl Fn(usize, usize) -> f32,
    mut put: impl FnMut(usize, usize, f32),
) {
    for y in 0..h {
        let rows = [
            reflect101(y as i64 - 1, h),
            y,
            reflect101(y as i64 + 1, h),
        ];
        for x in 0..w {
            let cols = [
                reflect101(x as i64 - 1, w),
                x,
                reflect101(x as i64 + 1, w),
            ];
            let mut acc = 0.0f32;
            for (ky, &sy) in rows.iter().enumerate() {
                for (kx, &sx) in cols.iter().enumerate() {
                    let k = kernel[ky * 3 + kx];
                    if k != 0.0 {
                        acc += k * sample(sx, sy);
                    }
                }
            }
            put(x, y, acc);
        }
    }
}

/// 3x3 correlation of a float plane.
pub fn convolve3x3(src: &DepthField, kernel: &[f32; 9]) -> DepthField {
    let (w, h) = src.dimensions();
    let raw = src.as_raw();
    let stride = w as usize;
    let mut out = vec![0.0f32; raw.len()];
    correlate3x3(
        w as usize,
        h as usize,
        kernel,
        |x, y| raw[y * stride + x],
        |x, y, v| out[y * stride + x] = v,
    );
    DepthField::from_raw(w, h, out).unwrap_or_else(|| DepthField::new(w, h))
}

/// 3x3 correlation applied to a grayscale image, returning raw float responses.
pub fn convolve3x3_gray(src: &GrayImage, kernel: &[f32; 9]) -> DepthField {
    let (w, h) = src.dimensions();
    let raw = src.as_raw();
    let stride = w as usize;
    let mut out = vec![0.0f32; raw.len()];
    correlate3x3(
        w as usize,
        h as usize,
        kernel,
        |x, y| raw[y * stride + x] as f32,
        |x, y, v| out[y * stride + x] = v,
    );
    DepthField::from_raw(w, h, out).unwrap_or_else(|| DepthField::new(w, h))
}

/// Per-channel 3x3 correlation of an RGB image with saturating rounding.
pub fn convolve3x3_rgb(src: &RgbImage, kernel: &[f32; 9]) -> RgbImage {
    let (w, h) = src.dimensions();
    let raw = src.as_raw();
    let stride = w as usize * 3;
    let mut out = RgbImage::new(w, h);
    let dst = &mut *out;
    for c in 0..3 {
        correlate3x3(
            w as usize,
            h as usize,
            kernel,
            |x, y| raw[y * stride + x * 3 + c] as f32,
            |x, y, v| dst[y * stride + x * 3 + c] = v.round().clamp(0.0, 255.0) as u8,
        );
    }
    out
}

/// Gradient magnitude `sqrt(gx^2 + gy^2)` together with both Sobel responses.
pub fn sobel_gradients(src: &DepthField) -> (DepthField, DepthField, DepthField) {
    let gx = convolve3x3(src, &SOBEL_X);
    let gy = convolve3x3(src, &SOBEL_Y);
    let mut mag = DepthField::new(src.width(), src.height());
    for ((m, a), b) in mag.iter_mut().zip(gx.iter()).zip(gy.iter()) {
        *m = (a * a + b * b).sqrt();
    }
    (gx, gy, mag)
}

/// Gaussian sigma used for a `ksize x ksize` kernel when no sigma is given.
#[inline]
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize.max(1) as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian smoothing sized by kernel width.
pub fn gaussian_blur(src: &DepthField, ksize: u32) -> DepthField {
    let sigma = sigma_for_kernel(ksize);
    if sigma <= 0.0 {
        return src.clone();
    }
    imageproc::filter::gaussian_blur_f32(src, sigma)
}

/// Normalized `k x k` box mean.
pub fn box_mean(src: &DepthField, k: u32) -> DepthField {
    let (w, h) = src.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let raw = src.as_raw();
    let r = (k.max(1) / 2) as i64;
    let norm = 1.0 / ((2 * r + 1) * (2 * r + 1)) as f32;
    let mut out = DepthField::new(w, h);
    for y in 0..hu {
        for x in 0..wu {
            let mut acc = 0.0f32;
            for dy in -r..=r {
                let sy = reflect101(y as i64 + dy, hu);
                for dx in -r..=r {
                    let sx = reflect101(x as i64 + dx, wu);
                    acc += raw[sy * wu + sx];
                }
            }
            out.put_pixel(x as u32, y as u32, Luma([acc * norm]));
        }
    }
    out
}

/// Double-threshold edge detector on an 8-bit plane (edges are 255).
pub fn canny(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    imageproc::edges::canny(gray, low, high)
}

/// One dilation pass with a 3x3 square structuring element.
pub fn dilate3x3(mask: &GrayImage) -> GrayImage {
    imageproc::morphology::dilate(mask, Norm::LInf, 1)
}

/// Morphological opening with a `size x size` square structuring element.
pub fn open(gray: &GrayImage, size: u32) -> GrayImage {
    let k = (size / 2).min(u8::MAX as u32) as u8;
    if k == 0 {
        return gray.clone();
    }
    imageproc::morphology::open(gray, Norm::LInf, k)
}

/// Number of non-zero samples in a mask.
pub fn count_nonzero(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v != 0).count()
}

/// Bilinear resampling of an RGB image.
pub fn resize_rgb(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    image::imageops::resize(src, width.max(1), height.max(1), FilterType::Triangle)
}

/// Bilinear resampling of a float plane.
pub fn resize_depth(src: &DepthField, width: u32, height: u32) -> DepthField {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    image::imageops::resize(src, width.max(1), height.max(1), FilterType::Triangle)
}
