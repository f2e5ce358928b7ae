//! Geological feature enhancement of the fused depth field.
//!
//! Mineral boundaries (union of a double-threshold edge map and a mixed
//! Sobel response, dilated once) get their depth amplified; candidate
//! crystal faces (white top-hat of the grayscale image) get a smaller lift.
//! Everything outside the boundary zone is replaced by a Gaussian-smoothed
//! copy. Values are not clamped here; the post-processor does that.

use image::{GrayImage, Luma, RgbImage};

use crate::depth::DepthField;
use crate::imgproc;

/// Configuration for [`enhance_geological_features`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Edge detector low threshold (0-255 scale).
    pub canny_low: f32,
    /// Edge detector high threshold (0-255 scale).
    pub canny_high: f32,
    /// Depth multiplier inside the boundary zone.
    pub boundary_gain: f32,
    /// Depth multiplier on candidate crystal faces.
    pub crystal_face_gain: f32,
    /// Side of the square structuring element for the opening.
    pub opening_size: u32,
    /// Top-hat response (0-255) above which a pixel is a crystal-face candidate.
    pub top_hat_threshold: u8,
    /// Gaussian kernel size applied outside the boundary zone.
    pub smoothing_kernel: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            boundary_gain: 1.3,
            crystal_face_gain: 1.1,
            opening_size: 5,
            top_hat_threshold: 10,
            smoothing_kernel: 5,
        }
    }
}

/// Dilated union of the edge map and the saturated mixed-derivative response.
pub fn boundary_mask(gray: &GrayImage, config: &FeatureConfig) -> GrayImage {
    let edges = imgproc::canny(gray, config.canny_low, config.canny_high);
    let mixed = imgproc::convolve3x3_gray(gray, &imgproc::SOBEL_XY);
    let mut union = edges;
    for (dst, &g) in union.iter_mut().zip(mixed.iter()) {
        let directional = g.abs().min(255.0) as u8;
        *dst |= directional;
    }
    imgproc::dilate3x3(&union)
}

/// Pixels brighter than their opening by more than the threshold.
pub fn crystal_face_mask(gray: &GrayImage, config: &FeatureConfig) -> GrayImage {
    let opened = imgproc::open(gray, config.opening_size);
    let mut mask = GrayImage::new(gray.width(), gray.height());
    for ((dst, &g), &o) in mask.iter_mut().zip(gray.iter()).zip(opened.iter()) {
        if g.saturating_sub(o) > config.top_hat_threshold {
            *dst = 255;
        }
    }
    mask
}

/// Amplify depth at mineral boundaries and crystal faces.
///
/// `depth` is resampled to the image's resolution first if they differ.
pub fn enhance_geological_features(
    depth: &DepthField,
    image: &RgbImage,
    config: &FeatureConfig,
) -> DepthField {
    let (w, h) = image.dimensions();
    let mut enhanced = imgproc::resize_depth(depth, w, h);
    let gray = imgproc::to_gray(image);

    let boundary = boundary_mask(&gray, config);
    let faces = crystal_face_mask(&gray, config);
    tracing::debug!(
        "features: {} boundary pixels, {} crystal-face pixels",
        imgproc::count_nonzero(&boundary),
        imgproc::count_nonzero(&faces)
    );

    for ((v, b), f) in enhanced.pixels_mut().zip(boundary.pixels()).zip(faces.pixels()) {
        if b[0] != 0 {
            v[0] *= config.boundary_gain;
        }
        if f[0] != 0 {
            v[0] *= config.crystal_face_gain;
        }
    }

    let smoothed = imgproc::gaussian_blur(&enhanced, config.smoothing_kernel);
    for ((v, s), b) in enhanced.pixels_mut().zip(smoothed.pixels()).zip(boundary.pixels()) {
        if b[0] == 0 {
            *v = Luma([s[0]]);
        }
    }
    enhanced
}
