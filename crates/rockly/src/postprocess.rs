//! Plausibility gate for enhanced depth.
//!
//! Rocks do not show near-vertical depth cliffs at pixel scale, so steep
//! gradients are replaced by a heavier blur, a little gradient-proportional
//! texture is added back, and the result is clamped to `[0, 1]`.

use crate::depth::DepthField;
use crate::imgproc;

/// Configuration for [`post_process_depth`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PostprocessConfig {
    /// Bilateral window diameter (pixels).
    pub bilateral_diameter: u32,
    /// Bilateral range sigma (depth units).
    pub bilateral_sigma_color: f32,
    /// Bilateral spatial sigma (pixels).
    pub bilateral_sigma_space: f32,
    /// Gradient magnitude above which a sample counts as a cliff.
    pub max_gradient: f32,
    /// Gaussian kernel size used to flatten cliffs.
    pub cliff_kernel: u32,
    /// Weight of the `|gx + gy|` texture term.
    pub texture_gain: f32,
    /// Gaussian kernel size of the final light smoothing.
    pub final_kernel: u32,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            max_gradient: 0.3,
            cliff_kernel: 7,
            texture_gain: 0.05,
            final_kernel: 3,
        }
    }
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Smooth, de-cliff and clamp an enhanced depth field.
///
/// Every sample of the returned field lies in `[0, 1]`.
pub fn post_process_depth(depth: &DepthField, config: &PostprocessConfig) -> DepthField {
    let mut smoothed = imgproc::bilateral_f32(
        depth,
        config.bilateral_diameter,
        config.bilateral_sigma_color,
        config.bilateral_sigma_space,
    );
    for v in smoothed.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
        }
    }

    let (gx, gy, magnitude) = imgproc::sobel_gradients(&smoothed);
    let flattened = imgproc::gaussian_blur(&smoothed, config.cliff_kernel);
    let mut cliffs = 0usize;
    for ((v, &m), &f) in smoothed
        .iter_mut()
        .zip(magnitude.iter())
        .zip(flattened.iter())
    {
        if m > config.max_gradient {
            *v = f;
            cliffs += 1;
        }
    }
    tracing::debug!("postprocess: {} cliff samples flattened", cliffs);

    for ((v, &a), &b) in smoothed.iter_mut().zip(gx.iter()).zip(gy.iter()) {
        *v = clamp_unit(*v + config.texture_gain * (a + b).abs());
    }

    let mut out = imgproc::gaussian_blur(&smoothed, config.final_kernel);
    for v in out.iter_mut() {
        *v = clamp_unit(*v);
    }
    out
}
