//! Multi-scale depth fusion.
//!
//! The estimator is run once per configured scale. Each result is resampled
//! back to the input resolution, min-max normalized, and accumulated with its
//! blend weight. Weights are renormalized to sum to 1.

use image::RgbImage;

use crate::depth::{self, DepthField};
use crate::error::PipelineError;
use crate::estimator::EstimatorHandle;
use crate::imgproc;

/// Largest accepted resize factor.
pub const MAX_SCALE_FACTOR: f32 = 4.0;

/// A resize factor and its blend weight.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScaleWeight {
    /// Resize factor applied to the image before estimation (1.0 = native).
    pub factor: f32,
    /// Blend weight of this scale's normalized depth.
    pub weight: f32,
}

impl ScaleWeight {
    pub const fn new(factor: f32, weight: f32) -> Self {
        Self { factor, weight }
    }
}

/// Configuration for [`fuse_multi_scale`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Scales evaluated in order.
    pub scales: Vec<ScaleWeight>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            scales: vec![
                ScaleWeight::new(1.0, 0.5),
                ScaleWeight::new(0.75, 0.3),
                ScaleWeight::new(0.5, 0.2),
            ],
        }
    }
}

impl FusionConfig {
    /// Check factors and weights without touching the estimator.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.scales.is_empty() {
            return Err(PipelineError::invalid_config("fusion needs at least one scale"));
        }
        for s in &self.scales {
            if !(s.factor.is_finite() && s.factor > 0.0 && s.factor <= MAX_SCALE_FACTOR) {
                return Err(PipelineError::InvalidScale { factor: s.factor });
            }
            if !(s.weight.is_finite() && s.weight >= 0.0) {
                return Err(PipelineError::invalid_config(format!(
                    "fusion weight {} for scale {} must be finite and >= 0",
                    s.weight, s.factor
                )));
            }
        }
        let total: f32 = self.scales.iter().map(|s| s.weight).sum();
        if total <= 0.0 {
            return Err(PipelineError::invalid_config("fusion weights sum to zero"));
        }
        Ok(())
    }

    /// Validated scales with weights rescaled to sum to 1.
    pub fn normalized_scales(&self) -> Result<Vec<ScaleWeight>, PipelineError> {
        self.validate()?;
        let total: f32 = self.scales.iter().map(|s| s.weight).sum();
        if (total - 1.0).abs() > 1e-6 {
            tracing::warn!("fusion weights sum to {:.4}; renormalizing", total);
        }
        Ok(self
            .scales
            .iter()
            .map(|s| ScaleWeight::new(s.factor, s.weight / total))
            .collect())
    }
}

/// Bookkeeping from one fusion run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusionReport {
    /// Number of estimator invocations.
    pub scales_used: usize,
    /// Factors whose estimate had no depth range and contributed zeros.
    pub degenerate_scales: Vec<f32>,
}

/// Image size for a resize factor (each side at least one pixel).
fn scaled_size(w: u32, h: u32, factor: f32) -> (u32, u32) {
    let sw = ((w as f32 * factor) as u32).max(1);
    let sh = ((h as f32 * factor) as u32).max(1);
    (sw, sh)
}

/// Fuse per-scale depth estimates into one field at the image's resolution.
///
/// Fails with [`PipelineError::EstimationUnavailable`] if the handle has no
/// usable estimator or an invocation fails, and with
/// [`PipelineError::InvalidScale`] for a factor outside `(0, MAX_SCALE_FACTOR]`.
pub fn fuse_multi_scale(
    image: &RgbImage,
    config: &FusionConfig,
    handle: &EstimatorHandle,
) -> Result<(DepthField, FusionReport), PipelineError> {
    let scales = config.normalized_scales()?;
    let estimator = handle.get()?;
    let (w, h) = image.dimensions();

    let mut combined = DepthField::new(w, h);
    let mut report = FusionReport::default();
    for scale in &scales {
        let estimate = if scale.factor == 1.0 {
            estimator.estimate(image)?
        } else {
            let (sw, sh) = scaled_size(w, h, scale.factor);
            estimator.estimate(&imgproc::resize_rgb(image, sw, sh))?
        };
        report.scales_used += 1;

        let restored = imgproc::resize_depth(&estimate, w, h);
        let (normalized, degenerate) = depth::normalize(&restored);
        if degenerate {
            report.degenerate_scales.push(scale.factor);
        }
        tracing::debug!(
            "fusion: scale {:.2} (weight {:.3}) estimated at {}x{}",
            scale.factor,
            scale.weight,
            estimate.width(),
            estimate.height()
        );
        for (acc, v) in combined.iter_mut().zip(normalized.iter()) {
            *acc += v * scale.weight;
        }
    }
    Ok((combined, report))
}
