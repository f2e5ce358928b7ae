//! Top-level pipeline configuration.
//!
//! One section per stage. Every section carries `#[serde(default)]`, so a
//! JSON file only needs the values it changes.

use std::path::Path;

use crate::error::PipelineError;
use crate::estimator::{LUMINANCE_PRIOR, RADIAL_DOME};
use crate::features::FeatureConfig;
use crate::fusion::FusionConfig;
use crate::mesh::MeshConfig;
use crate::postprocess::PostprocessConfig;
use crate::preprocess::PreprocessConfig;
use crate::resolution::ResolutionConfig;

/// Ranked depth backend names, tried in order until one loads.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub backends: Vec<String>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            backends: vec![LUMINANCE_PRIOR.to_string(), RADIAL_DOME.to_string()],
        }
    }
}

/// Full configuration of a [`Reconstructor`](crate::Reconstructor).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub fusion: FusionConfig,
    pub features: FeatureConfig,
    pub postprocess: PostprocessConfig,
    pub resolution: ResolutionConfig,
    pub mesh: MeshConfig,
    pub estimator: EstimatorConfig,
}

fn odd_kernel(name: &str, k: u32) -> Result<(), PipelineError> {
    if k == 0 || k % 2 == 0 {
        return Err(PipelineError::invalid_config(format!(
            "{} must be a positive odd kernel size, got {}",
            name, k
        )));
    }
    Ok(())
}

fn non_negative(name: &str, v: f32) -> Result<(), PipelineError> {
    if !(v.is_finite() && v >= 0.0) {
        return Err(PipelineError::invalid_config(format!(
            "{} must be finite and >= 0, got {}",
            name, v
        )));
    }
    Ok(())
}

fn positive(name: &str, v: f32) -> Result<(), PipelineError> {
    if !(v.is_finite() && v > 0.0) {
        return Err(PipelineError::invalid_config(format!(
            "{} must be finite and > 0, got {}",
            name, v
        )));
    }
    Ok(())
}

fn thresholds(name: &str, low: f32, high: f32) -> Result<(), PipelineError> {
    non_negative(name, low)?;
    non_negative(name, high)?;
    if low > high {
        return Err(PipelineError::invalid_config(format!(
            "{} low threshold {} exceeds high threshold {}",
            name, low, high
        )));
    }
    Ok(())
}

impl PipelineConfig {
    /// Load a (possibly partial) JSON overlay on top of the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Check every section. Scale factors fail with `InvalidScale`,
    /// everything else with `InvalidConfig`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let p = &self.preprocess;
        non_negative("preprocess.clahe_clip_limit", p.clahe_clip_limit)?;
        if p.clahe_tile_grid == 0 {
            return Err(PipelineError::invalid_config(
                "preprocess.clahe_tile_grid must be >= 1",
            ));
        }
        thresholds("preprocess.canny", p.canny_low, p.canny_high)?;
        non_negative("preprocess.edge_boost", p.edge_boost)?;
        odd_kernel("preprocess.bilateral_diameter", p.bilateral_diameter)?;
        positive("preprocess.bilateral_sigma_color", p.bilateral_sigma_color)?;
        positive("preprocess.bilateral_sigma_space", p.bilateral_sigma_space)?;

        self.fusion.validate()?;

        let f = &self.features;
        thresholds("features.canny", f.canny_low, f.canny_high)?;
        non_negative("features.boundary_gain", f.boundary_gain)?;
        non_negative("features.crystal_face_gain", f.crystal_face_gain)?;
        odd_kernel("features.opening_size", f.opening_size)?;
        odd_kernel("features.smoothing_kernel", f.smoothing_kernel)?;

        let pp = &self.postprocess;
        odd_kernel("postprocess.bilateral_diameter", pp.bilateral_diameter)?;
        positive("postprocess.bilateral_sigma_color", pp.bilateral_sigma_color)?;
        positive("postprocess.bilateral_sigma_space", pp.bilateral_sigma_space)?;
        positive("postprocess.max_gradient", pp.max_gradient)?;
        odd_kernel("postprocess.cliff_kernel", pp.cliff_kernel)?;
        non_negative("postprocess.texture_gain", pp.texture_gain)?;
        odd_kernel("postprocess.final_kernel", pp.final_kernel)?;

        let r = &self.resolution;
        thresholds("resolution.canny", r.canny_low, r.canny_high)?;
        thresholds("resolution.variance", r.medium_variance, r.high_variance)?;
        thresholds(
            "resolution.edge_density",
            r.medium_edge_density,
            r.high_edge_density,
        )?;

        let scale = self.mesh.scale_factor;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(PipelineError::InvalidScale { factor: scale });
        }

        if self.estimator.backends.is_empty() {
            return Err(PipelineError::invalid_config(
                "estimator.backends must name at least one backend",
            ));
        }
        Ok(())
    }
}
