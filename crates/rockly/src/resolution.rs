//! Adaptive mesh sampling step from surface complexity.

use image::RgbImage;

use crate::depth::DepthField;
use crate::imgproc;

/// Finest sampling step.
pub const STEP_FINE: u32 = 2;
/// Intermediate sampling step.
pub const STEP_MEDIUM: u32 = 3;
/// Coarsest sampling step.
pub const STEP_COARSE: u32 = 4;

/// Thresholds of the step decision table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Laplacian variance required (with `high_edge_density`) for the finest step.
    pub high_variance: f32,
    /// Laplacian variance sufficient for the intermediate step.
    pub medium_variance: f32,
    /// Edge density required (with `high_variance`) for the finest step.
    pub high_edge_density: f32,
    /// Edge density sufficient for the intermediate step.
    pub medium_edge_density: f32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            high_variance: 0.1,
            medium_variance: 0.05,
            high_edge_density: 0.05,
            medium_edge_density: 0.03,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Surface complexity measured on a depth field and its image.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComplexityStats {
    /// Population variance of the depth Laplacian.
    pub laplacian_variance: f32,
    /// Fraction of image pixels flagged as edges.
    pub edge_density: f32,
}

impl ComplexityStats {
    pub fn measure(depth: &DepthField, image: &RgbImage, config: &ResolutionConfig) -> Self {
        let lap = imgproc::convolve3x3(depth, &imgproc::LAPLACIAN);
        let n = lap.len();
        let laplacian_variance = if n == 0 {
            0.0
        } else {
            let mean = lap.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
            let var = lap
                .iter()
                .map(|&v| {
                    let d = v as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / n as f64;
            var as f32
        };

        let gray = imgproc::to_gray(image);
        let edges = imgproc::canny(&gray, config.canny_low, config.canny_high);
        let total = edges.len();
        let edge_density = if total == 0 {
            0.0
        } else {
            imgproc::count_nonzero(&edges) as f32 / total as f32
        };

        Self {
            laplacian_variance,
            edge_density,
        }
    }
}

impl ResolutionConfig {
    /// Apply the decision table; the fine rule is checked first.
    pub fn step_for(&self, stats: &ComplexityStats) -> u32 {
        if stats.laplacian_variance > self.high_variance
            && stats.edge_density > self.high_edge_density
        {
            STEP_FINE
        } else if stats.laplacian_variance > self.medium_variance
            || stats.edge_density > self.medium_edge_density
        {
            STEP_MEDIUM
        } else {
            STEP_COARSE
        }
    }
}

/// Pick the mesh sampling step for `depth` rendered over `image`.
///
/// Always returns one of 2, 3 or 4.
pub fn select_step(depth: &DepthField, image: &RgbImage, config: &ResolutionConfig) -> u32 {
    let stats = ComplexityStats::measure(depth, image, config);
    let step = config.step_for(&stats);
    tracing::debug!(
        "resolution: laplacian variance {:.5}, edge density {:.4} -> step {}",
        stats.laplacian_variance,
        stats.edge_density,
        step
    );
    step
}
