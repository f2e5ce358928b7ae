//! Informational quality scores for a final depth field.

use image::RgbImage;

use crate::depth::{self, DepthField};
use crate::imgproc;

const EDGE_LOW: f32 = 50.0;
const EDGE_HIGH: f32 = 150.0;
const LOCAL_WINDOW: u32 = 5;

/// Weights of the overall score, in field order.
pub const OVERALL_WEIGHTS: [f32; 4] = [0.3, 0.25, 0.25, 0.2];

/// Scores accompanying a mesh. They never influence the mesh itself.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QualityMetrics {
    /// IoU of image edges and depth edges.
    pub edge_consistency: f32,
    /// `1 - mean(|grad depth|)`.
    pub surface_smoothness: f32,
    /// Mean 5x5 local variance of depth.
    pub mineral_definition: f32,
    /// `min(max - min, 1)`.
    pub range_utilization: f32,
    pub overall_score: f32,
}

impl QualityMetrics {
    /// Assemble metrics from the four sub-scores, deriving `overall_score`.
    pub fn from_parts(
        edge_consistency: f32,
        surface_smoothness: f32,
        mineral_definition: f32,
        range_utilization: f32,
    ) -> Self {
        let [we, ws, wm, wr] = OVERALL_WEIGHTS;
        Self {
            edge_consistency,
            surface_smoothness,
            mineral_definition,
            range_utilization,
            overall_score: we * edge_consistency
                + ws * surface_smoothness
                + wm * mineral_definition
                + wr * range_utilization,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.edge_consistency,
            self.surface_smoothness,
            self.mineral_definition,
            self.range_utilization,
            self.overall_score,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

fn mean(field: &DepthField) -> f32 {
    if field.is_empty() {
        return 0.0;
    }
    (field.iter().map(|&v| v as f64).sum::<f64>() / field.len() as f64) as f32
}

fn edge_iou(depth: &DepthField, image: &RgbImage) -> f32 {
    let image_edges = imgproc::canny(&imgproc::to_gray(image), EDGE_LOW, EDGE_HIGH);
    let depth_edges = imgproc::canny(&depth::to_gray8(depth), EDGE_LOW, EDGE_HIGH);
    let (mut inter, mut union) = (0usize, 0usize);
    for (&a, &b) in image_edges.iter().zip(depth_edges.iter()) {
        let (a, b) = (a != 0, b != 0);
        inter += (a && b) as usize;
        union += (a || b) as usize;
    }
    inter as f32 / union.max(1) as f32
}

fn mean_local_variance(depth: &DepthField) -> f32 {
    let mut squared = depth.clone();
    for v in squared.iter_mut() {
        *v *= *v;
    }
    let m1 = imgproc::box_mean(depth, LOCAL_WINDOW);
    let m2 = imgproc::box_mean(&squared, LOCAL_WINDOW);
    let mut var = m2;
    for (v, &m) in var.iter_mut().zip(m1.iter()) {
        *v = (*v - m * m).max(0.0);
    }
    mean(&var)
}

/// Score `depth` against the image it was estimated from.
///
/// `depth` is resampled to the image size if the two differ.
pub fn assess_quality(depth: &DepthField, image: &RgbImage) -> QualityMetrics {
    let (w, h) = image.dimensions();
    let depth = imgproc::resize_depth(depth, w, h);

    let edge_consistency = edge_iou(&depth, image);
    let (_, _, magnitude) = imgproc::sobel_gradients(&depth);
    let surface_smoothness = 1.0 - mean(&magnitude);
    let mineral_definition = mean_local_variance(&depth);
    let range_utilization = depth::min_max(&depth)
        .map(|(lo, hi)| (hi - lo).min(1.0))
        .unwrap_or(0.0);

    let metrics = QualityMetrics::from_parts(
        edge_consistency,
        surface_smoothness,
        mineral_definition,
        range_utilization,
    );
    tracing::debug!("quality: {:?}", metrics);
    metrics
}
