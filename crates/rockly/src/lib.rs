//! rockly: single-photo 3D reconstruction of rock and mineral samples.
//!
//! A depth estimate for one photograph is refined with geology-specific
//! heuristics and sampled into a textured triangle mesh. The pipeline stages
//! are:
//!
//! 1. **Preprocess** – luma-only CLAHE, sharpening, edge brightening,
//!    bilateral denoising.
//! 2. **Fusion** – depth estimated at several image scales, resampled,
//!    normalized and blended.
//! 3. **Features** – depth amplified at mineral boundaries and crystal faces.
//! 4. **Post-process** – cliff removal and clamping to `[0, 1]`.
//! 5. **Resolution** – mesh sampling step chosen from surface complexity.
//! 6. **Mesh** – grid triangulation with UVs and per-vertex colour.
//! 7. **Quality** – informational scores for the final depth field.
//!
//! # Public API
//! - [`Reconstructor`] as the primary entry point
//! - [`PipelineConfig`] and its per-stage sections for tuning
//! - [`DepthEstimator`] / [`EstimatorBackend`] / [`EstimatorHandle`] for
//!   plugging in a depth model
//! - [`Mesh`] with JSON serialization and [`write_obj`] export
//!
//! The stage functions are public as well, for callers that want to run a
//! single stage on their own data.

mod config;
pub mod depth;
mod error;
pub mod estimator;
pub mod features;
pub mod fusion;
pub mod imgproc;
pub mod mesh;
mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod quality;
mod reconstructor;
pub mod resolution;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{EstimatorConfig, PipelineConfig};
pub use depth::DepthField;
pub use error::{EstimatorError, PipelineError};
pub use estimator::{DepthEstimator, EstimatorBackend, EstimatorHandle, LoadedEstimator};
pub use features::{enhance_geological_features, FeatureConfig};
pub use fusion::{fuse_multi_scale, FusionConfig, FusionReport, ScaleWeight, MAX_SCALE_FACTOR};
pub use mesh::{
    build_mesh, save_obj, write_obj, Mesh, MeshConfig, MeshMetadata, MeshSummary, Vertex,
};
pub use pipeline::{ProcessingInfo, Reconstruction};
pub use postprocess::{post_process_depth, PostprocessConfig};
pub use preprocess::{preprocess_rock_image, PreprocessConfig};
pub use quality::{assess_quality, QualityMetrics};
pub use reconstructor::Reconstructor;
pub use resolution::{select_step, ComplexityStats, ResolutionConfig};
