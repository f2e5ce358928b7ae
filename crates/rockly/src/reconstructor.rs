//! High-level reconstruction API.
//!
//! [`Reconstructor`] is the primary entry point. It pairs a
//! [`PipelineConfig`] with a shared [`EstimatorHandle`].

use std::path::Path;
use std::sync::Arc;

use image::RgbImage;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::estimator::EstimatorHandle;
use crate::pipeline::{self, Reconstruction};

/// Single-photo rock reconstruction.
///
/// Create once, reconstruct many images. Several reconstructors (or threads
/// sharing one) may hold clones of the same `Arc<EstimatorHandle>`; the
/// estimator is loaded once for all of them.
///
/// # Examples
///
/// ```no_run
/// use rockly::Reconstructor;
///
/// let rec = Reconstructor::from_config(Default::default());
/// let out = rec.reconstruct_path("sample.jpg".as_ref())?;
/// println!("{} vertices", out.summary.vertex_count);
/// # Ok::<(), rockly::PipelineError>(())
/// ```
#[derive(Debug)]
pub struct Reconstructor {
    config: PipelineConfig,
    estimator: Arc<EstimatorHandle>,
}

impl Reconstructor {
    /// Default configuration with the given estimator.
    pub fn new(estimator: Arc<EstimatorHandle>) -> Self {
        Self::with_config(PipelineConfig::default(), estimator)
    }

    /// Create with full config control.
    pub fn with_config(config: PipelineConfig, estimator: Arc<EstimatorHandle>) -> Self {
        Self { config, estimator }
    }

    /// Build the estimator handle from the config's ranked built-in backends.
    pub fn from_config(config: PipelineConfig) -> Self {
        let estimator = Arc::new(EstimatorHandle::from_builtin(&config.estimator.backends));
        Self { config, estimator }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// Shared estimator handle.
    pub fn estimator(&self) -> &Arc<EstimatorHandle> {
        &self.estimator
    }

    /// Run the full pipeline on a decoded RGB image.
    pub fn reconstruct(&self, image: &RgbImage) -> Result<Reconstruction, PipelineError> {
        pipeline::run(image, &self.config, &self.estimator)
    }

    /// Decode an image file and reconstruct it.
    pub fn reconstruct_path(&self, path: &Path) -> Result<Reconstruction, PipelineError> {
        let image = pipeline::open_image(path)?;
        self.reconstruct(&image)
    }

    /// Decode an in-memory encoded image (PNG, JPEG, ...) and reconstruct it.
    pub fn reconstruct_bytes(&self, bytes: &[u8]) -> Result<Reconstruction, PipelineError> {
        let image = pipeline::decode_image(bytes)?;
        self.reconstruct(&image)
    }
}
