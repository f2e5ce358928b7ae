//! Depth estimator contract and the shared, lazily loaded estimator handle.
//!
//! The pipeline never depends on a particular model. It asks an
//! [`EstimatorHandle`] for a loaded [`DepthEstimator`]; the handle walks a
//! ranked list of [`EstimatorBackend`]s on first use and keeps the first one
//! that loads. Loading happens at most once per handle, even when several
//! threads ask at the same time.

mod builtin;

pub use builtin::{
    builtin_backend_names, builtin_backends, LuminancePrior, RadialDome, LUMINANCE_PRIOR,
    RADIAL_DOME,
};

use std::sync::{Arc, OnceLock};

use image::RgbImage;

use crate::depth::DepthField;
use crate::error::{EstimatorError, PipelineError};

/// Per-pixel depth inference on an RGB image.
///
/// Output values are unnormalized and may use any positive range; the field
/// may have a different resolution than the input.
///
/// Any `Fn(&RgbImage) -> Result<DepthField, EstimatorError>` closure that is
/// `Send + Sync` is a `DepthEstimator`.
pub trait DepthEstimator: Send + Sync {
    /// Estimate depth for one image. May block for the duration of inference.
    fn estimate(&self, image: &RgbImage) -> Result<DepthField, EstimatorError>;

    /// Compute device the estimator runs on.
    fn device(&self) -> &str {
        "cpu"
    }
}

impl<F> DepthEstimator for F
where
    F: Fn(&RgbImage) -> Result<DepthField, EstimatorError> + Send + Sync,
{
    fn estimate(&self, image: &RgbImage) -> Result<DepthField, EstimatorError> {
        self(image)
    }
}

/// A named way of constructing a [`DepthEstimator`].
pub trait EstimatorBackend: Send + Sync {
    /// Backend identifier reported in processing info.
    fn name(&self) -> &str;

    /// Build the estimator. Called at most once per [`EstimatorHandle`].
    fn load(&self) -> Result<Arc<dyn DepthEstimator>, EstimatorError>;
}

/// An estimator that finished loading, with the backend it came from.
#[derive(Clone)]
pub struct LoadedEstimator {
    backend: String,
    estimator: Arc<dyn DepthEstimator>,
}

impl std::fmt::Debug for LoadedEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedEstimator")
            .field("backend", &self.backend)
            .field("device", &self.estimator.device())
            .finish()
    }
}

impl LoadedEstimator {
    /// Name of the backend that produced this estimator.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Device reported by the estimator.
    pub fn device(&self) -> &str {
        self.estimator.device()
    }

    /// Run inference and check the result is a usable depth field.
    pub fn estimate(&self, image: &RgbImage) -> Result<DepthField, PipelineError> {
        let field = self.estimator.estimate(image).map_err(|e| {
            PipelineError::unavailable(format!("backend '{}' failed: {}", self.backend, e))
        })?;
        let (w, h) = field.dimensions();
        if w == 0 || h == 0 {
            return Err(PipelineError::unavailable(format!(
                "backend '{}' returned an empty {}x{} depth field",
                self.backend, w, h
            )));
        }
        if field.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::unavailable(format!(
                "backend '{}' returned non-finite depth values",
                self.backend
            )));
        }
        Ok(field)
    }
}

/// Process-wide estimator slot, shared as `Arc<EstimatorHandle>`.
pub struct EstimatorHandle {
    backends: Vec<Box<dyn EstimatorBackend>>,
    slot: OnceLock<Result<LoadedEstimator, String>>,
}

impl EstimatorHandle {
    /// Handle that loads lazily from a ranked backend list (first success wins).
    pub fn new(backends: Vec<Box<dyn EstimatorBackend>>) -> Self {
        Self {
            backends,
            slot: OnceLock::new(),
        }
    }

    /// Handle around an already constructed estimator.
    pub fn preloaded(backend: impl Into<String>, estimator: Arc<dyn DepthEstimator>) -> Self {
        let slot = OnceLock::new();
        let _ = slot.set(Ok(LoadedEstimator {
            backend: backend.into(),
            estimator,
        }));
        Self {
            backends: Vec::new(),
            slot,
        }
    }

    /// Handle over the named built-in backends, in rank order.
    pub fn from_builtin<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(builtin_backends(names))
    }

    /// Names of the ranked backends (empty for preloaded handles).
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Whether a load attempt has already happened (successful or not).
    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The loaded estimator, loading it on first call.
    ///
    /// A failed load is remembered: later calls fail the same way without
    /// retrying.
    pub fn get(&self) -> Result<&LoadedEstimator, PipelineError> {
        self.slot
            .get_or_init(|| self.load_first())
            .as_ref()
            .map_err(|reason| PipelineError::unavailable(reason.clone()))
    }

    fn load_first(&self) -> Result<LoadedEstimator, String> {
        if self.backends.is_empty() {
            return Err("no depth estimation backends configured".to_string());
        }
        let mut failures = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            tracing::info!("Trying depth backend '{}'", backend.name());
            match backend.load() {
                Ok(estimator) => {
                    tracing::info!(
                        "Loaded depth backend '{}' on {}",
                        backend.name(),
                        estimator.device()
                    );
                    return Ok(LoadedEstimator {
                        backend: backend.name().to_string(),
                        estimator,
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to load depth backend '{}': {}", backend.name(), e);
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }
        Err(format!(
            "no depth estimation backend could be loaded ({})",
            failures.join("; ")
        ))
    }
}

impl std::fmt::Debug for EstimatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimatorHandle")
            .field("backends", &self.backend_names())
            .field("slot", &self.slot.get())
            .finish()
    }
}
