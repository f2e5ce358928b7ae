//! Pipeline error kinds.

/// Error returned by a [`DepthEstimator`](crate::DepthEstimator) implementation.
pub type EstimatorError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of one reconstruction run.
///
/// Every stage propagates its failure immediately; a failed run never yields
/// a partial mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The image could not be decoded or has a zero dimension.
    InvalidImage {
        /// Human-readable reason.
        reason: String,
    },
    /// No estimator backend could be loaded, or inference failed.
    EstimationUnavailable {
        /// Human-readable reason.
        reason: String,
    },
    /// A strict normalization met a field with `max == min`.
    DegenerateDepthRange {
        /// The single value the field holds.
        value: f32,
    },
    /// A configured scale factor is not strictly positive and finite.
    InvalidScale {
        /// Offending factor.
        factor: f32,
    },
    /// Any other configuration value out of its admissible range.
    InvalidConfig {
        /// Human-readable reason.
        reason: String,
    },
}

impl PipelineError {
    pub(crate) fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::EstimationUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Short machine-friendly tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidImage { .. } => "invalid_image",
            Self::EstimationUnavailable { .. } => "estimation_unavailable",
            Self::DegenerateDepthRange { .. } => "degenerate_depth_range",
            Self::InvalidScale { .. } => "invalid_scale",
            Self::InvalidConfig { .. } => "invalid_config",
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidImage { reason } => write!(f, "invalid image: {}", reason),
            Self::EstimationUnavailable { reason } => {
                write!(f, "depth estimation unavailable: {}", reason)
            }
            Self::DegenerateDepthRange { value } => {
                write!(f, "degenerate depth range: every sample equals {}", value)
            }
            Self::InvalidScale { factor } => {
                write!(f, "invalid scale factor {}: must be finite and > 0", factor)
            }
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_value() {
        let e = PipelineError::InvalidScale { factor: -0.5 };
        assert_eq!(e.to_string(), "invalid scale factor -0.5: must be finite and > 0");
        assert_eq!(e.kind(), "invalid_scale");
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            PipelineError::invalid_image("x").kind(),
            PipelineError::unavailable("x").kind(),
            PipelineError::DegenerateDepthRange { value: 0.0 }.kind(),
            PipelineError::InvalidScale { factor: 0.0 }.kind(),
            PipelineError::invalid_config("x").kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
