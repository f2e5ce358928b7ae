use crate::depth::DepthField;
use crate::mesh::{Mesh, MeshSummary};
use crate::quality::QualityMetrics;

/// Value of [`ProcessingInfo::mesh_generation`].
pub const MESH_GENERATION: &str = "adaptive_geological";
/// Value of [`ProcessingInfo::preprocessing`].
pub const PREPROCESSING: &str = "rock_enhanced";

/// How a reconstruction was produced.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProcessingInfo {
    /// Name of the depth backend that served the run.
    pub depth_estimation: String,
    /// Device reported by that backend.
    pub device_used: String,
    pub mesh_generation: String,
    pub preprocessing: String,
    /// Copy of [`QualityMetrics::overall_score`].
    pub quality_score: f32,
}

/// Everything one successful run hands back to the caller.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Reconstruction {
    /// The mesh, in the client JSON layout.
    pub model_data: Mesh,
    pub processing_info: ProcessingInfo,
    pub quality_metrics: QualityMetrics,
    pub summary: MeshSummary,
    /// Final depth field at image resolution, values in `[0, 1]`.
    #[serde(skip)]
    pub depth: DepthField,
}

impl Reconstruction {
    /// Sampling step the mesh was built with.
    pub fn adaptive_step(&self) -> u32 {
        self.model_data.metadata.adaptive_step
    }
}
