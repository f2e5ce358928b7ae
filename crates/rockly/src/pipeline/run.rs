//! Stage orchestration for one image.

use std::path::Path;

use image::RgbImage;

use super::result::{ProcessingInfo, Reconstruction, MESH_GENERATION, PREPROCESSING};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::estimator::EstimatorHandle;
use crate::features::enhance_geological_features;
use crate::fusion::fuse_multi_scale;
use crate::imgproc;
use crate::mesh::build_mesh;
use crate::postprocess::post_process_depth;
use crate::preprocess::preprocess_rock_image;
use crate::quality::assess_quality;
use crate::resolution::select_step;

/// Decode an encoded image (any format `image` understands) to RGB.
pub(crate) fn decode_image(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::invalid_image(format!("decode failed: {}", e)))?;
    Ok(decoded.to_rgb8())
}

pub(crate) fn open_image(path: &Path) -> Result<RgbImage, PipelineError> {
    let decoded = image::open(path).map_err(|e| {
        PipelineError::invalid_image(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(decoded.to_rgb8())
}

fn check_dimensions(image: &RgbImage) -> Result<(), PipelineError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(PipelineError::invalid_image(format!(
            "image has zero extent ({}x{})",
            w, h
        )));
    }
    Ok(())
}

/// Run every stage on `image`, failing fast on the first error.
pub(crate) fn run(
    image: &RgbImage,
    config: &PipelineConfig,
    handle: &EstimatorHandle,
) -> Result<Reconstruction, PipelineError> {
    config.validate()?;
    check_dimensions(image)?;
    let (w, h) = image.dimensions();
    tracing::info!("Reconstructing {}x{} image", w, h);

    let enhanced_image = preprocess_rock_image(image, &config.preprocess);
    tracing::info!("Preprocessing done");

    let (fused, report) = fuse_multi_scale(&enhanced_image, &config.fusion, handle)?;
    if !report.degenerate_scales.is_empty() {
        tracing::warn!(
            "{} of {} scales produced a flat depth estimate: {:?}",
            report.degenerate_scales.len(),
            report.scales_used,
            report.degenerate_scales
        );
    }
    tracing::info!("Fused {} depth scales", report.scales_used);

    let featured = enhance_geological_features(&fused, &enhanced_image, &config.features);
    let depth = post_process_depth(&featured, &config.postprocess);
    let depth = imgproc::resize_depth(&depth, w, h);
    tracing::info!("Depth enhancement and plausibility gate done");

    let step = select_step(&depth, &enhanced_image, &config.resolution);
    let mesh = build_mesh(&depth, image, step, config.mesh.scale_factor);
    tracing::info!(
        "Mesh built at step {}: {} vertices, {} faces",
        step,
        mesh.vertex_count(),
        mesh.face_count()
    );

    let quality = assess_quality(&depth, &enhanced_image);
    tracing::info!("Quality score {:.3}", quality.overall_score);

    let estimator = handle.get()?;
    let processing_info = ProcessingInfo {
        depth_estimation: estimator.backend().to_string(),
        device_used: estimator.device().to_string(),
        mesh_generation: MESH_GENERATION.to_string(),
        preprocessing: PREPROCESSING.to_string(),
        quality_score: quality.overall_score,
    };
    let summary = mesh.summary();
    Ok(Reconstruction {
        model_data: mesh,
        processing_info,
        quality_metrics: quality,
        summary,
        depth,
    })
}
