use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use image::RgbImage;

use crate::depth::DepthField;
use crate::error::{EstimatorError, PipelineError};
use crate::estimator::{DepthEstimator, EstimatorBackend, EstimatorHandle, LUMINANCE_PRIOR};
use crate::fusion::ScaleWeight;
use crate::imgproc;
use crate::test_utils::{checkerboard_rgb, flat_depth, noise_rgb, uniform_rgb};
use crate::{PipelineConfig, Reconstructor};

fn flat_estimator(value: f32) -> Arc<EstimatorHandle> {
    Arc::new(EstimatorHandle::preloaded(
        "flat",
        Arc::new(move |img: &RgbImage| -> Result<DepthField, EstimatorError> {
            Ok(flat_depth(img.width(), img.height(), value))
        }),
    ))
}

/// Depth follows brightness, so a patterned image gets a matching depth field.
fn brightness_estimator() -> Arc<EstimatorHandle> {
    Arc::new(EstimatorHandle::preloaded(
        "brightness",
        Arc::new(|img: &RgbImage| -> Result<DepthField, EstimatorError> {
            let gray = imgproc::to_gray(img);
            Ok(DepthField::from_fn(img.width(), img.height(), |x, y| {
                image::Luma([1.0 + gray.get_pixel(x, y)[0] as f32 / 255.0])
            }))
        }),
    ))
}

fn assert_unit_depth(depth: &DepthField) {
    for &v in depth.iter() {
        assert!((0.0..=1.0).contains(&v), "depth sample {} outside [0, 1]", v);
    }
}

#[test]
fn uniform_image_with_flat_depth() {
    let rec = Reconstructor::new(flat_estimator(0.5));
    let out = rec.reconstruct(&uniform_rgb(64, 64, 128)).unwrap();

    assert_eq!(out.adaptive_step(), 4);
    assert_eq!(out.summary.vertex_count, 256);
    assert_eq!(out.summary.face_count, 450);
    assert!(out.model_data.indices_valid());
    assert_abs_diff_eq!(out.quality_metrics.range_utilization, 0.0, epsilon = 1e-6);
    assert_eq!(out.processing_info.depth_estimation, "flat");
    assert_eq!(out.processing_info.device_used, "cpu");
    assert_unit_depth(&out.depth);
}

#[test]
fn checkerboard_gets_a_medium_step_mesh() {
    let rec = Reconstructor::new(brightness_estimator());
    let out = rec.reconstruct(&checkerboard_rgb(100, 100, 10)).unwrap();

    // Edge density alone is high, but the post-process bilateral pass
    // flattens the depth variance below the fine-step threshold.
    assert_eq!(out.adaptive_step(), 3);
    assert_eq!(out.summary.vertex_count, 33 * 33);
    assert_eq!(out.summary.face_count, 2 * 32 * 32);
    assert!(out.model_data.indices_valid());
    assert!(out.quality_metrics.range_utilization > 0.0);
}

#[test]
fn noise_image_with_builtin_backends() {
    let rec = Reconstructor::from_config(PipelineConfig::default());
    let out = rec.reconstruct(&noise_rgb(48, 40, 21)).unwrap();

    assert_unit_depth(&out.depth);
    assert!(out.quality_metrics.is_finite());
    assert_eq!(out.processing_info.depth_estimation, LUMINANCE_PRIOR);
    assert_eq!(out.processing_info.mesh_generation, "adaptive_geological");
    assert_eq!(out.processing_info.preprocessing, "rock_enhanced");
    assert_abs_diff_eq!(
        out.processing_info.quality_score,
        out.quality_metrics.overall_score
    );
    assert!([2, 3, 4].contains(&out.adaptive_step()));
}

#[test]
fn single_pixel_image_gives_an_empty_mesh() {
    let rec = Reconstructor::from_config(PipelineConfig::default());
    let out = rec.reconstruct(&uniform_rgb(1, 1, 200)).unwrap();
    assert!(out.model_data.is_empty());
    assert_eq!(out.summary.face_count, 0);
    assert_eq!(out.model_data.metadata.original_dimensions, [1, 1]);
}

#[test]
fn extreme_aspect_ratio_is_well_formed() {
    let rec = Reconstructor::new(brightness_estimator());
    let out = rec.reconstruct(&noise_rgb(200, 3, 4)).unwrap();
    let step = out.adaptive_step();
    assert_eq!(
        out.summary.vertex_count,
        ((3 / step) * (200 / step)) as usize
    );
    assert!(out.model_data.indices_valid());
    assert_unit_depth(&out.depth);
}

#[test]
fn low_resolution_estimates_are_resampled() {
    let handle = Arc::new(EstimatorHandle::preloaded(
        "half",
        Arc::new(|img: &RgbImage| -> Result<DepthField, EstimatorError> {
            let (w, h) = ((img.width() / 2).max(1), (img.height() / 2).max(1));
            Ok(DepthField::from_fn(w, h, |x, y| image::Luma([(x + y) as f32])))
        }),
    ));
    let out = Reconstructor::new(handle)
        .reconstruct(&uniform_rgb(40, 24, 90))
        .unwrap();
    assert_eq!(out.depth.dimensions(), (40, 24));
    assert_eq!(out.model_data.metadata.original_dimensions, [40, 24]);
}

#[test]
fn mesh_scale_factor_sets_depth_extent() {
    let mut rec = Reconstructor::new(brightness_estimator());
    rec.config_mut().mesh.scale_factor = 2.0;
    let out = rec.reconstruct(&noise_rgb(32, 32, 8)).unwrap();
    assert_eq!(out.model_data.metadata.scale_factor, 2.0);
    assert!(out.summary.bbox_max[2] <= 2.0 + 1e-6);
    assert!(out.summary.bbox_min[2] >= 0.0);
}

#[test]
fn empty_image_is_invalid() {
    let rec = Reconstructor::new(flat_estimator(1.0));
    let err = rec.reconstruct(&RgbImage::new(0, 7)).unwrap_err();
    assert_eq!(err.kind(), "invalid_image");
}

#[test]
fn undecodable_inputs_are_invalid_images() {
    let rec = Reconstructor::new(flat_estimator(1.0));
    let err = rec.reconstruct_bytes(b"definitely not an image").unwrap_err();
    assert_eq!(err.kind(), "invalid_image");

    let missing = std::env::temp_dir().join("rockly-no-such-image.png");
    let err = rec.reconstruct_path(&missing).unwrap_err();
    assert_eq!(err.kind(), "invalid_image");
}

#[test]
fn encoded_png_roundtrips_through_decode() {
    let img = noise_rgb(20, 12, 2);
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .unwrap();
    let out = Reconstructor::new(brightness_estimator())
        .reconstruct_bytes(&bytes)
        .unwrap();
    assert_eq!(out.model_data.metadata.original_dimensions, [20, 12]);
}

#[test]
fn invalid_scale_fails_before_estimation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let handle = Arc::new(EstimatorHandle::preloaded(
        "counted",
        Arc::new(move |img: &RgbImage| -> Result<DepthField, EstimatorError> {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(flat_depth(img.width(), img.height(), 1.0))
        }),
    ));
    let mut rec = Reconstructor::new(handle);
    rec.config_mut()
        .fusion
        .scales
        .push(ScaleWeight::new(-1.0, 0.1));
    let err = rec.reconstruct(&uniform_rgb(16, 16, 0)).unwrap_err();
    assert_eq!(err, PipelineError::InvalidScale { factor: -1.0 });
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn huge_scale_factor_is_rejected() {
    let mut rec = Reconstructor::new(flat_estimator(1.0));
    rec.config_mut().fusion.scales = vec![ScaleWeight::new(1.0e6, 1.0)];
    let err = rec.reconstruct(&uniform_rgb(8, 8, 10)).unwrap_err();
    assert_eq!(err, PipelineError::InvalidScale { factor: 1.0e6 });
}

#[test]
fn estimator_failures_abort_the_run() {
    let handle = Arc::new(EstimatorHandle::preloaded(
        "broken",
        Arc::new(|_: &RgbImage| -> Result<DepthField, EstimatorError> {
            Err("inference crashed".into())
        }),
    ));
    let err = Reconstructor::new(handle)
        .reconstruct(&uniform_rgb(16, 16, 50))
        .unwrap_err();
    assert_eq!(err.kind(), "estimation_unavailable");
    assert!(err.to_string().contains("inference crashed"));
}

#[test]
fn no_loadable_backend_is_estimation_unavailable() {
    let mut config = PipelineConfig::default();
    config.estimator.backends = vec!["missing-model".to_string()];
    let err = Reconstructor::from_config(config)
        .reconstruct(&uniform_rgb(8, 8, 1))
        .unwrap_err();
    assert_eq!(err.kind(), "estimation_unavailable");
}

struct CountingBackend {
    loads: Arc<AtomicUsize>,
}

impl EstimatorBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn load(&self) -> Result<Arc<dyn DepthEstimator>, EstimatorError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(crate::estimator::RadialDome))
    }
}

#[test]
fn reconstructors_share_one_estimator_load() {
    let loads = Arc::new(AtomicUsize::new(0));
    let handle = Arc::new(EstimatorHandle::new(vec![Box::new(CountingBackend {
        loads: Arc::clone(&loads),
    })]));
    let a = Reconstructor::new(Arc::clone(&handle));
    let b = Reconstructor::new(Arc::clone(&handle));
    std::thread::scope(|s| {
        s.spawn(|| a.reconstruct(&noise_rgb(24, 24, 1)).unwrap());
        s.spawn(|| b.reconstruct(&noise_rgb(24, 24, 2)).unwrap());
    });
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(handle.is_initialized());
}

#[test]
fn reconstruction_json_uses_client_layout() {
    let out = Reconstructor::new(flat_estimator(0.5))
        .reconstruct(&uniform_rgb(16, 16, 30))
        .unwrap();
    let v = serde_json::to_value(&out).unwrap();
    for key in ["model_data", "processing_info", "quality_metrics", "summary"] {
        assert!(v.get(key).is_some(), "missing {}", key);
    }
    assert!(v.get("depth").is_none());
    assert_eq!(v["model_data"]["metadata"]["adaptive_step"], 4);
    assert_eq!(
        v["model_data"]["vertices"].as_array().map(|a| a.len()),
        Some(16)
    );
}
