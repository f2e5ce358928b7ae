//! Model-free depth backends.
//!
//! These stand in for a learned estimator when none is linked into the
//! binary. Both assume a single sample photographed roughly centred.

use std::sync::Arc;

use image::{Luma, RgbImage};

use super::{DepthEstimator, EstimatorBackend};
use crate::depth::DepthField;
use crate::error::EstimatorError;
use crate::imgproc;

/// Name of the [`LuminancePrior`] backend.
pub const LUMINANCE_PRIOR: &str = "luminance-prior";
/// Name of the [`RadialDome`] backend.
pub const RADIAL_DOME: &str = "radial-dome";

/// Names accepted by [`builtin_backends`].
pub fn builtin_backend_names() -> &'static [&'static str] {
    &[LUMINANCE_PRIOR, RADIAL_DOME]
}

/// Squared distance from the image centre, normalized so the inscribed
/// ellipse has radius 1.
#[inline]
fn radial2(x: u32, y: u32, w: u32, h: u32) -> f32 {
    let nx = (x as f32 + 0.5) / w as f32 * 2.0 - 1.0;
    let ny = (y as f32 + 0.5) / h as f32 * 2.0 - 1.0;
    nx * nx + ny * ny
}

/// Shading prior: smoothed luminance (brighter is nearer) blended with a
/// shallow centre dome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminancePrior {
    /// Smoothing sigma as a fraction of the longer image side.
    pub smoothing_fraction: f32,
    /// Blend weight of the dome term in `[0, 1]`.
    pub dome_weight: f32,
}

impl Default for LuminancePrior {
    fn default() -> Self {
        Self {
            smoothing_fraction: 0.01,
            dome_weight: 0.35,
        }
    }
}

impl DepthEstimator for LuminancePrior {
    fn estimate(&self, image: &RgbImage) -> Result<DepthField, EstimatorError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err("empty image".into());
        }
        let gray = imgproc::to_gray(image);
        let lum = DepthField::from_fn(w, h, |x, y| Luma([gray.get_pixel(x, y)[0] as f32 / 255.0]));
        let sigma = (self.smoothing_fraction * w.max(h) as f32).max(1.0);
        let smooth = imageproc::filter::gaussian_blur_f32(&lum, sigma);
        let dome_weight = self.dome_weight.clamp(0.0, 1.0);
        Ok(DepthField::from_fn(w, h, |x, y| {
            let dome = (1.0 - radial2(x, y, w, h)).max(0.0);
            let shade = smooth.get_pixel(x, y)[0];
            Luma([1.0 + (1.0 - dome_weight) * shade + dome_weight * dome])
        }))
    }
}

/// Pure geometric prior: a hemisphere centred in the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadialDome;

impl DepthEstimator for RadialDome {
    fn estimate(&self, image: &RgbImage) -> Result<DepthField, EstimatorError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err("empty image".into());
        }
        Ok(DepthField::from_fn(w, h, |x, y| {
            Luma([1.0 + (1.0 - radial2(x, y, w, h)).max(0.0).sqrt()])
        }))
    }
}

struct Builtin {
    name: String,
}

impl EstimatorBackend for Builtin {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Arc<dyn DepthEstimator>, EstimatorError> {
        match self.name.as_str() {
            LUMINANCE_PRIOR => Ok(Arc::new(LuminancePrior::default())),
            RADIAL_DOME => Ok(Arc::new(RadialDome)),
            other => Err(format!(
                "unknown depth backend '{}' (built-in: {})",
                other,
                builtin_backend_names().join(", ")
            )
            .into()),
        }
    }
}

/// Resolve backend names into loaders, keeping rank order.
///
/// Unknown names are kept and fail at load time, so a ranked list may name
/// optional backends that are absent from this build.
pub fn builtin_backends<S: AsRef<str>>(names: &[S]) -> Vec<Box<dyn EstimatorBackend>> {
    names
        .iter()
        .map(|n| {
            Box::new(Builtin {
                name: n.as_ref().to_string(),
            }) as Box<dyn EstimatorBackend>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::min_max;
    use crate::estimator::EstimatorHandle;
    use crate::test_utils::{noise_rgb, uniform_rgb};

    #[test]
    fn dome_peaks_in_the_centre() {
        let d = RadialDome.estimate(&uniform_rgb(41, 41, 0)).unwrap();
        let centre = d.get_pixel(20, 20)[0];
        let corner = d.get_pixel(0, 0)[0];
        assert!(centre > corner);
        assert!(d.iter().all(|&v| v >= 1.0));
    }

    #[test]
    fn luminance_prior_is_positive_and_varied() {
        let d = LuminancePrior::default()
            .estimate(&noise_rgb(48, 32, 5))
            .unwrap();
        assert_eq!(d.dimensions(), (48, 32));
        let (lo, hi) = min_max(&d).unwrap();
        assert!(lo > 0.0);
        assert!(hi > lo);
    }

    #[test]
    fn unknown_names_fall_through_to_the_next_backend() {
        let handle = EstimatorHandle::from_builtin(&["depth-anything-v2", RADIAL_DOME]);
        assert_eq!(handle.backend_names(), vec!["depth-anything-v2", RADIAL_DOME]);
        assert_eq!(handle.get().unwrap().backend(), RADIAL_DOME);
    }
}
