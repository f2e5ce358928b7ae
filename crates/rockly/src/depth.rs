//! Depth field type and range helpers.

use image::{GrayImage, ImageBuffer, Luma};

use crate::error::PipelineError;

/// Per-pixel depth estimate, row-major, one `f32` per pixel.
pub type DepthField = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Spread (relative to magnitude) at or below which a field counts as flat.
const DEGENERATE_RELATIVE_SPREAD: f32 = 16.0 * f32::EPSILON;

/// Smallest and largest finite sample, or `None` for an empty/all-NaN field.
pub fn min_max(field: &DepthField) -> Option<(f32, f32)> {
    field
        .as_raw()
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Replace non-finite samples with zero.
pub fn sanitize(field: &mut DepthField) {
    for v in field.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
        }
    }
}

/// Min-max normalize to `[0, 1]`.
///
/// Fails with [`PipelineError::DegenerateDepthRange`] when every sample has
/// the same value.
pub fn try_normalize(field: &DepthField) -> Result<DepthField, PipelineError> {
    let (lo, hi) = min_max(field).ok_or(PipelineError::DegenerateDepthRange { value: 0.0 })?;
    let range = hi - lo;
    // Resampling a constant field can leave a few ulps of spread.
    let tolerance = DEGENERATE_RELATIVE_SPREAD * lo.abs().max(hi.abs()).max(1.0);
    if !range.is_finite() || range <= tolerance {
        return Err(PipelineError::DegenerateDepthRange { value: lo });
    }
    let inv = 1.0 / range;
    let mut out = field.clone();
    for v in out.iter_mut() {
        *v = if v.is_finite() {
            ((*v - lo) * inv).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
    Ok(out)
}

/// Min-max normalize, mapping a degenerate field to all zeros.
///
/// Returns the normalized field and whether the degenerate policy applied.
pub fn normalize(field: &DepthField) -> (DepthField, bool) {
    match try_normalize(field) {
        Ok(out) => (out, false),
        Err(err) => {
            tracing::warn!("{}; substituting an all-zero field", err);
            (DepthField::new(field.width(), field.height()), true)
        }
    }
}

/// Rescale `[0, 1]` depth to an 8-bit plane (`v * 255`, clamped, truncated).
pub fn to_gray8(field: &DepthField) -> GrayImage {
    let (w, h) = field.dimensions();
    let mut out = GrayImage::new(w, h);
    for (dst, &v) in out.iter_mut().zip(field.iter()) {
        let scaled = if v.is_finite() { v * 255.0 } else { 0.0 };
        *dst = scaled.clamp(0.0, 255.0) as u8;
    }
    out
}
