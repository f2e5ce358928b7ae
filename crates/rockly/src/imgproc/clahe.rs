//! Contrast-limited adaptive histogram equalization.

use image::GrayImage;

const BINS: usize = 256;

/// Clip a tile histogram at `limit` and spread the excess uniformly.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let batch = excess / BINS as u32;
    let mut residual = excess % BINS as u32;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS as u32 / residual).max(1) as usize;
        let mut i = 0usize;
        while residual > 0 && i < BINS {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Cumulative-distribution lookup table for one tile.
fn tile_lut(hist: &[u32; BINS], area: u32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    let scale = 255.0 / area.max(1) as f32;
    let mut cum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        cum += count;
        *entry = (cum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Equalize `plane` with a `grid x grid` tiling and the given clip limit.
///
/// The clip limit is relative: a tile bin may hold at most
/// `clip_limit * tile_area / 256` samples before redistribution. A limit
/// of 0 disables clipping (plain tiled equalization).
/// Tile mappings are blended bilinearly between tile centres.
pub fn clahe(plane: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = plane.dimensions();
    if w == 0 || h == 0 {
        return plane.clone();
    }
    let tile_w = w.div_ceil(grid.clamp(1, w));
    let tile_h = h.div_ceil(grid.clamp(1, h));
    let grid_x = w.div_ceil(tile_w);
    let grid_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((grid_x * grid_y) as usize);
    for ty in 0..grid_y {
        let y0 = ty * tile_h;
        let y1 = (y0 + tile_h).min(h);
        for tx in 0..grid_x {
            let x0 = tx * tile_w;
            let x1 = (x0 + tile_w).min(w);
            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[plane.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            if clip_limit > 0.0 {
                let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
                clip_histogram(&mut hist, limit);
            }
            luts.push(tile_lut(&hist, area));
        }
    }

    // Tile-space coordinate of a pixel centre -> (lower tile, upper tile, weight of upper).
    let axis = |p: u32, tile: u32, n: u32| -> (usize, usize, f32) {
        let t = (p as f32 + 0.5) / tile as f32 - 0.5;
        let lo = t.floor();
        let frac = t - lo;
        let last = n as i64 - 1;
        let i0 = (lo as i64).clamp(0, last) as usize;
        let i1 = (lo as i64 + 1).clamp(0, last) as usize;
        (i0, i1, frac)
    };

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty0, ty1, fy) = axis(y, tile_h, grid_y);
        for x in 0..w {
            let (tx0, tx1, fx) = axis(x, tile_w, grid_x);
            let v = plane.get_pixel(x, y)[0] as usize;
            let gx = grid_x as usize;
            let a = luts[ty0 * gx + tx0][v] as f32;
            let b = luts[ty0 * gx + tx1][v] as f32;
            let c = luts[ty1 * gx + tx0][v] as f32;
            let d = luts[ty1 * gx + tx1][v] as f32;
            let top = a + (b - a) * fx;
            let bottom = c + (d - c) * fx;
            let value = top + (bottom - top) * fy;
            out.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn constant_plane_stays_constant() {
        let plane = GrayImage::from_pixel(64, 64, Luma([120]));
        let out = clahe(&plane, 3.0, 8);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
        assert_eq!(out.dimensions(), (64, 64));
    }

    #[test]
    fn clipping_conserves_sample_count() {
        let mut hist = [0u32; BINS];
        hist[10] = 500;
        hist[200] = 12;
        clip_histogram(&mut hist, 20);
        assert_eq!(hist.iter().sum::<u32>(), 512);
        assert!(hist[10] <= 20 + 2);
    }

    #[test]
    fn low_contrast_ramp_is_stretched() {
        let plane = GrayImage::from_fn(64, 64, |x, _| Luma([100 + (x / 8) as u8]));
        let out = clahe(&plane, 40.0, 2);
        let (lo, hi) = out
            .pixels()
            .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        assert!(hi - lo > 7, "range {}..{} was not stretched", lo, hi);
    }

    #[test]
    fn zero_limit_equalizes_without_clipping() {
        let plane = GrayImage::from_fn(64, 64, |x, _| Luma([100 + (x / 8) as u8]));
        let clipped = clahe(&plane, 1.0, 2);
        let unclipped = clahe(&plane, 0.0, 2);
        let spread = |img: &GrayImage| {
            let (lo, hi) = img
                .pixels()
                .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
            hi - lo
        };
        assert!(spread(&unclipped) >= spread(&clipped));
        assert!(spread(&unclipped) > 7);
    }

    #[test]
    fn tiny_images_do_not_panic() {
        let plane = GrayImage::from_pixel(1, 3, Luma([7]));
        let out = clahe(&plane, 3.0, 8);
        assert_eq!(out.dimensions(), (1, 3));
    }
}
