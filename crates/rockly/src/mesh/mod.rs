//! Grid triangulation of a depth field.
//!
//! The mesh is stored in the layout rendering clients consume: parallel
//! arrays of positions, faces, texture coordinates and colours, plus a
//! metadata block. [`Mesh`] serializes to exactly that JSON shape.

mod obj;

pub use obj::{save_obj, write_obj};

use image::RgbImage;

use crate::depth::DepthField;
use crate::imgproc;

/// Tag written to `metadata.mesh_quality`.
pub const MESH_QUALITY: &str = "adaptive_high_detail";

/// Mesh construction parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// World-space depth extent of a normalized depth of 1.0.
    pub scale_factor: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self { scale_factor: 0.15 }
    }
}

/// One mesh vertex, assembled from the parallel arrays of a [`Mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// `x, y` in `[-1, 1]` (y up), `z` = depth * scale factor.
    pub position: [f32; 3],
    /// Texture coordinate in `[0, 1]^2`, v up.
    pub uv: [f32; 2],
    /// Linear RGB in `[0, 1]`.
    pub color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshMetadata {
    pub vertex_count: usize,
    pub face_count: usize,
    /// Source image `[width, height]`.
    pub original_dimensions: [u32; 2],
    pub scale_factor: f32,
    pub adaptive_step: u32,
    pub mesh_quality: String,
}

/// Textured triangle mesh.
///
/// Every index in `faces` is smaller than `vertices.len()`, and the four
/// per-vertex arrays have equal length.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    /// Triangles, counter-clockwise as authored.
    pub faces: Vec<[u32; 3]>,
    pub texture_coords: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 3]>,
    pub metadata: MeshMetadata,
}

/// Compact description of a mesh for logs and API summaries.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshSummary {
    pub vertex_count: usize,
    pub face_count: usize,
    pub has_texture: bool,
    pub has_colors: bool,
    /// Component-wise minimum position (zeros for an empty mesh).
    pub bbox_min: [f32; 3],
    /// Component-wise maximum position (zeros for an empty mesh).
    pub bbox_max: [f32; 3],
    pub adaptive_step: u32,
    pub mesh_quality: String,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex `i`, or `None` past the end.
    pub fn vertex(&self, i: usize) -> Option<Vertex> {
        Some(Vertex {
            position: *self.vertices.get(i)?,
            uv: *self.texture_coords.get(i)?,
            color: *self.colors.get(i)?,
        })
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        (0..self.vertices.len()).filter_map(move |i| self.vertex(i))
    }

    /// Axis-aligned bounds of the vertex positions.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), p| {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
            (lo, hi)
        }))
    }

    /// True when every face index addresses an existing vertex.
    pub fn indices_valid(&self) -> bool {
        let n = self.vertices.len();
        self.faces
            .iter()
            .all(|f| f.iter().all(|&i| (i as usize) < n))
    }

    pub fn summary(&self) -> MeshSummary {
        let (bbox_min, bbox_max) = self.bounds().unwrap_or(([0.0; 3], [0.0; 3]));
        MeshSummary {
            vertex_count: self.vertex_count(),
            face_count: self.face_count(),
            has_texture: !self.texture_coords.is_empty(),
            has_colors: !self.colors.is_empty(),
            bbox_min,
            bbox_max,
            adaptive_step: self.metadata.adaptive_step,
            mesh_quality: self.metadata.mesh_quality.clone(),
        }
    }
}

/// Sample `depth` every `step` pixels and triangulate the grid.
///
/// The grid has `rows = height / step` by `cols = width / step` vertices at
/// pixels `(col * step, row * step)`. Each cell yields the triangles
/// `(v0, v1, v2)` and `(v1, v3, v2)` with a fixed diagonal. `depth` is
/// resampled to the image size if needed; colours come from `image`.
pub fn build_mesh(depth: &DepthField, image: &RgbImage, step: u32, scale_factor: f32) -> Mesh {
    let (w, h) = image.dimensions();
    let depth = imgproc::resize_depth(depth, w, h);
    let step = step.max(1);
    let cols = w / step;
    let rows = h / step;
    let n = rows as usize * cols as usize;

    let mut vertices = Vec::with_capacity(n);
    let mut texture_coords = Vec::with_capacity(n);
    let mut colors = Vec::with_capacity(n);
    let (wf, hf) = (w as f32, h as f32);
    for row in 0..rows {
        let y = row * step;
        for col in 0..cols {
            let x = col * step;
            let u = x as f32 / wf;
            let v = y as f32 / hf;
            let d = depth.get_pixel(x, y)[0];
            vertices.push([u * 2.0 - 1.0, -(v * 2.0 - 1.0), d * scale_factor]);
            texture_coords.push([u, 1.0 - v]);
            let px = image.get_pixel(x, y).0;
            colors.push([
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]);
        }
    }

    let cells = rows.saturating_sub(1) as usize * cols.saturating_sub(1) as usize;
    let mut faces = Vec::with_capacity(2 * cells);
    for row in 0..rows.saturating_sub(1) {
        for col in 0..cols.saturating_sub(1) {
            let v0 = row * cols + col;
            let v1 = v0 + 1;
            let v2 = v0 + cols;
            let v3 = v2 + 1;
            faces.push([v0, v1, v2]);
            faces.push([v1, v3, v2]);
        }
    }

    tracing::debug!(
        "mesh: {}x{} grid at step {} -> {} vertices, {} faces",
        cols,
        rows,
        step,
        vertices.len(),
        faces.len()
    );

    Mesh {
        metadata: MeshMetadata {
            vertex_count: vertices.len(),
            face_count: faces.len(),
            original_dimensions: [w, h],
            scale_factor,
            adaptive_step: step,
            mesh_quality: MESH_QUALITY.to_string(),
        },
        vertices,
        faces,
        texture_coords,
        colors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{flat_depth, noise_rgb, ramp_depth, uniform_rgb};
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    #[test]
    fn flat_64px_at_step_4_has_16x16_grid() {
        let mesh = build_mesh(&flat_depth(64, 64, 0.5), &uniform_rgb(64, 64, 128), 4, 0.15);
        assert_eq!(mesh.vertex_count(), 256);
        assert_eq!(mesh.face_count(), 450);
        assert_eq!(mesh.metadata.vertex_count, 256);
        assert_eq!(mesh.metadata.face_count, 450);
        assert!(mesh.indices_valid());
        for p in &mesh.vertices {
            assert_abs_diff_eq!(p[2], 0.075, epsilon = 1e-6);
        }
    }

    #[test]
    fn vertex_count_matches_integer_division_for_odd_sizes() {
        for (w, h, step) in [(100, 100, 2), (37, 23, 3), (10, 41, 4), (5, 5, 2), (3, 9, 2)] {
            let mesh = build_mesh(&ramp_depth(w, h), &noise_rgb(w, h, 1), step, 0.15);
            let (rows, cols) = ((h / step) as usize, (w / step) as usize);
            assert_eq!(mesh.vertex_count(), rows * cols, "{}x{} step {}", w, h, step);
            assert_eq!(
                mesh.face_count(),
                2 * rows.saturating_sub(1) * cols.saturating_sub(1)
            );
            assert!(mesh.indices_valid());
            assert_eq!(mesh.texture_coords.len(), mesh.vertex_count());
            assert_eq!(mesh.colors.len(), mesh.vertex_count());
        }
    }

    #[test]
    fn first_cell_uses_the_fixed_diagonal() {
        let mesh = build_mesh(&flat_depth(8, 8, 0.0), &uniform_rgb(8, 8, 0), 2, 0.15);
        // cols = 4
        assert_eq!(mesh.faces[0], [0, 1, 4]);
        assert_eq!(mesh.faces[1], [1, 5, 4]);
    }

    #[test]
    fn positions_uvs_and_colors_follow_the_pixel() {
        let mut img = uniform_rgb(10, 10, 0);
        img.put_pixel(4, 6, Rgb([255, 51, 0]));
        let depth = DepthField::from_fn(10, 10, |x, y| image::Luma([(x + y) as f32 / 18.0]));
        let mesh = build_mesh(&depth, &img, 2, 0.5);
        let origin = mesh.vertex(0).unwrap();
        assert_eq!(origin.position, [-1.0, 1.0, 0.0]);
        assert_eq!(origin.uv, [0.0, 1.0]);

        // pixel (4, 6) is row 3, col 2 of a 5-wide grid
        let v = mesh.vertex(3 * 5 + 2).unwrap();
        assert_abs_diff_eq!(v.position[0], -0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(v.position[1], -0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(v.position[2], 10.0 / 18.0 * 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(v.uv[0], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(v.uv[1], 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(v.color[0], 1.0);
        assert_abs_diff_eq!(v.color[1], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(v.color[2], 0.0);
    }

    #[test]
    fn tiny_image_gives_an_empty_valid_mesh() {
        let mesh = build_mesh(&flat_depth(1, 1, 0.3), &uniform_rgb(1, 1, 9), 2, 0.15);
        assert!(mesh.is_empty());
        assert_eq!(mesh.face_count(), 0);
        assert!(mesh.indices_valid());
        let s = mesh.summary();
        assert_eq!(s.bbox_min, [0.0; 3]);
        assert_eq!(s.mesh_quality, MESH_QUALITY);
    }

    #[test]
    fn depth_is_resampled_to_the_image() {
        let mesh = build_mesh(&flat_depth(8, 8, 1.0), &uniform_rgb(32, 16, 0), 4, 0.15);
        assert_eq!(mesh.vertex_count(), 8 * 4);
        assert_eq!(mesh.metadata.original_dimensions, [32, 16]);
    }

    #[test]
    fn json_uses_client_field_names() {
        let mesh = build_mesh(&flat_depth(4, 4, 0.5), &uniform_rgb(4, 4, 0), 2, 0.15);
        let v = serde_json::to_value(&mesh).unwrap();
        for key in ["vertices", "faces", "texture_coords", "colors", "metadata"] {
            assert!(v.get(key).is_some(), "missing {}", key);
        }
        let meta = &v["metadata"];
        for key in [
            "vertex_count",
            "face_count",
            "original_dimensions",
            "scale_factor",
            "adaptive_step",
            "mesh_quality",
        ] {
            assert!(meta.get(key).is_some(), "missing metadata.{}", key);
        }
        assert_eq!(meta["mesh_quality"], "adaptive_high_detail");
        assert_eq!(v["faces"][0], serde_json::json!([0, 1, 2]));
    }

    #[test]
    fn summary_reports_bounds() {
        let mesh = build_mesh(&ramp_depth(20, 20), &uniform_rgb(20, 20, 1), 2, 1.0);
        let s = mesh.summary();
        assert_eq!(s.vertex_count, 100);
        assert!(s.has_texture && s.has_colors);
        assert_abs_diff_eq!(s.bbox_min[0], -1.0);
        assert_abs_diff_eq!(s.bbox_max[1], 1.0);
        assert_abs_diff_eq!(s.bbox_min[2], 0.0);
        assert_abs_diff_eq!(s.bbox_max[2], 18.0 / 19.0, epsilon = 1e-6);
    }
}
