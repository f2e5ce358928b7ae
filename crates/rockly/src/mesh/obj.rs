//! Wavefront OBJ export.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::Mesh;

/// Write `mesh` as OBJ: `v x y z r g b`, `vt u v`, then 1-based `f a/a b/b c/c`.
pub fn write_obj<W: Write>(mesh: &Mesh, mut out: W) -> io::Result<()> {
    writeln!(out, "# rockly mesh")?;
    writeln!(out, "# vertices {}", mesh.vertex_count())?;
    writeln!(out, "# faces {}", mesh.face_count())?;

    for v in mesh.iter_vertices() {
        let [x, y, z] = v.position;
        let [r, g, b] = v.color;
        writeln!(out, "v {} {} {} {} {} {}", x, y, z, r, g, b)?;
    }
    for [u, v] in &mesh.texture_coords {
        writeln!(out, "vt {} {}", u, v)?;
    }
    for f in &mesh.faces {
        let (a, b, c) = (f[0] + 1, f[1] + 1, f[2] + 1);
        writeln!(out, "f {a}/{a} {b}/{b} {c}/{c}")?;
    }
    out.flush()
}

/// Create (or truncate) `path` and write `mesh` to it.
pub fn save_obj(mesh: &Mesh, path: impl AsRef<Path>) -> io::Result<()> {
    let file = File::create(path)?;
    write_obj(mesh, BufWriter::new(file))
}
