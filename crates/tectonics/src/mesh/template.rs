//! Binary mesh template files.
//!
//! Layout (little-endian): `i32` vertex count, per vertex `f64 x, f64 z, f64 y`, `i32`
//! triangle count, per triangle three `i32` vertex indices, per vertex an `i32` neighbor
//! count followed by that many `i32` indices, per triangle three `i32` neighbor indices
//! (-1 for none).

use super::{Mesh, Triangle, incident_triangles};
use crate::error::{Result, TectonicsError};
use crate::stream::{BinaryReader, BinaryWriter, reserve_for};
use glam::Vec3;
use log::{error, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Topology read from a template, before it becomes a [`Mesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshTemplate {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
    pub vertex_neighbors: Vec<Vec<usize>>,
    pub vertex_triangles: Vec<Vec<usize>>,
}

impl MeshTemplate {
    pub fn into_mesh(self) -> Mesh {
        Mesh::with_incidence(
            self.vertices,
            self.triangles,
            self.vertex_neighbors,
            self.vertex_triangles,
        )
    }
}

pub fn read_template<R: Read>(reader: R) -> Result<MeshTemplate> {
    let mut r = BinaryReader::new(reader);

    let vertex_count = r.read_count("template vertex count")?;
    let mut vertices = Vec::with_capacity(reserve_for(vertex_count));
    for _ in 0..vertex_count {
        let x = r.read_f64("template vertex")?;
        let z = r.read_f64("template vertex")?;
        let y = r.read_f64("template vertex")?;
        vertices.push(Vec3::new(x as f32, y as f32, z as f32).normalize_or_zero());
    }

    let triangle_count = r.read_count("template triangle count")?;
    let mut faces = Vec::with_capacity(reserve_for(triangle_count));
    for _ in 0..triangle_count {
        let a = r.read_index(vertex_count, "template triangle")?;
        let b = r.read_index(vertex_count, "template triangle")?;
        let c = r.read_index(vertex_count, "template triangle")?;
        faces.push([a, b, c]);
    }

    let mut vertex_neighbors = Vec::with_capacity(vertices.len());
    for _ in 0..vertex_count {
        let count = r.read_count("template neighbor count")?;
        let neighbors = (0..count)
            .map(|_| r.read_index(vertex_count, "template vertex neighbor"))
            .collect::<Result<Vec<_>>>()?;
        vertex_neighbors.push(neighbors);
    }

    let mut triangles = Vec::with_capacity(faces.len());
    for vertices in faces {
        let mut neighbors = [None; 3];
        for slot in &mut neighbors {
            *slot = r.read_optional_index(triangle_count, "template triangle neighbor")?;
        }
        triangles.push(Triangle { vertices, neighbors });
    }

    let vertex_triangles = incident_triangles(&triangles, vertices.len());
    Ok(MeshTemplate {
        vertices,
        triangles,
        vertex_neighbors,
        vertex_triangles,
    })
}

pub fn load_template(path: impl AsRef<Path>) -> Result<MeshTemplate> {
    let path = path.as_ref();
    if !path.exists() {
        error!("Mesh template {} does not exist", path.display());
        return Err(TectonicsError::MissingTemplate(path.to_path_buf()));
    }
    let template = read_template(BufReader::new(File::open(path)?))?;
    info!(
        "Loaded mesh template {}: {} vertices, {} triangles",
        path.display(),
        template.vertices.len(),
        template.triangles.len()
    );
    Ok(template)
}

pub fn write_template<W: Write>(mesh: &Mesh, writer: W) -> Result<()> {
    let mut w = BinaryWriter::new(writer);
    w.write_count(mesh.vertex_count())?;
    for v in &mesh.vertices {
        w.write_f64(v.x as f64)?;
        w.write_f64(v.z as f64)?;
        w.write_f64(v.y as f64)?;
    }
    w.write_count(mesh.triangle_count())?;
    for tri in &mesh.triangles {
        for &v in &tri.vertices {
            w.write_count(v)?;
        }
    }
    for neighbors in &mesh.vertex_neighbors {
        w.write_count(neighbors.len())?;
        for &n in neighbors {
            w.write_count(n)?;
        }
    }
    for tri in &mesh.triangles {
        for &n in &tri.neighbors {
            w.write_optional_index(n)?;
        }
    }
    w.flush()
}

pub fn save_template(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    write_template(mesh, BufWriter::new(File::create(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::icosphere;
    use std::io::Cursor;

    #[test]
    fn template_round_trip_preserves_topology() {
        let mesh = icosphere(1);
        let mut bytes = Vec::new();
        write_template(&mesh, &mut bytes).unwrap();
        let template = read_template(Cursor::new(bytes)).unwrap();
        assert_eq!(template.triangles, mesh.triangles);
        assert_eq!(template.vertex_neighbors, mesh.vertex_neighbors);
        assert_eq!(template.vertex_triangles, mesh.vertex_triangles);
        for (a, b) in template.vertices.iter().zip(&mesh.vertices) {
            assert!(a.distance(*b) < 1e-6);
        }

        let rebuilt = template.into_mesh();
        assert_eq!(rebuilt.triangles, mesh.triangles);
        assert_eq!(rebuilt.vertex_triangles, mesh.vertex_triangles);
    }

    #[test]
    fn oversized_count_is_truncation() {
        let bytes = i32::MAX.to_le_bytes().to_vec();
        assert!(matches!(
            read_template(Cursor::new(bytes)),
            Err(TectonicsError::Truncated { .. })
        ));
    }

    #[test]
    fn axis_order_is_x_z_y() {
        let mut bytes = Vec::new();
        let mut w = BinaryWriter::new(&mut bytes);
        w.write_i32(1).unwrap();
        w.write_f64(0.0).unwrap();
        w.write_f64(1.0).unwrap();
        w.write_f64(0.0).unwrap();
        w.write_i32(0).unwrap();
        w.write_i32(0).unwrap();
        let template = read_template(Cursor::new(bytes)).unwrap();
        assert_eq!(template.vertices[0], Vec3::Z);
    }

    #[test]
    fn truncated_template_fails() {
        let mesh = icosphere(0);
        let mut bytes = Vec::new();
        write_template(&mesh, &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            read_template(Cursor::new(bytes)),
            Err(TectonicsError::Truncated { .. })
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = load_template("/definitely/not/here.bin");
        assert!(matches!(result, Err(TectonicsError::MissingTemplate(_))));
    }
}
