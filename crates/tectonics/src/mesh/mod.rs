//! Triangulated sphere topology shared by the Crust, Data and Render layers.

pub mod icosphere;
pub mod template;

pub use icosphere::icosphere;
pub use template::{MeshTemplate, load_template, read_template, write_template};

use crate::geometry::SphericalTriangle;
use glam::Vec3;
use std::collections::HashMap;

/// Which of the three parallel topologies a mesh belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshLayer {
    Crust,
    Data,
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrogenyType {
    #[default]
    None,
    /// Raised by oceanic subduction under a plate
    Andean,
    /// Raised by a continent-continent collision
    Himalayan,
}

impl OrogenyType {
    pub fn to_code(self) -> i32 {
        match self {
            OrogenyType::None => 0,
            OrogenyType::Andean => 1,
            OrogenyType::Himalayan => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(OrogenyType::None),
            1 => Some(OrogenyType::Andean),
            2 => Some(OrogenyType::Himalayan),
            _ => None,
        }
    }
}

/// Per-vertex simulation attributes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointData {
    pub elevation: f32,
    /// Crust mass proxy
    pub thickness: f32,
    /// Owning plate, `None` before partitioning
    pub plate: Option<usize>,
    pub age: f32,
    pub orogeny: OrogenyType,
}

impl PointData {
    pub fn plate_code(&self) -> i32 {
        self.plate.map_or(-1, |p| p as i32)
    }
}

/// Three vertex indices, clockwise seen from outside, plus the edge-adjacent triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [usize; 3],
    pub neighbors: [Option<usize>; 3],
}

/// Geometry derived from a triangle's vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleGeometry {
    pub barycenter: Vec3,
    pub circumcenter: Vec3,
    pub circumradius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
    pub vertex_neighbors: Vec<Vec<usize>>,
    pub vertex_triangles: Vec<Vec<usize>>,
    pub geometry: Vec<TriangleGeometry>,
}

/// Triangles touching each vertex, in triangle order. Winding does not change the lists.
pub(crate) fn incident_triangles(triangles: &[Triangle], vertex_count: usize) -> Vec<Vec<usize>> {
    let mut incident = vec![Vec::new(); vertex_count];
    for (ti, tri) in triangles.iter().enumerate() {
        for &v in &tri.vertices {
            incident[v].push(ti);
        }
    }
    incident
}

impl Mesh {
    /// Builds a mesh from raw faces, deriving orientation, adjacency and neighbor lists.
    pub fn from_faces(vertices: Vec<Vec3>, faces: &[[usize; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (fi, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                edge_to_faces.entry((a.min(b), a.max(b))).or_default().push(fi);
            }
        }

        let triangles = faces
            .iter()
            .enumerate()
            .map(|(fi, face)| {
                let mut neighbors = [None; 3];
                for k in 0..3 {
                    let (a, b) = (face[k], face[(k + 1) % 3]);
                    neighbors[k] = edge_to_faces[&(a.min(b), a.max(b))]
                        .iter()
                        .copied()
                        .find(|&other| other != fi);
                }
                Triangle {
                    vertices: *face,
                    neighbors,
                }
            })
            .collect::<Vec<_>>();

        let mut vertex_neighbors = vec![Vec::new(); vertices.len()];
        let mut edges: Vec<(usize, usize)> = edge_to_faces.keys().copied().collect();
        edges.sort_unstable();
        for (a, b) in edges {
            vertex_neighbors[a].push(b);
            vertex_neighbors[b].push(a);
        }

        Self::from_parts(vertices, triangles, vertex_neighbors)
    }

    /// Builds a mesh whose adjacency is already known (template files, save files).
    pub fn from_parts(
        vertices: Vec<Vec3>,
        triangles: Vec<Triangle>,
        vertex_neighbors: Vec<Vec<usize>>,
    ) -> Self {
        let vertex_triangles = incident_triangles(&triangles, vertices.len());
        Self::with_incidence(vertices, triangles, vertex_neighbors, vertex_triangles)
    }

    /// Like [`Mesh::from_parts`] when the incident-triangle lists are known as well.
    pub fn with_incidence(
        vertices: Vec<Vec3>,
        triangles: Vec<Triangle>,
        vertex_neighbors: Vec<Vec<usize>>,
        vertex_triangles: Vec<Vec<usize>>,
    ) -> Self {
        let mut mesh = Self {
            vertices,
            triangles,
            vertex_neighbors,
            vertex_triangles,
            geometry: Vec::new(),
        };
        mesh.ensure_clockwise_orientation();
        mesh.refresh_geometry();
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn spherical_triangle(&self, triangle: usize) -> SphericalTriangle {
        let [a, b, c] = self.triangles[triangle].vertices;
        SphericalTriangle::new(self.vertices[a], self.vertices[b], self.vertices[c])
    }

    /// Swaps two vertices of every counter-clockwise triangle. Idempotent.
    pub fn ensure_clockwise_orientation(&mut self) {
        for i in 0..self.triangles.len() {
            let mut tri = self.spherical_triangle(i);
            if tri.ensure_clockwise_orientation() {
                self.triangles[i].vertices.swap(1, 2);
            }
        }
    }

    fn refresh_geometry(&mut self) {
        self.geometry = (0..self.triangles.len())
            .map(|i| {
                let tri = self.spherical_triangle(i);
                let circumcenter = tri.circumcenter();
                TriangleGeometry {
                    barycenter: tri.barycenter(),
                    circumcenter,
                    circumradius: tri.circumradius(),
                }
            })
            .collect();
    }

    /// Index buffer for a renderer, three indices per triangle.
    pub fn triangle_indices(&self) -> Vec<u32> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.map(|v| v as u32))
            .collect()
    }
}

/// A mesh plus its per-vertex attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub mesh: Mesh,
    pub points: Vec<PointData>,
}

impl Layer {
    pub fn new(mesh: Mesh) -> Self {
        let points = vec![PointData::default(); mesh.vertex_count()];
        Self { mesh, points }
    }

    /// Plate owning the triangle by vertex majority, `None` when all three differ.
    pub fn triangle_plate(&self, triangle: usize) -> Option<usize> {
        let [a, b, c] = self.mesh.triangles[triangle].vertices.map(|v| self.points[v].plate);
        if a == b || a == c {
            a
        } else if b == c {
            b
        } else {
            None
        }
    }

    /// Plate owning the triangle only when all three vertices agree.
    pub fn triangle_owner(&self, triangle: usize) -> Option<usize> {
        let [a, b, c] = self.mesh.triangles[triangle].vertices.map(|v| self.points[v].plate);
        if a == b && b == c { a } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icosahedron_has_closed_adjacency() {
        let mesh = icosphere(0);
        for (ti, tri) in mesh.triangles.iter().enumerate() {
            for n in tri.neighbors {
                let n = n.expect("closed sphere has no boundary edges");
                assert!(mesh.triangles[n].neighbors.contains(&Some(ti)));
            }
        }
    }

    #[test]
    fn every_triangle_is_clockwise() {
        let mesh = icosphere(2);
        for i in 0..mesh.triangle_count() {
            assert!(mesh.spherical_triangle(i).is_clockwise());
        }
    }

    #[test]
    fn triangle_plate_uses_majority() {
        let mut layer = Layer::new(icosphere(0));
        let [a, b, c] = layer.mesh.triangles[0].vertices;
        layer.points[a].plate = Some(1);
        layer.points[b].plate = Some(1);
        layer.points[c].plate = Some(2);
        assert_eq!(layer.triangle_plate(0), Some(1));
        assert_eq!(layer.triangle_owner(0), None);
        layer.points[c].plate = Some(1);
        assert_eq!(layer.triangle_owner(0), Some(1));
    }

    #[test]
    fn orogeny_codes_round_trip() {
        for o in [OrogenyType::None, OrogenyType::Andean, OrogenyType::Himalayan] {
            assert_eq!(OrogenyType::from_code(o.to_code()), Some(o));
        }
        assert_eq!(OrogenyType::from_code(9), None);
    }
}
