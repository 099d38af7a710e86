use super::Mesh;
use glam::Vec3;
use std::collections::HashMap;

/// Subdivided icosahedron projected onto the unit sphere.
///
/// Level 0 is the icosahedron itself (12 vertices, 20 triangles); every level splits each
/// triangle into four, so level `n` has `20 * 4^n` triangles.
pub fn icosphere(subdivisions: u32) -> Mesh {
    let phi = (1.0 + 5.0_f32.sqrt()) * 0.5;
    let mut vertices: Vec<Vec3> = [
        [-1.0, phi, 0.0],
        [1.0, phi, 0.0],
        [-1.0, -phi, 0.0],
        [1.0, -phi, 0.0],
        [0.0, -1.0, phi],
        [0.0, 1.0, phi],
        [0.0, -1.0, -phi],
        [0.0, 1.0, -phi],
        [phi, 0.0, -1.0],
        [phi, 0.0, 1.0],
        [-phi, 0.0, -1.0],
        [-phi, 0.0, 1.0],
    ]
    .iter()
    .map(|&p| Vec3::from_array(p).normalize())
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vec3>| -> usize {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                vertices.push((vertices[a] + vertices[b]).normalize());
                vertices.len() - 1
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            next.push([a, ab, ca]);
            next.push([b, bc, ab]);
            next.push([c, ca, bc]);
            next.push([ab, bc, ca]);
        }
        faces = next;
    }

    Mesh::from_faces(vertices, &faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 12, 20)]
    #[case(1, 42, 80)]
    #[case(2, 162, 320)]
    fn counts_follow_subdivision(#[case] level: u32, #[case] vertices: usize, #[case] triangles: usize) {
        let mesh = icosphere(level);
        assert_eq!(mesh.vertex_count(), vertices);
        assert_eq!(mesh.triangle_count(), triangles);
    }

    #[test]
    fn euler_characteristic_of_a_sphere() {
        let mesh = icosphere(3);
        let edges: usize = mesh.vertex_neighbors.iter().map(Vec::len).sum::<usize>() / 2;
        let chi = mesh.vertex_count() as i64 - edges as i64 + mesh.triangle_count() as i64;
        assert_eq!(chi, 2);
    }
}
