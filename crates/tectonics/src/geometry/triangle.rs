use glam::Vec3;

/// Below this magnitude a cross product is treated as degenerate.
const DEGENERATE_EPS: f32 = 1e-12;
/// Slack for angular comparisons along an arc, in radians.
const ARC_EPS: f32 = 1e-5;
/// Points closer than this (radians) to an edge's great circle count as on the edge.
const EDGE_EPS: f32 = 1e-5;

/// Great-circle distance (radians) between two unit vectors.
#[inline]
pub fn angular_distance(a: Vec3, b: Vec3) -> f32 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// A triangle whose vertices are unit vectors and whose edges are great-circle arcs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalTriangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl SphericalTriangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// Normalized vertex average.
    pub fn barycenter(&self) -> Vec3 {
        (self.a + self.b + self.c).normalize_or_zero()
    }

    /// Point equidistant from all three vertices, on the outward side.
    pub fn circumcenter(&self) -> Vec3 {
        let n = (self.b - self.a).cross(self.c - self.a);
        if n.length_squared() < DEGENERATE_EPS {
            return self.barycenter();
        }
        let n = if n.dot(self.a) < 0.0 { -n } else { n };
        n.normalize()
    }

    /// Angular radius of the circumscribed cap.
    pub fn circumradius(&self) -> f32 {
        angular_distance(self.a, self.circumcenter())
    }

    /// Signed volume of the tetrahedron (origin, a, b, c).
    ///
    /// Negative for triangles wound clockwise when seen from outside the sphere.
    pub fn signed_volume(&self) -> f32 {
        self.a.dot(self.b.cross(self.c))
    }

    pub fn is_clockwise(&self) -> bool {
        let normal = (self.b - self.a).cross(self.c - self.a);
        normal.dot(self.barycenter()) <= 0.0
    }

    /// Swaps `b` and `c` when the triangle winds counter-clockwise.
    ///
    /// Returns true when a swap happened.
    pub fn ensure_clockwise_orientation(&mut self) -> bool {
        if self.is_clockwise() {
            return false;
        }
        std::mem::swap(&mut self.b, &mut self.c);
        true
    }

    /// Whether `point` (unit vector) lies inside or on the triangle.
    ///
    /// Each edge plane must put the point on the same side as the opposite vertex, and the
    /// point must share the hemisphere of the barycenter, which rules out the antipode.
    /// Points on an edge or a vertex belong to every triangle sharing it.
    pub fn contains(&self, point: Vec3) -> bool {
        if point.dot(self.barycenter()) <= 0.0 {
            return false;
        }
        let edges = [(self.a, self.b, self.c), (self.b, self.c, self.a), (self.c, self.a, self.b)];
        edges.iter().all(|&(p, q, opposite)| {
            let plane = p.cross(q);
            let side = plane.dot(point);
            side.abs() <= EDGE_EPS * plane.length() || side * plane.dot(opposite) >= 0.0
        })
    }

    /// Barycentric weights of `point` with respect to (a, b, c).
    ///
    /// Uses the planar projection built from the edge vectors. Weights sum to one.
    pub fn barycentric_weights(&self, point: Vec3) -> [f32; 3] {
        let v0 = self.b - self.a;
        let v1 = self.c - self.a;
        let v2 = point - self.a;
        let d00 = v0.dot(v0);
        let d01 = v0.dot(v1);
        let d11 = v1.dot(v1);
        let d20 = v2.dot(v0);
        let d21 = v2.dot(v1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < DEGENERATE_EPS {
            return [1.0 / 3.0; 3];
        }
        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        [1.0 - v - w, v, w]
    }

    pub fn edges(&self) -> [(Vec3, Vec3); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    /// True when any vertex of one triangle lies inside the other or any edge pair crosses.
    pub fn collides(&self, other: &SphericalTriangle) -> bool {
        if other.vertices().iter().any(|&v| self.contains(v)) {
            return true;
        }
        if self.vertices().iter().any(|&v| other.contains(v)) {
            return true;
        }
        self.edges().iter().any(|&(p0, p1)| {
            other
                .edges()
                .iter()
                .any(|&(q0, q1)| sides_intersect(p0, p1, q0, q1))
        })
    }

    pub fn rotated(&self, rotation: glam::Quat) -> Self {
        Self {
            a: rotation * self.a,
            b: rotation * self.b,
            c: rotation * self.c,
        }
    }
}

fn lies_on_arc(point: Vec3, start: Vec3, end: Vec3) -> bool {
    let span = angular_distance(start, end);
    angular_distance(start, point) + angular_distance(point, end) <= span + ARC_EPS
}

/// Whether the great-circle arcs `a0-a1` and `b0-b1` cross.
///
/// Arcs on the same great circle have no single crossing point and report true.
pub fn sides_intersect(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> bool {
    let n1 = a0.cross(a1);
    let n2 = b0.cross(b1);
    let line = n1.cross(n2);
    if line.length_squared() < DEGENERATE_EPS {
        return true;
    }
    let candidate = line.normalize();
    [candidate, -candidate]
        .iter()
        .any(|&p| lies_on_arc(p, a0, a1) && lies_on_arc(p, b0, b1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn octant() -> SphericalTriangle {
        // Clockwise seen from outside: X -> Z -> Y.
        SphericalTriangle::new(Vec3::X, Vec3::Z, Vec3::Y)
    }

    #[test]
    fn octant_is_clockwise() {
        let tri = octant();
        assert!(tri.is_clockwise());
        assert!(tri.signed_volume() < 0.0);
    }

    #[test]
    fn orientation_fix_is_idempotent() {
        let mut tri = SphericalTriangle::new(Vec3::X, Vec3::Y, Vec3::Z);
        assert!(tri.ensure_clockwise_orientation());
        let once = tri;
        assert!(!tri.ensure_clockwise_orientation());
        assert_eq!(tri, once);
        assert!(tri.is_clockwise());
    }

    #[rstest]
    #[case(Vec3::new(1.0, 1.0, 1.0), true)]
    #[case(Vec3::new(-1.0, -1.0, -1.0), false)]
    #[case(Vec3::new(1.0, 1.0, -0.2), false)]
    #[case(Vec3::new(0.9, 0.05, 0.05), true)]
    fn contains_cases(#[case] point: Vec3, #[case] expected: bool) {
        assert_eq!(octant().contains(point.normalize()), expected);
    }

    #[test]
    fn contains_own_vertices() {
        let tri = octant();
        for v in tri.vertices() {
            assert!(tri.contains(v));
        }
    }

    #[test]
    fn shared_vertices_are_found_on_a_mesh() {
        let mesh = crate::mesh::icosphere(2);
        for (v, &position) in mesh.vertices.iter().enumerate() {
            let holders = mesh.vertex_triangles[v]
                .iter()
                .filter(|&&t| mesh.spherical_triangle(t).contains(position))
                .count();
            assert_eq!(holders, mesh.vertex_triangles[v].len(), "vertex {v}");
        }
    }

    #[test]
    fn circumcenter_is_equidistant_and_outward() {
        let tri = SphericalTriangle::new(
            Vec3::new(1.0, 0.1, 0.0).normalize(),
            Vec3::new(0.2, 0.1, 1.0).normalize(),
            Vec3::new(0.3, 1.0, 0.2).normalize(),
        );
        let cc = tri.circumcenter();
        let da = angular_distance(cc, tri.a);
        let db = angular_distance(cc, tri.b);
        let dc = angular_distance(cc, tri.c);
        assert!((da - db).abs() < 1e-4 && (db - dc).abs() < 1e-4);
        assert!(cc.dot(tri.a) > 0.0);
        assert!((tri.circumradius() - da).abs() < 1e-6);
    }

    #[test]
    fn crossing_arcs_intersect() {
        let a0 = Vec3::new(1.0, -0.2, 0.0).normalize();
        let a1 = Vec3::new(1.0, 0.2, 0.0).normalize();
        let b0 = Vec3::new(1.0, 0.0, -0.2).normalize();
        let b1 = Vec3::new(1.0, 0.0, 0.2).normalize();
        assert!(sides_intersect(a0, a1, b0, b1));
    }

    #[test]
    fn disjoint_arcs_do_not_intersect() {
        let a0 = Vec3::new(1.0, -0.2, 0.0).normalize();
        let a1 = Vec3::new(1.0, 0.2, 0.0).normalize();
        let b0 = Vec3::new(-1.0, 0.0, -0.2).normalize();
        let b1 = Vec3::new(-1.0, 0.0, 0.2).normalize();
        assert!(!sides_intersect(a0, a1, b0, b1));
    }

    #[test]
    fn parallel_arcs_report_intersection() {
        let a0 = Vec3::new(1.0, 0.0, 0.0);
        let a1 = Vec3::new(0.0, 1.0, 0.0);
        assert!(sides_intersect(a0, a1, a0, a1));
    }

    #[test]
    fn overlapping_triangles_collide() {
        let tri = octant();
        let shifted = tri.rotated(glam::Quat::from_rotation_y(0.2));
        assert!(tri.collides(&shifted));
        let far = SphericalTriangle::new(
            Vec3::new(-1.0, 0.1, 0.05).normalize(),
            Vec3::new(-1.0, -0.05, 0.1).normalize(),
            Vec3::new(-1.0, 0.02, -0.1).normalize(),
        );
        assert!(!tri.collides(&far));
    }

    #[test]
    fn barycentric_weights_of_vertices_and_center() {
        let tri = octant();
        let w = tri.barycentric_weights(tri.b);
        assert!((w[1] - 1.0).abs() < 1e-5);
        let center = (tri.a + tri.b + tri.c) / 3.0;
        let w = tri.barycentric_weights(center);
        for weight in w {
            assert!((weight - 1.0 / 3.0).abs() < 1e-5);
        }
    }
}
