pub mod triangle;

pub use triangle::{SphericalTriangle, angular_distance, sides_intersect};

use glam::{Quat, Vec3};

/// Combined cap enclosing the caps `(c1, r1)` and `(c2, r2)` (angular radii).
pub fn enclosing_cap(c1: Vec3, r1: f32, c2: Vec3, r2: f32) -> (Vec3, f32) {
    let d = angular_distance(c1, c2);
    if d + r2 <= r1 {
        return (c1, r1);
    }
    if d + r1 <= r2 {
        return (c2, r2);
    }
    let radius = 0.5 * (d + r1 + r2);
    if radius >= std::f32::consts::PI {
        return (c1, std::f32::consts::PI);
    }
    let axis = c1.cross(c2);
    if axis.length_squared() < 1e-12 {
        // Antipodal or coincident centers: no unique arc between them.
        return (c1, radius.max(r1).max(r2));
    }
    let center = Quat::from_axis_angle(axis.normalize(), radius - r1) * c1;
    (center.normalize(), radius)
}

/// Evenly spread unit vectors on a Fibonacci spiral.
pub fn fibonacci_sphere(count: usize) -> Vec<Vec3> {
    let golden = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden * i as f32;
            Vec3::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosing_cap_covers_both_inputs() {
        let c1 = Vec3::X;
        let c2 = Vec3::new(1.0, 1.0, 0.0).normalize();
        let (center, radius) = enclosing_cap(c1, 0.1, c2, 0.2);
        assert!(angular_distance(center, c1) + 0.1 <= radius + 1e-4);
        assert!(angular_distance(center, c2) + 0.2 <= radius + 1e-4);
    }

    #[test]
    fn nested_cap_is_returned_unchanged() {
        let (center, radius) = enclosing_cap(Vec3::X, 1.0, Vec3::new(1.0, 0.1, 0.0).normalize(), 0.05);
        assert_eq!(center, Vec3::X);
        assert_eq!(radius, 1.0);
    }

    #[test]
    fn fibonacci_points_are_unit_length() {
        for p in fibonacci_sphere(50) {
            assert!((p.length() - 1.0).abs() < 1e-5);
        }
    }
}
