use crate::bvh::Bvh;
use glam::{Quat, Vec3};

/// A rigid piece of crust. Membership lists index into the planet's Crust layer.
#[derive(Debug, Clone)]
pub struct Plate {
    pub vertices: Vec<usize>,
    /// Triangles whose three vertices all belong to this plate
    pub triangles: Vec<usize>,
    /// Owned triangles touching a triangle of another plate
    pub border_triangles: Vec<usize>,
    /// Rotation axis in the plate's local frame
    pub rotation_axis: Vec3,
    /// Radians per unit of step time
    pub angular_speed: f32,
    /// Rotation accumulated since the last resample
    pub transform: Quat,
    pub centroid: Vec3,
    /// Sum of member thickness
    pub mass: f32,
    /// Sum of member elevation; negative means oceanic
    pub plate_type: f32,
    pub bvh: Option<Bvh>,
}

impl Plate {
    pub fn new(rotation_axis: Vec3, angular_speed: f32, centroid: Vec3) -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            border_triangles: Vec::new(),
            rotation_axis,
            angular_speed,
            transform: Quat::IDENTITY,
            centroid,
            mass: 0.0,
            plate_type: 0.0,
            bvh: None,
        }
    }

    pub fn is_oceanic(&self) -> bool {
        self.plate_type < 0.0
    }

    /// Mass per member vertex, zero for an empty plate.
    pub fn density(&self) -> f32 {
        if self.vertices.is_empty() {
            0.0
        } else {
            self.mass / self.vertices.len() as f32
        }
    }

    pub fn world_axis(&self) -> Vec3 {
        self.transform * self.rotation_axis
    }

    /// Surface velocity (unit sphere) at a world-space point.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.world_axis().cross(point) * self.angular_speed
    }

    /// Composes one incremental rotation of `angular_speed * step_time` radians.
    pub fn advance(&mut self, step_time: f32, renormalize: bool) {
        let increment = Quat::from_axis_angle(self.rotation_axis, self.angular_speed * step_time);
        self.transform *= increment;
        if renormalize {
            self.transform = self.transform.normalize();
        }
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.transform * local
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.transform.inverse() * world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn advancing_rotates_about_the_axis() {
        let mut plate = Plate::new(Vec3::Y, FRAC_PI_2, Vec3::X);
        plate.advance(1.0, true);
        let moved = plate.to_world(Vec3::X);
        assert!(moved.distance(Vec3::NEG_Z) < 1e-5, "moved to {moved}");
        assert!(plate.to_local(moved).distance(Vec3::X) < 1e-5);
    }

    #[test]
    fn renormalized_transform_stays_unit_length() {
        let mut plate = Plate::new(Vec3::new(0.3, 0.9, 0.1).normalize(), 0.013, Vec3::X);
        for _ in 0..10_000 {
            plate.advance(1.0, true);
        }
        assert!((plate.transform.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn density_of_empty_plate_is_zero() {
        let plate = Plate::new(Vec3::Y, 0.1, Vec3::X);
        assert_eq!(plate.density(), 0.0);
    }

    #[test]
    fn velocity_is_tangent() {
        let plate = Plate::new(Vec3::Y, 0.5, Vec3::X);
        let v = plate.velocity_at(Vec3::X);
        assert!(v.dot(Vec3::X).abs() < 1e-6);
        assert!((v.length() - 0.5).abs() < 1e-6);
    }
}
