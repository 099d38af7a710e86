//! Splitting the largest plate in two.

use super::TectonicPlanet;
use super::plate::Plate;
use crate::error::{Result, TectonicsError};
use crate::random::RandomEngine;
use glam::Vec3;
use log::{info, warn};

/// Chooses which vertices of a plate move to the newly rifted plate.
pub trait RiftPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `positions` are the member vertices in the plate's local frame. Returns one flag per
    /// position, `true` for the vertices that leave.
    fn split(&self, positions: &[Vec3], centroid: Vec3, rng: &mut RandomEngine) -> Vec<bool>;
}

/// Picks a random member as a second seed and the member farthest from it as the first,
/// then assigns each vertex to the closer seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecondaryCentroidRift;

impl RiftPolicy for SecondaryCentroidRift {
    fn name(&self) -> &'static str {
        "secondary_centroid"
    }

    fn split(&self, positions: &[Vec3], _centroid: Vec3, rng: &mut RandomEngine) -> Vec<bool> {
        if positions.is_empty() {
            return Vec::new();
        }
        let secondary = positions[rng.range_usize(0, positions.len())];
        let primary = positions
            .iter()
            .copied()
            .min_by(|a, b| a.dot(secondary).total_cmp(&b.dot(secondary)))
            .unwrap_or(secondary);
        positions.iter().map(|p| p.dot(secondary) > p.dot(primary)).collect()
    }
}

/// Cuts along a random great circle through the plate centroid.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreatCircleRift;

impl RiftPolicy for GreatCircleRift {
    fn name(&self) -> &'static str {
        "great_circle"
    }

    fn split(&self, positions: &[Vec3], centroid: Vec3, rng: &mut RandomEngine) -> Vec<bool> {
        let mut normal = centroid.cross(rng.unit_vector());
        if normal.length_squared() < 1e-12 {
            normal = centroid.any_orthonormal_vector();
        }
        let normal = normal.normalize();
        positions.iter().map(|p| p.dot(normal) > 0.0).collect()
    }
}

impl TectonicPlanet {
    /// Splits the plate with the most vertices using the configured rift policy.
    ///
    /// Returns the index of the new plate, or `None` when the split would leave one side
    /// empty.
    pub fn forced_plate_rift(&mut self) -> Result<Option<usize>> {
        let Some(crust) = &self.crust else {
            return Err(TectonicsError::NotInitialized);
        };
        let Some(parent) = (0..self.plates.len()).max_by_key(|&p| (self.plates[p].vertices.len(), usize::MAX - p))
        else {
            return Ok(None);
        };

        let members = self.plates[parent].vertices.clone();
        if members.len() < 2 {
            return Ok(None);
        }
        let positions: Vec<Vec3> = members.iter().map(|&v| crust.mesh.vertices[v]).collect();
        let centroid = self.plates[parent].centroid;
        let leaving = self.rift_policy.split(&positions, centroid, &mut self.rng);
        let moved = leaving.iter().filter(|&&l| l).count();
        if moved == 0 || moved == members.len() {
            warn!("Rift of plate {parent} left one side empty, skipped");
            return Ok(None);
        }

        let axis = self.rng.unit_vector();
        let speed = self.rng.range_f32(0.0, self.config.plates.max_angular_speed);
        let mut child = Plate::new(axis, speed, centroid);
        child.transform = self.plates[parent].transform;
        let index = self.plates.len();
        self.plates.push(child);

        if let Some(crust) = self.crust.as_mut() {
            for (&v, _) in members.iter().zip(&leaving).filter(|(_, l)| **l) {
                crust.points[v].plate = Some(index);
            }
        }
        self.rebuild_plates();

        info!(
            "Plate {parent} rifted with {} policy: {moved} of {} vertices form plate {index}",
            self.rift_policy.name(),
            members.len()
        );
        Ok(Some(index))
    }
}
