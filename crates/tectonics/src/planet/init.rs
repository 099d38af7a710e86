use super::TectonicPlanet;
use super::plate::Plate;
use crate::buffers::BufferTag;
use crate::mesh::{Layer, OrogenyType, PointData};
use crate::parallel::{KernelId, ParallelBatch};
use glam::Vec3;
use log::info;

/// Index of the centroid with the smallest great-circle distance to `point`.
/// Ties keep the lower index.
pub(crate) fn nearest_centroid(point: Vec3, centroids: &[Vec3]) -> usize {
    let mut best = 0;
    let mut best_dot = f32::NEG_INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = point.dot(*c);
        if d > best_dot {
            best = i;
            best_dot = d;
        }
    }
    best
}

impl TectonicPlanet {
    /// Partitions the Data mesh into random plates and builds the Crust layer from it.
    ///
    /// Draw order from the engine is fixed (centroids, then per plate axis, speed and
    /// land roll, then per vertex thickness) so a seed always gives the same planet.
    pub fn initialize_random_crust(&mut self) {
        let cfg = self.config.plates.clone();
        let count = cfg.number_of_centroids.max(1);

        let centroids: Vec<Vec3> = (0..count).map(|_| self.rng.unit_vector()).collect();
        let mut plates = Vec::with_capacity(count);
        let mut base_elevation = Vec::with_capacity(count);
        for &centroid in &centroids {
            let axis = self.rng.unit_vector();
            let speed = self.rng.range_f32(0.0, cfg.max_angular_speed);
            let continental = self.rng.chance(cfg.land_ratio);
            base_elevation.push(if continental {
                cfg.continental_elevation
            } else {
                cfg.oceanic_elevation
            });
            plates.push(Plate::new(axis, speed, centroid));
        }

        let mesh = &self.data.mesh;
        let owners = self
            .dispatcher
            .run(KernelId::NearestCentroid, mesh.vertex_count(), |v| {
                nearest_centroid(mesh.vertices[v], &centroids)
            });

        let thickness = self.config.thickness_range();
        for (point, &owner) in self.data.points.iter_mut().zip(&owners) {
            *point = PointData {
                elevation: base_elevation[owner],
                thickness: self.rng.range_f32(thickness.start, thickness.end),
                plate: Some(owner),
                age: 0.0,
                orogeny: OrogenyType::None,
            };
        }

        self.crust = Some(Layer {
            mesh: self.data.mesh.clone(),
            points: self.data.points.clone(),
        });
        self.plates = plates;
        self.contacts.clear();
        self.total_steps = 0;
        self.steps_since_resample = 0;
        self.buffers.invalidate_all();
        self.rebuild_plates();
        self.propagate_data_to_render();

        let continental = self.plates.iter().filter(|p| !p.is_oceanic()).count();
        info!(
            "Initialized {} plates ({} continental), continental fraction {:.3}",
            self.plates.len(),
            continental,
            self.continental_fraction()
        );
    }
}
