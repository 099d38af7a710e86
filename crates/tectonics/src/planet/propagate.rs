//! Crust → Data → Render propagation by barycentric interpolation.

use super::TectonicPlanet;
use crate::bvh::search_flat;
use crate::mesh::{OrogenyType, PointData};
use crate::parallel::{KernelId, ParallelBatch};
use log::debug;

/// Blends three vertex records. Plate and orogeny come from the dominant-weight vertex.
pub(crate) fn interpolate(points: &[PointData], vertices: [usize; 3], weights: [f32; 3]) -> PointData {
    let clamped = weights.map(|w| w.max(0.0));
    let total: f32 = clamped.iter().sum();
    let weights = if total > 0.0 {
        clamped.map(|w| w / total)
    } else {
        [1.0 / 3.0; 3]
    };
    let dominant = (0..3)
        .max_by(|&a, &b| weights[a].total_cmp(&weights[b]))
        .unwrap_or(0);
    let blend = |field: fn(&PointData) -> f32| {
        (0..3)
            .map(|k| weights[k] * field(&points[vertices[k]]))
            .sum::<f32>()
    };
    let lead = points[vertices[dominant]];
    PointData {
        elevation: blend(|p| p.elevation),
        thickness: blend(|p| p.thickness),
        plate: lead.plate,
        age: blend(|p| p.age),
        orogeny: lead.orogeny,
    }
}

impl TectonicPlanet {
    /// Samples the moved crust at every Data vertex.
    ///
    /// Each plate is searched in its own frame. When several plates cover a vertex the
    /// overriding one wins; when none does the vertex becomes fresh ridge crust and keeps
    /// its previous plate. Returns the number of such gap vertices.
    pub fn propagate_crust_to_data(&mut self) -> usize {
        self.buffers.sync(&self.data_bvh, &self.plates, self.crust.as_ref());
        let Some(crust) = &self.crust else {
            return 0;
        };

        let forest = self.buffers.plate_bvhs();
        let inverse: Vec<_> = self.plates.iter().map(|p| p.transform.inverse()).collect();
        let overlap = &self.overlap;
        let ridge = self.config.ridge.clone();
        let previous = &self.data.points;
        let positions = &self.data.mesh.vertices;

        let sampled = self.dispatcher.run(KernelId::CrustToData, positions.len(), |v| {
            let world = positions[v];
            let mut winner: Option<(usize, usize, [f32; 3])> = None;
            for (q, rotation) in inverse.iter().enumerate() {
                let local = *rotation * world;
                let Some(t) = search_flat(forest.tree(q), local, |c| crust.mesh.spherical_triangle(c).contains(local))
                else {
                    continue;
                };
                let keep = winner.is_some_and(|(w, _, _)| overlap.overriding(w, q) == w);
                if !keep {
                    let weights = crust.mesh.spherical_triangle(t).barycentric_weights(local);
                    winner = Some((q, t, weights));
                }
            }
            match winner {
                Some((_, t, weights)) => (interpolate(&crust.points, crust.mesh.triangles[t].vertices, weights), true),
                None => (
                    PointData {
                        elevation: ridge.ridge_elevation,
                        thickness: ridge.fresh_thickness,
                        plate: previous[v].plate,
                        age: 0.0,
                        orogeny: OrogenyType::None,
                    },
                    false,
                ),
            }
        });

        let gaps = sampled.iter().filter(|(_, covered)| !covered).count();
        self.data.points = sampled.into_iter().map(|(point, _)| point).collect();
        debug!("Crust propagated to data, {gaps} vertices in divergent gaps");
        gaps
    }

    /// Interpolates Data values onto the Render layer, if there is one. Render vertices
    /// are located through the flattened data BVH.
    pub fn propagate_data_to_render(&mut self) {
        self.buffers.sync(&self.data_bvh, &self.plates, self.crust.as_ref());
        let Some(render) = &self.render else {
            return;
        };
        let data = &self.data;
        let tree = self.buffers.data_bvh().tree(0);
        let positions = &render.mesh.vertices;

        let sampled = self.dispatcher.run(KernelId::DataToRender, positions.len(), |v| {
            let point = positions[v];
            match search_flat(tree, point, |t| data.mesh.spherical_triangle(t).contains(point)) {
                Some(t) => {
                    let weights = data.mesh.spherical_triangle(t).barycentric_weights(point);
                    interpolate(&data.points, data.mesh.triangles[t].vertices, weights)
                }
                None => PointData::default(),
            }
        });

        if let Some(render) = self.render.as_mut() {
            render.points = sampled;
        }
        debug!("Data propagated to render");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TectonicsConfig;
    use crate::mesh::icosphere;
    use glam::Quat;

    fn point(elevation: f32, plate: usize) -> PointData {
        PointData {
            elevation,
            thickness: 10.0,
            plate: Some(plate),
            age: 2.0,
            orogeny: OrogenyType::None,
        }
    }

    #[test]
    fn interpolation_takes_plate_from_dominant_vertex() {
        let points = [point(0.0, 1), point(3.0, 2), point(6.0, 3)];
        let blended = interpolate(&points, [0, 1, 2], [0.2, 0.7, 0.1]);
        assert_eq!(blended.plate, Some(2));
        assert!((blended.elevation - 2.7).abs() < 1e-5);
        assert!((blended.thickness - 10.0).abs() < 1e-5);
    }

    #[test]
    fn negative_weights_are_clamped() {
        let points = [point(1.0, 0), point(2.0, 0), point(3.0, 0)];
        let blended = interpolate(&points, [0, 1, 2], [1.1, -0.1, 0.0]);
        assert!((blended.elevation - 1.0).abs() < 1e-5);
    }

    fn planet() -> TectonicPlanet {
        let mut config = TectonicsConfig::default();
        config.plates.number_of_centroids = 5;
        let mut planet = TectonicPlanet::new(icosphere(3), config, 17).unwrap();
        planet.initialize_random_crust();
        planet
    }

    #[test]
    fn unmoved_crust_reproduces_data_at_vertices() {
        let mut planet = planet();
        let before = planet.data().points.clone();
        planet.propagate_crust_to_data();
        let owned: Vec<usize> = planet.plates().iter().flat_map(|p| p.triangles.iter().copied()).collect();
        let mesh = &planet.data().mesh;
        for t in owned {
            for v in mesh.triangles[t].vertices {
                let (a, b) = (before[v], planet.data().points[v]);
                assert!((a.elevation - b.elevation).abs() < 1e-3, "vertex {v}");
                assert_eq!(a.plate, b.plate);
            }
        }
    }

    #[test]
    fn uncovered_vertices_become_ridge_crust() {
        let mut planet = planet();
        for point in &mut planet.crust.as_mut().unwrap().points {
            point.age = 1.0;
        }
        // Off the original grid, plate-less boundary triangles leave gaps.
        for plate in &mut planet.plates {
            plate.transform = Quat::from_rotation_y(0.4) * plate.transform;
        }
        let gaps = planet.propagate_crust_to_data();
        assert!(gaps > 0);
        let ridge = planet.config().ridge.clone();
        let fresh = planet.data().points.iter().filter(|p| p.age == 0.0).count();
        assert_eq!(fresh, gaps);
        for p in &planet.data().points {
            if p.age == 0.0 {
                assert_eq!(p.elevation, ridge.ridge_elevation);
                assert_eq!(p.thickness, ridge.fresh_thickness);
                assert!(p.plate.is_some());
            }
        }
    }

    #[test]
    fn render_layer_follows_data() {
        let mut planet = planet();
        planet.set_render_mesh(icosphere(4));
        let render = planet.render().unwrap();
        assert_eq!(render.points.len(), render.mesh.vertex_count());
        let data_range = planet
            .data()
            .points
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.elevation), hi.max(p.elevation)));
        for p in &render.points {
            assert!(p.elevation >= data_range.0 - 1e-4 && p.elevation <= data_range.1 + 1e-4);
            assert!(p.plate.is_some());
        }
    }

    #[test]
    fn render_vertices_on_data_vertices_copy_them() {
        let mut planet = planet();
        // Level 3 vertices are a subset of level 4 vertices.
        planet.set_render_mesh(icosphere(4));
        let data = planet.data();
        let render = planet.render().unwrap();
        for (v, position) in data.mesh.vertices.iter().enumerate() {
            let r = render
                .mesh
                .vertices
                .iter()
                .position(|p| p.distance(*position) < 1e-5)
                .unwrap();
            assert!((render.points[r].elevation - data.points[v].elevation).abs() < 1e-3);
        }
        assert!(!planet.buffers.is_dirty(crate::buffers::BufferTag::DataBvh));
    }
}
