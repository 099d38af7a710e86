use super::TectonicPlanet;
use crate::parallel::{KernelId, ParallelBatch};
use glam::Vec3;
use log::info;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

impl TectonicPlanet {
    /// Adds fractal detail to Data elevations, and to the crust when plates exist.
    ///
    /// Each vertex samples fBm at its position nudged by the mean noise vector of its
    /// incident triangles. The noise seed is drawn from the planet's engine.
    pub fn generate_fractal_terrain(&mut self) {
        let cfg = self.config.generation.clone();
        let seed = self.rng.next_word();
        let fbm = Fbm::<Perlin>::new(seed)
            .set_octaves(cfg.fractal_octaves)
            .set_frequency(cfg.fractal_frequency);

        let mesh = &self.data.mesh;
        let noise_vectors = &self.triangle_noise;
        let offsets = self.dispatcher.run(KernelId::FractalTerrain, mesh.vertex_count(), |v| {
            let incident = &mesh.vertex_triangles[v];
            let warp = if incident.is_empty() {
                Vec3::ZERO
            } else {
                incident.iter().map(|&t| noise_vectors[t]).sum::<Vec3>() / incident.len() as f32
            };
            let sample = (mesh.vertices[v] + warp * cfg.noise_jitter).as_dvec3();
            fbm.get(sample.to_array()) as f32 * cfg.fractal_amplitude
        });

        for (point, offset) in self.data.points.iter_mut().zip(&offsets) {
            point.elevation += offset;
        }
        // Crust vertex i sits at data vertex i in its plate's local frame.
        if let Some(crust) = self.crust.as_mut() {
            for (point, offset) in crust.points.iter_mut().zip(&offsets) {
                point.elevation += offset;
            }
            self.rebuild_plates();
        }
        self.propagate_data_to_render();

        let peak = offsets.iter().fold(0.0f32, |m, o| m.max(o.abs()));
        info!("Fractal terrain applied with seed {seed}, peak offset {peak:.3}");
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TectonicsConfig;
    use crate::mesh::icosphere;
    use crate::planet::TectonicPlanet;

    fn planet(seed: u32) -> TectonicPlanet {
        let mut planet = TectonicPlanet::new(icosphere(3), TectonicsConfig::default(), seed).unwrap();
        planet.initialize_random_crust();
        planet
    }

    #[test]
    fn terrain_varies_elevation_within_amplitude() {
        let mut planet = planet(6);
        let before: Vec<f32> = planet.data().points.iter().map(|p| p.elevation).collect();
        planet.generate_fractal_terrain();
        let amplitude = planet.config().generation.fractal_amplitude;
        let mut changed = 0;
        for (b, p) in before.iter().zip(&planet.data().points) {
            let d = p.elevation - b;
            assert!(d.abs() <= amplitude * 2.0 + 1e-4);
            if d != 0.0 {
                changed += 1;
            }
        }
        assert!(changed > before.len() / 2);
    }

    #[test]
    fn terrain_is_reproducible_from_the_seed() {
        let mut a = planet(50);
        let mut b = planet(50);
        a.generate_fractal_terrain();
        b.generate_fractal_terrain();
        assert_eq!(a.data().points, b.data().points);
        assert_eq!(a.crust().unwrap().points, b.crust().unwrap().points);
    }

    #[test]
    fn crust_and_data_receive_the_same_detail() {
        let mut planet = planet(8);
        planet.generate_fractal_terrain();
        assert_eq!(planet.crust().unwrap().points, planet.data().points);
    }
}
