use super::TectonicPlanet;
use crate::error::{Result, TectonicsError};
use log::debug;

/// What one tectonic step did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub contacts: usize,
    pub uplifted_vertices: usize,
    pub collisions: usize,
    /// Index of the plate created by a rift during this step
    pub rifted: Option<usize>,
    /// Data vertices no plate covered after propagation
    pub gap_vertices: usize,
}

impl TectonicPlanet {
    /// Runs the fixed stage order: move, contacts, uplift, erosion, collisions and
    /// rifting, then propagation. Disabled stages are skipped; contacts always run.
    pub fn tectonic_step(&mut self) -> Result<StepReport> {
        if self.crust.is_none() {
            return Err(TectonicsError::NotInitialized);
        }
        let stages = self.config.simulation.clone();
        let mut report = StepReport::default();

        if stages.move_plates {
            self.move_plates();
        }
        report.contacts = self.compute_contacts();
        if stages.subduction_uplift {
            report.uplifted_vertices = self.apply_subduction_uplift();
        }
        if stages.erosion_damping {
            self.apply_erosion_damping();
        }
        if stages.continental_collisions {
            report.collisions = self.apply_continental_collisions();
        }
        if stages.plate_rifting {
            report.rifted = self.maybe_rift()?;
        }
        if stages.propagate_crust {
            report.gap_vertices = self.propagate_crust_to_data();
        }
        if stages.propagate_render {
            self.propagate_data_to_render();
        }

        self.total_steps += 1;
        self.steps_since_resample += 1;
        debug!("Step {} finished: {:?}", self.total_steps, report);
        Ok(report)
    }

    /// Rifts the largest plate with probability `rift_frequency * step_time` once it
    /// holds at least `min_plate_fraction` of the crust.
    fn maybe_rift(&mut self) -> Result<Option<usize>> {
        let total = self.crust.as_ref().map_or(0, |c| c.points.len());
        let largest = self.plates.iter().map(|p| p.vertices.len()).max().unwrap_or(0);
        if total == 0 || (largest as f32 / total as f32) < self.config.rifting.min_plate_fraction {
            return Ok(None);
        }
        let probability = self.config.rifting.rift_frequency * self.config.simulation.step_time;
        if !self.rng.chance(probability) {
            return Ok(None);
        }
        self.forced_plate_rift()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TectonicsConfig;
    use crate::mesh::icosphere;

    fn planet(config: TectonicsConfig) -> TectonicPlanet {
        let mut planet = TectonicPlanet::new(icosphere(3), config, 64).unwrap();
        planet.initialize_random_crust();
        planet
    }

    #[test]
    fn step_requires_plates() {
        let mut planet = TectonicPlanet::new(icosphere(1), TectonicsConfig::default(), 1).unwrap();
        assert!(matches!(planet.tectonic_step(), Err(TectonicsError::NotInitialized)));
        assert_eq!(planet.total_steps(), 0);
    }

    #[test]
    fn steps_advance_both_counters() {
        let mut planet = planet(TectonicsConfig::default());
        for _ in 0..3 {
            planet.tectonic_step().unwrap();
        }
        assert_eq!(planet.total_steps(), 3);
        assert_eq!(planet.steps_since_resample(), 3);
    }

    #[test]
    fn disabled_stages_leave_the_crust_alone() {
        let mut config = TectonicsConfig::default();
        let s = &mut config.simulation;
        s.move_plates = false;
        s.subduction_uplift = false;
        s.erosion_damping = false;
        s.continental_collisions = false;
        s.plate_rifting = false;
        let mut planet = planet(config);
        let before = planet.crust().unwrap().points.clone();
        let report = planet.tectonic_step().unwrap();
        assert_eq!(report.contacts, 0);
        assert_eq!(report.uplifted_vertices, 0);
        assert_eq!(planet.crust().unwrap().points, before);
    }

    #[test]
    fn plates_move_and_elevations_stay_finite() {
        let mut planet = planet(TectonicsConfig::default());
        let mut contacts = 0;
        for _ in 0..20 {
            contacts += planet.tectonic_step().unwrap().contacts;
        }
        assert!(planet.plates().iter().any(|p| p.transform != glam::Quat::IDENTITY));
        assert!(planet.data().points.iter().all(|p| p.elevation.is_finite()));
        assert!(contacts > 0);
    }

    #[test]
    fn certain_rifting_adds_a_plate() {
        let mut config = TectonicsConfig::default();
        config.plates.number_of_centroids = 3;
        config.simulation.plate_rifting = true;
        config.rifting.rift_frequency = 10.0;
        config.rifting.min_plate_fraction = 0.0;
        let mut planet = planet(config);
        let report = planet.tectonic_step().unwrap();
        assert_eq!(report.rifted, Some(3));
        assert_eq!(planet.plates().len(), 4);
    }
}
