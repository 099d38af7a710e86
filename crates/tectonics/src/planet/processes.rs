//! Elevation-mutating passes over the crust: subduction uplift, erosion and damping,
//! sediment accretion and continental collisions.
//!
//! Each pass computes new values for every crust vertex in one batch from a snapshot
//! and writes them back afterwards, so no vertex sees a neighbor's updated value.

use super::TectonicPlanet;
use crate::geometry::angular_distance;
use crate::mesh::OrogenyType;
use crate::parallel::{KernelId, ParallelBatch};
use glam::Vec3;
use log::debug;

/// Distance weight of subduction uplift.
///
/// A cubic `1 - 3x² + 2x³` over `[control, max]`, scaled so it integrates to one over
/// that interval. Closer than `control` the weight is the peak value.
pub fn transfer_weight(distance: f32, control: f32, max: f32) -> f32 {
    let span = max - control;
    if span <= 0.0 || distance >= max {
        return 0.0;
    }
    let x = ((distance - control) / span).clamp(0.0, 1.0);
    let k = 1.0 - 3.0 * x * x + 2.0 * x * x * x;
    2.0 * k / span
}

/// Contact moved to world space with the relative speed of its two plates.
#[derive(Debug, Clone, Copy)]
struct WorldContact {
    point: Vec3,
    contacting: usize,
    contacted: usize,
    /// Relative surface speed normalized to `[0, 1]`
    speed: f32,
    avg_elevation: f32,
}

impl TectonicPlanet {
    fn world_contacts(&self) -> Vec<WorldContact> {
        let max_relative = 2.0 * self.config.plates.max_angular_speed;
        self.contacts
            .iter()
            .map(|c| {
                let contacting = &self.plates[c.contacting_plate];
                let contacted = &self.plates[c.contacted_plate];
                let point = contacting.to_world(c.point);
                let relative = (contacting.velocity_at(point) - contacted.velocity_at(point)).length();
                let speed = if max_relative > 0.0 {
                    (relative / max_relative).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                WorldContact {
                    point,
                    contacting: c.contacting_plate,
                    contacted: c.contacted_plate,
                    speed,
                    avg_elevation: c.avg_elevation,
                }
            })
            .collect()
    }

    /// Raises overriding-plate vertices near subduction contacts. With slab pull enabled
    /// the subducting side sinks by a fraction of the same amount. Returns how many
    /// vertices rose.
    pub(crate) fn apply_subduction_uplift(&mut self) -> usize {
        let contacts = self.world_contacts();
        let Some(crust) = &self.crust else {
            return 0;
        };
        if contacts.is_empty() {
            return 0;
        }

        let cfg = self.config.uplift.clone();
        let slab_pull = self.config.simulation.slab_pull;
        let step_time = self.config.simulation.step_time;
        let radius = self.radius;
        let plates = &self.plates;

        let deltas = self.dispatcher.run(KernelId::SubductionUplift, crust.points.len(), |v| {
            let point = crust.points[v];
            let Some(p) = point.plate else {
                return 0.0;
            };
            let world = plates[p].to_world(crust.mesh.vertices[v]);
            let headroom = ((point.elevation - cfg.trench_elevation) / (cfg.max_elevation - cfg.trench_elevation))
                .clamp(0.0, 1.0);
            let mut delta = 0.0;
            for c in &contacts {
                let overriding = c.contacted == p;
                let subducting = slab_pull && c.contacting == p;
                if !overriding && !subducting {
                    continue;
                }
                let distance = angular_distance(world, c.point) * radius;
                let weight = transfer_weight(distance, cfg.control_distance, cfg.max_distance);
                if weight == 0.0 {
                    continue;
                }
                let amount = cfg.base_uplift_rate * weight * c.speed;
                if overriding {
                    delta += amount * (1.0 - headroom * headroom);
                } else {
                    delta -= cfg.slab_pull_factor * amount;
                }
            }
            delta * step_time
        });

        let Some(crust) = self.crust.as_mut() else {
            return 0;
        };
        let mut uplifted = 0;
        for (point, delta) in crust.points.iter_mut().zip(deltas) {
            if delta == 0.0 {
                continue;
            }
            point.elevation = (point.elevation + delta).clamp(cfg.trench_elevation, cfg.max_elevation);
            if delta > 0.0 {
                uplifted += 1;
                if point.elevation >= 0.0 && point.orogeny == OrogenyType::None {
                    point.orogeny = OrogenyType::Andean;
                }
            }
        }
        debug!("Subduction uplift raised {uplifted} vertices");
        uplifted
    }

    /// Erodes high continental crust, damps oceanic crust toward the abyssal baseline,
    /// optionally accretes sediment next to eroding land, and ages every vertex.
    pub(crate) fn apply_erosion_damping(&mut self) {
        let Some(crust) = &self.crust else {
            return;
        };
        let cfg = self.config.erosion.clone();
        let max_elevation = self.config.uplift.max_elevation;
        let trench = self.config.uplift.trench_elevation;
        let sediment = self.config.simulation.sediment_accretion;
        let step_time = self.config.simulation.step_time;

        let updated = self.dispatcher.run(KernelId::ErosionDamping, crust.points.len(), |v| {
            let point = crust.points[v];
            let z = point.elevation;
            let mut dz = 0.0;
            if z > cfg.erosion_threshold {
                dz -= (z / max_elevation) * cfg.erosion_rate;
            } else if z < 0.0 {
                dz += (cfg.oceanic_baseline - z) * cfg.oceanic_damping_rate;
                if sediment {
                    let neighbors = &crust.mesh.vertex_neighbors[v];
                    let land = neighbors
                        .iter()
                        .filter(|&&n| crust.points[n].plate == point.plate)
                        .filter(|&&n| crust.points[n].elevation > cfg.erosion_threshold)
                        .count();
                    if land > 0 {
                        dz += cfg.sediment_rate * land as f32 / neighbors.len() as f32;
                    }
                }
            }
            ((z + dz * step_time).clamp(trench, max_elevation), point.age + step_time)
        });

        if let Some(crust) = self.crust.as_mut() {
            for (point, (elevation, age)) in crust.points.iter_mut().zip(updated) {
                point.elevation = elevation;
                point.age = age;
            }
        }
    }

    /// Domes up the overriding plate around contacts where continental crust meets a
    /// continental plate. Returns how many collision contacts there were.
    pub(crate) fn apply_continental_collisions(&mut self) -> usize {
        let collisions: Vec<WorldContact> = self
            .world_contacts()
            .into_iter()
            .filter(|c| {
                c.avg_elevation >= 0.0 && !self.plates[c.contacting].is_oceanic() && !self.plates[c.contacted].is_oceanic()
            })
            .collect();
        let Some(crust) = &self.crust else {
            return 0;
        };
        if collisions.is_empty() {
            return 0;
        }

        let reach = self.config.collision.collision_distance;
        let coefficient = self.config.collision.collision_coefficient;
        let max_elevation = self.config.uplift.max_elevation;
        let step_time = self.config.simulation.step_time;
        let radius = self.radius;
        let plates = &self.plates;

        let lifts = self.dispatcher.run(KernelId::ContinentalCollision, crust.points.len(), |v| {
            let Some(p) = crust.points[v].plate else {
                return 0.0f32;
            };
            let world = plates[p].to_world(crust.mesh.vertices[v]);
            collisions
                .iter()
                .filter(|c| c.contacted == p)
                .map(|c| {
                    let d = angular_distance(world, c.point) * radius / reach;
                    if d >= 1.0 {
                        0.0
                    } else {
                        let falloff = 1.0 - d * d;
                        coefficient * falloff * falloff
                    }
                })
                .fold(0.0, f32::max)
                * step_time
        });

        if let Some(crust) = self.crust.as_mut() {
            for (point, lift) in crust.points.iter_mut().zip(lifts) {
                if lift > 0.0 {
                    point.elevation = (point.elevation + lift).min(max_elevation);
                    point.orogeny = OrogenyType::Himalayan;
                }
            }
        }
        debug!("{} continental collision contacts", collisions.len());
        collisions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TectonicsConfig;
    use crate::mesh::icosphere;
    use crate::planet::ContactPoint;
    use rstest::rstest;

    #[test]
    fn transfer_weight_integrates_to_one() {
        let (control, max) = (100.0, 1800.0);
        let steps = 10_000;
        let dx = (max - control) / steps as f32;
        let integral: f32 = (0..steps)
            .map(|i| transfer_weight(control + (i as f32 + 0.5) * dx, control, max) * dx)
            .sum();
        assert!((integral - 1.0).abs() < 1e-3, "integral {integral}");
    }

    #[rstest]
    #[case(0.0, 2.0 / 1700.0)]
    #[case(100.0, 2.0 / 1700.0)]
    #[case(1800.0, 0.0)]
    #[case(5000.0, 0.0)]
    fn transfer_weight_edges(#[case] distance: f32, #[case] expected: f32) {
        assert!((transfer_weight(distance, 100.0, 1800.0) - expected).abs() < 1e-7);
    }

    #[test]
    fn degenerate_interval_has_no_weight() {
        assert_eq!(transfer_weight(10.0, 500.0, 500.0), 0.0);
    }

    fn planet_with_contact() -> (TectonicPlanet, usize) {
        let mut config = TectonicsConfig::default();
        config.plates.number_of_centroids = 4;
        let mut planet = TectonicPlanet::new(icosphere(3), config, 8).unwrap();
        planet.initialize_random_crust();
        let (loser, winner) = (0..4)
            .flat_map(|i| (0..4).map(move |j| (i, j)))
            .find(|&(i, j)| planet.overlap().subducts_under(i, j))
            .unwrap();
        let anchor = planet.plates()[winner].vertices[0];
        let anchor_point = planet.crust().unwrap().mesh.vertices[anchor];
        planet.plates[loser].angular_speed = planet.config.plates.max_angular_speed;
        planet.plates[winner].angular_speed = 0.0;
        planet.contacts = vec![ContactPoint {
            occurred: true,
            point: anchor_point,
            avg_elevation: -4.0,
            contacting_plate: loser,
            contacted_plate: winner,
        }];
        (planet, anchor)
    }

    #[test]
    fn uplift_raises_the_overriding_plate_near_the_contact() {
        let (mut planet, anchor) = planet_with_contact();
        let before = planet.crust().unwrap().points[anchor].elevation;
        let raised = planet.apply_subduction_uplift();
        let after = planet.crust().unwrap().points[anchor].elevation;
        assert!(raised > 0);
        assert!(after > before, "{after} <= {before}");
    }

    #[test]
    fn uplift_without_contacts_changes_nothing() {
        let (mut planet, _) = planet_with_contact();
        planet.contacts.clear();
        let before = planet.crust().unwrap().points.clone();
        assert_eq!(planet.apply_subduction_uplift(), 0);
        assert_eq!(planet.crust().unwrap().points, before);
    }

    #[test]
    fn erosion_lowers_land_and_ages_everything() {
        let (mut planet, _) = planet_with_contact();
        let crust = planet.crust.as_mut().unwrap();
        crust.points[0].elevation = 5.0;
        crust.points[1].elevation = -2.0;
        let before = crust.points.clone();
        planet.apply_erosion_damping();
        let after = &planet.crust().unwrap().points;
        assert!(after[0].elevation < 5.0);
        for (b, a) in before.iter().zip(after) {
            assert_eq!(a.age, b.age + 1.0);
            assert!(a.elevation.is_finite());
        }
    }

    #[test]
    fn oceanic_crust_relaxes_toward_the_baseline() {
        let (mut planet, _) = planet_with_contact();
        planet.config.simulation.sediment_accretion = false;
        planet.crust.as_mut().unwrap().points[2].elevation = -1.0;
        planet.apply_erosion_damping();
        let z = planet.crust().unwrap().points[2].elevation;
        assert!(z < -1.0 && z > planet.config.erosion.oceanic_baseline);
    }
}
