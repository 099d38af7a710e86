//! Plate rotation and the subduction-priority matrix.

use super::TectonicPlanet;
use super::plate::Plate;
use log::debug;
use std::cmp::Ordering;

/// Antisymmetric plate-pair table. `get(i, j) == 1` means plate `i` subducts under `j`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapMatrix {
    size: usize,
    values: Vec<i32>,
}

impl OverlapMatrix {
    /// Decides every pair: continental beats oceanic, otherwise the denser plate wins,
    /// and equal densities fall back to the lower index. This is a total order, so the
    /// matrix never contains a cycle.
    pub fn from_plates(plates: &[Plate]) -> Self {
        let size = plates.len();
        let mut values = vec![0; size * size];
        for i in 0..size {
            for j in (i + 1)..size {
                let i_wins = priority(plates, i, j) == Ordering::Greater;
                let (loser, winner) = if i_wins { (j, i) } else { (i, j) };
                values[loser * size + winner] = 1;
                values[winner * size + loser] = -1;
            }
        }
        Self { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> i32 {
        self.values[i * self.size + j]
    }

    pub fn subducts_under(&self, i: usize, j: usize) -> bool {
        self.get(i, j) == 1
    }

    /// Of two plates, the one the other subducts under.
    pub fn overriding(&self, i: usize, j: usize) -> usize {
        if self.subducts_under(i, j) { j } else { i }
    }

    pub fn row(&self, i: usize) -> &[i32] {
        &self.values[i * self.size..(i + 1) * self.size]
    }
}

fn priority(plates: &[Plate], i: usize, j: usize) -> Ordering {
    let (a, b) = (&plates[i], &plates[j]);
    (!a.is_oceanic())
        .cmp(&!b.is_oceanic())
        .then(a.density().total_cmp(&b.density()))
        .then(j.cmp(&i))
}

impl TectonicPlanet {
    /// Advances every plate's accumulated rotation by one step.
    pub fn move_plates(&mut self) {
        let step_time = self.config.simulation.step_time;
        let renormalize = self.config.simulation.renormalize_transforms;
        for plate in &mut self.plates {
            plate.advance(step_time, renormalize);
        }
        debug!("Moved {} plates by step time {}", self.plates.len(), step_time);
    }

    /// Recomputes the overlap matrix from current plate mass and type.
    pub fn calculate_plates_vp(&mut self) {
        self.overlap = OverlapMatrix::from_plates(&self.plates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn plate(mass: f32, plate_type: f32, vertices: usize) -> Plate {
        let mut p = Plate::new(Vec3::Y, 0.0, Vec3::X);
        p.mass = mass;
        p.plate_type = plate_type;
        p.vertices = (0..vertices).collect();
        p
    }

    #[test]
    fn continental_always_overrides_oceanic() {
        let plates = vec![plate(100.0, 5.0, 10), plate(900.0, -5.0, 10)];
        let m = OverlapMatrix::from_plates(&plates);
        assert!(m.subducts_under(1, 0));
        assert_eq!(m.get(0, 1), -1);
        assert_eq!(m.overriding(0, 1), 0);
    }

    #[test]
    fn denser_plate_wins_within_a_category() {
        let plates = vec![plate(100.0, -1.0, 10), plate(300.0, -1.0, 10)];
        let m = OverlapMatrix::from_plates(&plates);
        assert!(m.subducts_under(0, 1));
    }

    #[test]
    fn matrix_is_antisymmetric_with_zero_diagonal() {
        let plates: Vec<Plate> = (0..6)
            .map(|i| plate(10.0 * (i % 3) as f32, if i % 2 == 0 { 1.0 } else { -1.0 }, 4))
            .collect();
        let m = OverlapMatrix::from_plates(&plates);
        for i in 0..6 {
            assert_eq!(m.get(i, i), 0);
            for j in 0..6 {
                assert_eq!(m.get(i, j), -m.get(j, i));
                if i != j {
                    assert_ne!(m.get(i, j), 0);
                }
            }
        }
    }

    #[test]
    fn same_category_order_is_transitive() {
        let plates: Vec<Plate> = [3.0, 1.0, 2.0, 1.0, 5.0]
            .iter()
            .map(|&mass| plate(mass, 2.0, 1))
            .collect();
        let m = OverlapMatrix::from_plates(&plates);
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..5 {
                    if m.subducts_under(i, j) && m.subducts_under(j, k) {
                        assert!(m.subducts_under(i, k), "{i} < {j} < {k} but not {i} < {k}");
                    }
                }
            }
        }
    }
}
