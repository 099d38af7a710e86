//! Border triangles and cross-plate contact detection.

use super::TectonicPlanet;
use crate::bvh::search_flat;
use crate::geometry::SphericalTriangle;
use crate::parallel::{KernelId, ParallelBatch};
use glam::Vec3;
use log::debug;

/// Result of testing one border triangle against one candidate plate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub occurred: bool,
    /// Barycenter of the tested triangle in the subducting plate's local frame
    pub point: Vec3,
    /// Mean elevation of the tested triangle
    pub avg_elevation: f32,
    /// Plate that subducts
    pub contacting_plate: usize,
    /// Plate that overrides
    pub contacted_plate: usize,
}

impl TectonicPlanet {
    /// Marks owned triangles with an edge neighbor whose majority plate differs.
    pub fn determine_border_triangles(&mut self) {
        let Some(crust) = &self.crust else {
            return;
        };
        for (index, plate) in self.plates.iter_mut().enumerate() {
            plate.border_triangles = plate
                .triangles
                .iter()
                .copied()
                .filter(|&t| {
                    crust.mesh.triangles[t]
                        .neighbors
                        .iter()
                        .flatten()
                        .any(|&n| crust.triangle_plate(n) != Some(index))
                })
                .collect();
        }
    }

    /// Tests every border triangle against every other plate, in either subduction
    /// direction, and keeps the contacts that occurred. Returns how many were found.
    ///
    /// A contact occurs when the moved barycenter falls inside a triangle of the other
    /// plate. Triangles that only share an edge never count.
    pub(crate) fn compute_contacts(&mut self) -> usize {
        self.buffers.sync(&self.data_bvh, &self.plates, self.crust.as_ref());
        let Some(crust) = &self.crust else {
            self.contacts.clear();
            return 0;
        };

        let forest = self.buffers.plate_bvhs();
        let triangles = self.buffers.crust_triangles();
        let mut jobs = Vec::new();
        for (p, plate) in self.plates.iter().enumerate() {
            for &t in &plate.border_triangles {
                for q in 0..self.plates.len() {
                    if q != p && !forest.tree(q).is_empty() {
                        jobs.push((p, t, q, self.overlap.subducts_under(p, q)));
                    }
                }
            }
        }

        let transforms: Vec<_> = self.plates.iter().map(|p| p.transform).collect();
        let vertices = &crust.mesh.vertices;
        let points = &crust.points;
        let local_triangle = |t: usize| {
            let [a, b, c] = triangles[t].map(|v| vertices[v as usize]);
            SphericalTriangle::new(a, b, c)
        };

        let results = self.dispatcher.run(KernelId::PlateContacts, jobs.len(), |j| {
            let (p, t, q, subducting) = jobs[j];
            let own = local_triangle(t);
            // The tested triangle expressed in the candidate plate's frame.
            let relative = transforms[q].inverse() * transforms[p];
            let moved = own.rotated(relative).barycenter();
            let hit = search_flat(forest.tree(q), moved, |c| local_triangle(c).contains(moved)).is_some();
            let avg_elevation = triangles[t]
                .iter()
                .map(|&v| points[v as usize].elevation)
                .sum::<f32>()
                / 3.0;
            if subducting {
                ContactPoint {
                    occurred: hit,
                    point: own.barycenter(),
                    avg_elevation,
                    contacting_plate: p,
                    contacted_plate: q,
                }
            } else {
                ContactPoint {
                    occurred: hit,
                    point: moved,
                    avg_elevation,
                    contacting_plate: q,
                    contacted_plate: p,
                }
            }
        });

        self.contacts = results.into_iter().filter(|c| c.occurred).collect();
        debug!("{} contacts from {} border tests", self.contacts.len(), jobs.len());
        self.contacts.len()
    }
}
