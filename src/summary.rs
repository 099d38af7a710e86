use std::fmt;
use tectonics::TectonicPlanet;

/// Human-readable overview of a planet, printed by `inspect` and after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetSummary {
    pub data_vertices: usize,
    pub data_triangles: usize,
    pub render_vertices: Option<usize>,
    pub plates: usize,
    pub continental_plates: usize,
    pub continental_fraction: f32,
    pub total_steps: u32,
    pub steps_since_resample: u32,
    pub min_elevation: f32,
    pub max_elevation: f32,
    pub mean_elevation: f32,
}

impl PlanetSummary {
    pub fn from_planet(planet: &TectonicPlanet) -> Self {
        let points = &planet.data().points;
        let (min, max, sum) = points.iter().fold((f32::MAX, f32::MIN, 0.0), |(lo, hi, sum), p| {
            (lo.min(p.elevation), hi.max(p.elevation), sum + p.elevation)
        });
        let (min_elevation, max_elevation, mean_elevation) = if points.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (min, max, sum / points.len() as f32)
        };
        Self {
            data_vertices: planet.data().mesh.vertex_count(),
            data_triangles: planet.data().mesh.triangle_count(),
            render_vertices: planet.render().map(|r| r.mesh.vertex_count()),
            plates: planet.plates().len(),
            continental_plates: planet.plates().iter().filter(|p| !p.is_oceanic()).count(),
            continental_fraction: planet.continental_fraction(),
            total_steps: planet.total_steps(),
            steps_since_resample: planet.steps_since_resample(),
            min_elevation,
            max_elevation,
            mean_elevation,
        }
    }
}

impl fmt::Display for PlanetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "data mesh: {} vertices, {} triangles", self.data_vertices, self.data_triangles)?;
        match self.render_vertices {
            Some(n) => writeln!(f, "render mesh: {n} vertices")?,
            None => writeln!(f, "render mesh: none")?,
        }
        writeln!(
            f,
            "plates: {} ({} continental, {:.1}% of crust)",
            self.plates,
            self.continental_plates,
            self.continental_fraction * 100.0
        )?;
        writeln!(f, "steps: {} ({} since resample)", self.total_steps, self.steps_since_resample)?;
        write!(
            f,
            "elevation: min {:.2}, max {:.2}, mean {:.2}",
            self.min_elevation, self.max_elevation, self.mean_elevation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tectonics::{TectonicsConfig, icosphere};

    #[test]
    fn summary_reflects_the_planet() {
        let mut planet = TectonicPlanet::new(icosphere(2), TectonicsConfig::default(), 3).unwrap();
        planet.initialize_random_crust();
        let summary = PlanetSummary::from_planet(&planet);
        assert_eq!(summary.data_vertices, 162);
        assert_eq!(summary.data_triangles, 320);
        assert_eq!(summary.plates, 20);
        assert!(summary.min_elevation <= summary.mean_elevation);
        assert!(summary.mean_elevation <= summary.max_elevation);
        assert!(summary.to_string().contains("20 ("));
    }
}
