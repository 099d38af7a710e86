use log::{debug, info};
use tectonics::{Result, StepReport, TectonicPlanet};

/// Totals over a run of several steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u32,
    pub contacts: usize,
    pub uplifted_vertices: usize,
    pub collisions: usize,
    pub rifts: usize,
    pub resamples: usize,
}

/// Drives a planet step by step and owns the resample policy.
pub struct SimulationRunner {
    planet: TectonicPlanet,
    /// Resample after this many steps; 0 disables resampling
    resample_interval: u32,
}

impl SimulationRunner {
    pub fn new(planet: TectonicPlanet, resample_interval: u32) -> Self {
        Self {
            planet,
            resample_interval,
        }
    }

    /// Partitions the planet into plates, optionally followed by fractal detail.
    pub fn initialize(&mut self, fractal_terrain: bool) {
        self.planet.initialize_random_crust();
        if fractal_terrain {
            self.planet.generate_fractal_terrain();
        }
    }

    /// One tectonic step, then a resample if the interval is reached.
    /// Returns the step report and whether the crust was resampled.
    pub fn step(&mut self) -> Result<(StepReport, bool)> {
        let report = self.planet.tectonic_step()?;
        let due = self.resample_interval > 0 && self.planet.steps_since_resample() >= self.resample_interval;
        if due {
            self.planet.resample_crust()?;
        }
        Ok((report, due))
    }

    pub fn run(&mut self, steps: u32) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for _ in 0..steps {
            let (report, resampled) = self.step()?;
            summary.steps += 1;
            summary.contacts += report.contacts;
            summary.uplifted_vertices += report.uplifted_vertices;
            summary.collisions += report.collisions;
            summary.rifts += usize::from(report.rifted.is_some());
            summary.resamples += usize::from(resampled);
            if summary.steps % 10 == 0 {
                debug!("{} of {steps} steps done", summary.steps);
            }
        }
        info!(
            "Ran {} steps: {} contacts, {} resamples, {} rifts",
            summary.steps, summary.contacts, summary.resamples, summary.rifts
        );
        Ok(summary)
    }

    pub fn planet(&self) -> &TectonicPlanet {
        &self.planet
    }

    pub fn into_planet(self) -> TectonicPlanet {
        self.planet
    }
}
