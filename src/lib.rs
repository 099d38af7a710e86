//! Headless host for the `tectonics` core: runs simulations, applies the resample
//! policy and reports on saved planets.

mod runner;
mod summary;

pub use runner::{RunSummary, SimulationRunner};
pub use summary::PlanetSummary;
