use super::TectonicPlanet;
use crate::error::{Result, TectonicsError};
use glam::Quat;
use log::info;

impl TectonicPlanet {
    /// Re-bases the crust on the current Data state: copies Data points 1:1, resets
    /// every plate transform, and rebuilds membership, BVHs, borders and the overlap matrix.
    pub fn resample_crust(&mut self) -> Result<()> {
        let Some(crust) = self.crust.as_mut() else {
            return Err(TectonicsError::NotInitialized);
        };
        crust.points.clone_from(&self.data.points);
        for plate in &mut self.plates {
            plate.transform = Quat::IDENTITY;
        }
        self.contacts.clear();
        self.rebuild_plates();
        info!(
            "Crust resampled after {} steps ({} total)",
            self.steps_since_resample, self.total_steps
        );
        self.steps_since_resample = 0;
        Ok(())
    }
}
