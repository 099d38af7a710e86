use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// Every tunable of the simulation. Held by the planet and never mutated while it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TectonicsConfig {
    pub generation: GenerationConfig,
    pub plates: PlateConfig,
    pub bvh: BvhConfig,
    pub simulation: SimulationConfig,
    pub uplift: UpliftConfig,
    pub erosion: ErosionConfig,
    pub collision: CollisionConfig,
    pub rifting: RiftConfig,
    pub ridge: RidgeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Planet radius in kilometers
    pub radius: f32,
    /// Multiplier applied to elevation when building effective vertex positions
    pub elevation_scale: f32,
    pub fractal_octaves: usize,
    pub fractal_frequency: f64,
    /// Peak contribution of fractal noise to Data elevation
    pub fractal_amplitude: f32,
    /// How far per-triangle noise vectors displace the noise sample point
    pub noise_jitter: f32,
    /// Number of well-distributed seed triangles for the hill-climb point search
    pub lookup_start_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateConfig {
    /// How many random centroids the Voronoi partition starts from
    pub number_of_centroids: usize,
    /// Probability that a plate gets the continental elevation
    pub land_ratio: f32,
    pub continental_elevation: f32,
    pub oceanic_elevation: f32,
    pub thickness_min: f32,
    pub thickness_max: f32,
    /// Upper bound of the per-plate angular speed (radians per unit of step time)
    pub max_angular_speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BvhConfig {
    /// Window radius of the nearest-neighbor search during clustering
    pub search_radius: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub step_time: f32,
    pub move_plates: bool,
    pub subduction_uplift: bool,
    /// Deepens the subducting side near a contact
    pub slab_pull: bool,
    pub erosion_damping: bool,
    pub sediment_accretion: bool,
    pub continental_collisions: bool,
    pub plate_rifting: bool,
    pub propagate_crust: bool,
    pub propagate_render: bool,
    /// Renormalize plate transforms after each incremental rotation
    pub renormalize_transforms: bool,
    /// Run batched kernels on the rayon thread pool instead of the calling thread
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftConfig {
    /// Distance (km) below which the falloff kernel is flat
    pub control_distance: f32,
    /// Distance (km) beyond which a contact has no influence
    pub max_distance: f32,
    /// Uplift per unit of step time, integrated over the transfer band
    pub base_uplift_rate: f32,
    /// Fraction of the uplift rate applied as subsidence on the subducting side
    pub slab_pull_factor: f32,
    pub max_elevation: f32,
    pub trench_elevation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErosionConfig {
    /// Continental points above this elevation erode
    pub erosion_threshold: f32,
    pub erosion_rate: f32,
    pub oceanic_damping_rate: f32,
    /// Elevation oceanic crust relaxes toward
    pub oceanic_baseline: f32,
    pub sediment_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Radius (km) of the uplift dome around a continental collision
    pub collision_distance: f32,
    /// Uplift per unit of step time at the center of the dome
    pub collision_coefficient: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiftConfig {
    /// Expected rifts per unit of step time while the largest plate is big enough
    pub rift_frequency: f32,
    /// Largest plate must own at least this share of the crust to rift
    pub min_plate_fraction: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeConfig {
    pub ridge_elevation: f32,
    pub fresh_thickness: f32,
}

impl Default for TectonicsConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                radius: 6370.0,
                elevation_scale: 20.0,
                fractal_octaves: 6,
                fractal_frequency: 1.5,
                fractal_amplitude: 0.8,
                noise_jitter: 0.05,
                lookup_start_count: 32,
            },
            plates: PlateConfig {
                number_of_centroids: 20,
                land_ratio: 0.33,
                continental_elevation: 0.5,
                oceanic_elevation: -4.0,
                thickness_min: 5.0,
                thickness_max: 35.0,
                max_angular_speed: 0.02,
            },
            bvh: BvhConfig { search_radius: 20 },
            simulation: SimulationConfig {
                step_time: 1.0,
                move_plates: true,
                subduction_uplift: true,
                slab_pull: true,
                erosion_damping: true,
                sediment_accretion: true,
                continental_collisions: true,
                plate_rifting: false,
                propagate_crust: true,
                propagate_render: true,
                renormalize_transforms: true,
                parallel: true,
            },
            uplift: UpliftConfig {
                control_distance: 100.0,
                max_distance: 1800.0,
                base_uplift_rate: 600.0,
                slab_pull_factor: 0.25,
                max_elevation: 10.0,
                trench_elevation: -10.0,
            },
            erosion: ErosionConfig {
                erosion_threshold: 0.0,
                erosion_rate: 0.03,
                oceanic_damping_rate: 0.04,
                oceanic_baseline: -6.0,
                sediment_rate: 0.3,
            },
            collision: CollisionConfig {
                collision_distance: 4200.0,
                collision_coefficient: 0.05,
            },
            rifting: RiftConfig {
                rift_frequency: 0.05,
                min_plate_fraction: 0.25,
            },
            ridge: RidgeConfig {
                ridge_elevation: -1.0,
                fresh_thickness: 7.0,
            },
        }
    }
}

impl TectonicsConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TectonicsConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn thickness_range(&self) -> Range<f32> {
        self.plates.thickness_min..self.plates.thickness_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_survives_toml_round_trip() {
        let config = TectonicsConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: TectonicsConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_section_is_a_parse_error() {
        let result: std::result::Result<TectonicsConfig, _> = toml::from_str("[bvh]\nsearch_radius = 4\n");
        assert!(result.is_err());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tectonics_config.toml");
        let mut config = TectonicsConfig::default();
        config.plates.number_of_centroids = 7;
        config.save_to_file(&path).unwrap();
        assert_eq!(TectonicsConfig::load_from_file(&path).unwrap(), config);
    }
}
