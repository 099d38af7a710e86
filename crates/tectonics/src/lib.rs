//! Plate tectonics on a triangulated sphere.
//!
//! A [`TectonicPlanet`] holds a fixed Data mesh, a plate-owned Crust layer that rotates
//! with its plates, and an optional denser Render layer. Each [`TectonicPlanet::tectonic_step`]
//! moves the plates, finds contacts between them, reshapes elevation and carries the
//! result from Crust to Data to Render.

pub mod buffers;
pub mod bvh;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod mesh_data;
pub mod parallel;
pub mod persist;
pub mod planet;
pub mod random;
pub mod stream;

pub use config::TectonicsConfig;
pub use error::{Result, TectonicsError};
pub use mesh::{Layer, Mesh, MeshLayer, OrogenyType, PointData, icosphere};
pub use mesh_data::{MeshData, ViewMode};
pub use persist::{load_planet, save_planet};
pub use planet::{ContactPoint, OverlapMatrix, Plate, RiftPolicy, StepReport, TectonicPlanet};
pub use random::RandomEngine;
