//! Batched data-parallel dispatch.
//!
//! Each hot loop of the simulation is issued as one blocking batch: the closure reads a
//! snapshot captured by shared reference and returns one output per element, in index
//! order. No batch mutates planet state while it runs; results are written back by the
//! caller afterwards.

use log::trace;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelId {
    FractalTerrain,
    NearestCentroid,
    BvhNearestNeighbor,
    PlateContacts,
    SubductionUplift,
    ErosionDamping,
    ContinentalCollision,
    CrustToData,
    DataToRender,
}

impl KernelId {
    pub fn name(&self) -> &'static str {
        match self {
            KernelId::FractalTerrain => "fractal_terrain",
            KernelId::NearestCentroid => "nearest_centroid",
            KernelId::BvhNearestNeighbor => "bvh_nearest_neighbor",
            KernelId::PlateContacts => "plate_contacts",
            KernelId::SubductionUplift => "subduction_uplift",
            KernelId::ErosionDamping => "erosion_damping",
            KernelId::ContinentalCollision => "continental_collision",
            KernelId::CrustToData => "crust_to_data",
            KernelId::DataToRender => "data_to_render",
        }
    }
}

/// Capability to run `count` independent invocations of a kernel and collect the results.
pub trait ParallelBatch {
    fn run<O, F>(&self, kernel: KernelId, count: usize, f: F) -> Vec<O>
    where
        O: Send,
        F: Fn(usize) -> O + Sync + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatcher {
    /// Runs every element on the calling thread
    Serial,
    /// Spreads elements over the rayon thread pool
    #[default]
    Rayon,
}

impl Dispatcher {
    pub fn from_flag(parallel: bool) -> Self {
        if parallel {
            Dispatcher::Rayon
        } else {
            Dispatcher::Serial
        }
    }
}

impl ParallelBatch for Dispatcher {
    fn run<O, F>(&self, kernel: KernelId, count: usize, f: F) -> Vec<O>
    where
        O: Send,
        F: Fn(usize) -> O + Sync + Send,
    {
        trace!("dispatch {} over {} elements", kernel.name(), count);
        match self {
            Dispatcher::Serial => (0..count).map(f).collect(),
            Dispatcher::Rayon => (0..count).into_par_iter().map(f).collect(),
        }
    }
}
