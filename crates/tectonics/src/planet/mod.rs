//! The planet aggregate: mesh layers, plates and the simulation state machine.
//!
//! Operations are split by concern into the submodules, each adding methods to
//! [`TectonicPlanet`]. The planet owns every array; plates and triangles refer to each
//! other by index only.

mod contacts;
mod init;
mod motion;
mod plate;
mod processes;
mod propagate;
mod resample;
mod rift;
mod step;
mod terrain;

pub use contacts::ContactPoint;
pub use motion::OverlapMatrix;
pub use plate::Plate;
pub use rift::{GreatCircleRift, RiftPolicy, SecondaryCentroidRift};
pub use step::StepReport;

use crate::buffers::BufferCache;
use crate::bvh::Bvh;
use crate::config::TectonicsConfig;
use crate::error::{Result, TectonicsError};
use crate::geometry::fibonacci_sphere;
use crate::mesh::{Layer, Mesh, MeshLayer};
use crate::parallel::Dispatcher;
use crate::random::RandomEngine;
use glam::Vec3;
use log::{info, warn};

pub struct TectonicPlanet {
    pub(crate) config: TectonicsConfig,
    pub(crate) radius: f32,
    pub(crate) data: Layer,
    pub(crate) data_bvh: Bvh,
    pub(crate) lookup_starts: Vec<usize>,
    /// One random unit vector per data triangle, used to warp fractal noise
    pub(crate) triangle_noise: Vec<Vec3>,
    pub(crate) crust: Option<Layer>,
    pub(crate) render: Option<Layer>,
    pub(crate) plates: Vec<Plate>,
    pub(crate) overlap: OverlapMatrix,
    pub(crate) contacts: Vec<ContactPoint>,
    pub(crate) total_steps: u32,
    pub(crate) steps_since_resample: u32,
    pub(crate) rng: RandomEngine,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) buffers: BufferCache,
    pub(crate) rift_policy: Box<dyn RiftPolicy>,
}

impl TectonicPlanet {
    /// Builds a planet over `mesh` with no plates yet. Fails only for an empty mesh.
    pub fn new(mesh: Mesh, config: TectonicsConfig, seed: u32) -> Result<Self> {
        let mut rng = RandomEngine::new(seed);
        let triangle_noise = (0..mesh.triangle_count()).map(|_| rng.unit_vector()).collect();
        Self::assemble(Layer::new(mesh), config, rng, triangle_noise)
    }

    pub(crate) fn assemble(
        data: Layer,
        config: TectonicsConfig,
        rng: RandomEngine,
        triangle_noise: Vec<Vec3>,
    ) -> Result<Self> {
        if triangle_noise.len() != data.mesh.triangle_count() {
            return Err(TectonicsError::Format(format!(
                "{} noise vectors for {} triangles",
                triangle_noise.len(),
                data.mesh.triangle_count()
            )));
        }
        let dispatcher = Dispatcher::from_flag(config.simulation.parallel);
        let all: Vec<usize> = (0..data.mesh.triangle_count()).collect();
        let data_bvh = Bvh::build(&data.mesh, &all, config.bvh.search_radius, &dispatcher)
            .ok_or_else(|| TectonicsError::Format("data mesh has no triangles".to_string()))?;
        let lookup_starts = compute_lookup_starts(&data.mesh, &data_bvh, config.generation.lookup_start_count);

        info!(
            "Planet built: {} vertices, {} triangles, {} lookup starts",
            data.mesh.vertex_count(),
            data.mesh.triangle_count(),
            lookup_starts.len()
        );

        Ok(Self {
            radius: config.generation.radius,
            config,
            data,
            data_bvh,
            lookup_starts,
            triangle_noise,
            crust: None,
            render: None,
            plates: Vec::new(),
            overlap: OverlapMatrix::default(),
            contacts: Vec::new(),
            total_steps: 0,
            steps_since_resample: 0,
            rng,
            dispatcher,
            buffers: BufferCache::new(),
            rift_policy: Box::new(SecondaryCentroidRift),
        })
    }

    /// Attaches a display mesh and fills it from the Data layer.
    pub fn set_render_mesh(&mut self, mesh: Mesh) {
        self.render = Some(Layer::new(mesh));
        self.propagate_data_to_render();
    }

    pub fn set_rift_policy(&mut self, policy: Box<dyn RiftPolicy>) {
        info!("Rift policy set to {}", policy.name());
        self.rift_policy = policy;
    }

    pub fn config(&self) -> &TectonicsConfig {
        &self.config
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn data(&self) -> &Layer {
        &self.data
    }

    pub fn data_bvh(&self) -> &Bvh {
        &self.data_bvh
    }

    pub fn crust(&self) -> Option<&Layer> {
        self.crust.as_ref()
    }

    pub fn render(&self) -> Option<&Layer> {
        self.render.as_ref()
    }

    pub fn layer(&self, layer: MeshLayer) -> Option<&Layer> {
        match layer {
            MeshLayer::Crust => self.crust.as_ref(),
            MeshLayer::Data => Some(&self.data),
            MeshLayer::Render => self.render.as_ref(),
        }
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    pub fn overlap(&self) -> &OverlapMatrix {
        &self.overlap
    }

    pub fn contacts(&self) -> &[ContactPoint] {
        &self.contacts
    }

    pub fn triangle_noise(&self) -> &[Vec3] {
        &self.triangle_noise
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn steps_since_resample(&self) -> u32 {
        self.steps_since_resample
    }

    pub fn rng(&self) -> &RandomEngine {
        &self.rng
    }

    pub fn buffers(&self) -> &BufferCache {
        &self.buffers
    }

    pub fn is_initialized(&self) -> bool {
        self.crust.is_some()
    }

    /// Share of crust vertices owned by plates with a non-negative type.
    pub fn continental_fraction(&self) -> f32 {
        let Some(crust) = &self.crust else {
            return 0.0;
        };
        if crust.points.is_empty() {
            return 0.0;
        }
        let continental = crust
            .points
            .iter()
            .filter(|p| p.plate.is_some_and(|i| !self.plates[i].is_oceanic()))
            .count();
        continental as f32 / crust.points.len() as f32
    }

    /// Data triangle containing `point`, found by hill climbing from the lookup starts.
    pub fn search_data_triangles_for_point(&self, point: Vec3) -> Option<usize> {
        search_data_triangles(&self.data.mesh, &self.data_bvh, &self.lookup_starts, point)
    }

    /// World-space position of a crust vertex: its plate's rotation applied to the base
    /// direction, lifted by scaled elevation.
    pub fn crust_vertex_position(&self, vertex: usize) -> Option<Vec3> {
        let crust = self.crust.as_ref()?;
        let point = crust.points.get(vertex)?;
        let base = crust.mesh.vertices[vertex];
        let direction = match point.plate.and_then(|p| self.plates.get(p)) {
            Some(plate) => plate.to_world(base),
            None => base,
        };
        Some(direction * self.lifted_radius(point.elevation))
    }

    pub(crate) fn lifted_radius(&self, elevation: f32) -> f32 {
        self.radius + elevation * self.config.generation.elevation_scale
    }

    /// Rebuilds every plate's membership, aggregates and BVH from the crust `plate`
    /// fields, then the border triangles and the overlap matrix.
    pub(crate) fn rebuild_plates(&mut self) {
        let Some(crust) = &self.crust else {
            return;
        };
        for plate in &mut self.plates {
            plate.vertices.clear();
            plate.triangles.clear();
            plate.border_triangles.clear();
            plate.mass = 0.0;
            plate.plate_type = 0.0;
        }

        let plate_count = self.plates.len();
        let mut stray = 0;
        for (v, point) in crust.points.iter().enumerate() {
            match point.plate {
                Some(p) if p < plate_count => {
                    let plate = &mut self.plates[p];
                    plate.vertices.push(v);
                    plate.mass += point.thickness;
                    plate.plate_type += point.elevation;
                }
                Some(_) => stray += 1,
                None => {}
            }
        }
        if stray > 0 {
            warn!("{stray} crust vertices reference a plate that does not exist");
        }

        for t in 0..crust.mesh.triangle_count() {
            if let Some(p) = crust.triangle_owner(t).filter(|&p| p < plate_count) {
                self.plates[p].triangles.push(t);
            }
        }

        let search_radius = self.config.bvh.search_radius;
        for plate in &mut self.plates {
            let sum: Vec3 = plate.vertices.iter().map(|&v| crust.mesh.vertices[v]).sum();
            if sum.length_squared() > 1e-12 {
                plate.centroid = sum.normalize();
            }
            plate.bvh = Bvh::build(&crust.mesh, &plate.triangles, search_radius, &self.dispatcher);
        }

        self.determine_border_triangles();
        self.calculate_plates_vp();
        self.buffers.invalidate(crate::buffers::BufferTag::PlateBvhs);
        self.buffers.invalidate(crate::buffers::BufferTag::CrustTriangles);
    }
}

/// Data triangles nearest to a Fibonacci spread of directions, deduplicated.
fn compute_lookup_starts(mesh: &Mesh, bvh: &Bvh, count: usize) -> Vec<usize> {
    let mut starts: Vec<usize> = fibonacci_sphere(count)
        .into_iter()
        .filter_map(|direction| bvh.search_for_point(mesh, direction))
        .collect();
    starts.sort_unstable();
    starts.dedup();
    starts
}

/// Hill climb over triangle adjacency toward the barycenter closest to `point`, starting
/// from the best lookup start. Falls back to the BVH when the climb ends elsewhere.
pub(crate) fn search_data_triangles(mesh: &Mesh, bvh: &Bvh, starts: &[usize], point: Vec3) -> Option<usize> {
    let closeness = |t: usize| mesh.geometry[t].barycenter.dot(point);
    let Some(mut current) = starts.iter().copied().max_by(|&a, &b| closeness(a).total_cmp(&closeness(b))) else {
        return bvh.search_for_point(mesh, point);
    };

    let mut best = closeness(current);
    loop {
        let next = mesh.triangles[current]
            .neighbors
            .iter()
            .flatten()
            .copied()
            .map(|n| (n, closeness(n)))
            .filter(|&(_, c)| c > best)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match next {
            Some((n, c)) => {
                current = n;
                best = c;
            }
            None => break,
        }
    }

    if mesh.spherical_triangle(current).contains(point) {
        return Some(current);
    }
    mesh.triangles[current]
        .neighbors
        .iter()
        .flatten()
        .copied()
        .find(|&n| mesh.spherical_triangle(n).contains(point))
        .or_else(|| bvh.search_for_point(mesh, point))
}
