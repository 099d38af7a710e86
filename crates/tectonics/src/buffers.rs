//! Cache of flattened representations handed to batched kernels.
//!
//! Entries are rebuilt lazily: mutators mark a tag dirty, and [`BufferCache::sync`]
//! rebuilds exactly the dirty entries before the next dispatch that reads them.

use crate::bvh::{Bvh, FlatBvhForest};
use crate::mesh::Layer;
use crate::planet::Plate;
use log::debug;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTag {
    DataBvh,
    PlateBvhs,
    CrustTriangles,
}

impl BufferTag {
    pub const ALL: [BufferTag; 3] = [BufferTag::DataBvh, BufferTag::PlateBvhs, BufferTag::CrustTriangles];
}

#[derive(Debug, Clone)]
pub struct BufferCache {
    dirty: HashSet<BufferTag>,
    data_bvh: FlatBvhForest,
    plate_bvhs: FlatBvhForest,
    crust_triangles: Vec<[u32; 3]>,
}

impl Default for BufferCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferCache {
    /// A cache with every entry dirty.
    pub fn new() -> Self {
        Self {
            dirty: BufferTag::ALL.into_iter().collect(),
            data_bvh: FlatBvhForest::default(),
            plate_bvhs: FlatBvhForest::default(),
            crust_triangles: Vec::new(),
        }
    }

    pub fn invalidate(&mut self, tag: BufferTag) {
        self.dirty.insert(tag);
    }

    pub fn invalidate_all(&mut self) {
        self.dirty.extend(BufferTag::ALL);
    }

    pub fn is_dirty(&self, tag: BufferTag) -> bool {
        self.dirty.contains(&tag)
    }

    /// Rebuilds the dirty entries and returns how many were rebuilt.
    ///
    /// Without a crust layer the plate and crust entries stay dirty and empty.
    pub fn sync(&mut self, data_bvh: &Bvh, plates: &[Plate], crust: Option<&Layer>) -> usize {
        let mut rebuilt = 0;
        if self.dirty.remove(&BufferTag::DataBvh) {
            self.data_bvh = FlatBvhForest::from_trees([Some(data_bvh)]);
            rebuilt += 1;
        }
        let Some(crust) = crust else {
            return rebuilt;
        };
        if self.dirty.remove(&BufferTag::PlateBvhs) {
            self.plate_bvhs = FlatBvhForest::from_trees(plates.iter().map(|p| p.bvh.as_ref()));
            rebuilt += 1;
        }
        if self.dirty.remove(&BufferTag::CrustTriangles) {
            self.crust_triangles = crust
                .mesh
                .triangles
                .iter()
                .map(|t| t.vertices.map(|v| v as u32))
                .collect();
            rebuilt += 1;
        }
        if rebuilt > 0 {
            debug!("Rebuilt {rebuilt} derived buffers");
        }
        rebuilt
    }

    pub fn data_bvh(&self) -> &FlatBvhForest {
        &self.data_bvh
    }

    pub fn plate_bvhs(&self) -> &FlatBvhForest {
        &self.plate_bvhs
    }

    pub fn crust_triangles(&self) -> &[[u32; 3]] {
        &self.crust_triangles
    }

    /// Crust triangle indices as raw bytes.
    pub fn crust_triangle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.crust_triangles)
    }
}
