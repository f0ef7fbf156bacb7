//! Handle layer for the GPU acceleration-structure backend.
//!
//! A bottom-level structure (`BlasHandle`) indexes the primitives of one exact child-shape
//! list. The top level composes transformed `GpuInstance`s of bottom-level structures. Hit
//! programs are dispatched through a flat table of `HitGroupRecord`s; every aggregate records
//! the table length at fill time as its shader-binding-table offset, so record order is the
//! contract between host and device.

use std::sync::Arc;

use glam::Mat4;

use crate::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Triangles,
    Analytic,
}

/// One hit-group entry of the shader binding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitGroupRecord {
    pub kind: PrimitiveKind,
    pub prim_count: u32,
}

/// A built bottom-level acceleration structure over one list of shapes.
#[derive(Debug)]
pub struct BlasHandle {
    geometry_count: u32,
    prim_count: u32,
    // Cumulative primitive start per geometry; last entry is the total.
    prim_offsets: Vec<u32>,
}

impl BlasHandle {
    pub fn geometry_count(&self) -> u32 {
        self.geometry_count
    }

    pub fn prim_count(&self) -> u32 {
        self.prim_count
    }

    /// The first global primitive ordinal of the given geometry within this structure.
    pub fn prim_offset(&self, geometry_index: u32) -> u32 {
        self.prim_offsets[geometry_index as usize]
    }
}

/// One entry of a top-level structure: a transformed reference to a bottom-level structure.
#[derive(Debug, Clone)]
pub struct GpuInstance {
    pub blas: Arc<BlasHandle>,
    pub instance_id: u32,
    pub sbt_offset: u32,
    pub to_world: Mat4,
}

/// Builds a bottom-level structure over the exact shape list given. Shared by instanced groups
/// and by the top-level scene assembly, so both produce structurally identical handles.
pub fn build_blas(shapes: &[Arc<dyn Shape>]) -> Arc<BlasHandle> {
    let mut prim_offsets = Vec::with_capacity(shapes.len() + 1);
    let mut running = 0u32;
    for shape in shapes {
        prim_offsets.push(running);
        running += shape.primitive_count();
    }
    prim_offsets.push(running);
    log::trace!(
        "built bottom-level structure: {} geometries, {} primitives",
        shapes.len(),
        running
    );
    Arc::new(BlasHandle {
        geometry_count: shapes.len() as u32,
        prim_count: running,
        prim_offsets,
    })
}

/// Appends one hit-group record per shape, in shape order. The caller is responsible for
/// remembering `out.len()` before the call if it needs its table offset.
pub fn fill_hit_records(shapes: &[Arc<dyn Shape>], out: &mut Vec<HitGroupRecord>) {
    for shape in shapes {
        shape.push_hit_records(out);
    }
}
