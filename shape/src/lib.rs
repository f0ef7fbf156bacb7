mod mesh;
mod simple;

pub mod gpu;
pub mod hwaccel;

use std::sync::Arc;

use geometry::bbox::BBox;
use geometry::interaction::{HitFlags, SurfaceInteraction};
use geometry::ray::Ray;

use crate::gpu::HitGroupRecord;
use crate::hwaccel::{HwDevice, HwGeometry};

pub use mesh::TriangleMesh;
pub use simple::Sphere;

/// A ray-primitive hit local to one shape: the t-value along the ray and the primitive's own
/// surface parameterization at the hit point.
#[derive(Debug, Clone, Copy)]
pub struct PrimHit {
    pub ray_t: f32,
    pub uv: (f32, f32),
}

/// The compact result of an intersection query against an aggregate of shapes: enough to decide
/// visibility and to recover the full `SurfaceInteraction` later, but nothing more.
///
/// `shape_index` is the ordinal of the owning shape within the queried aggregate and
/// `prim_index` the primitive ordinal within that shape. Hit programs that already know the
/// owning shape (GPU-style pipelines report shapes directly instead of ordinals) fill in
/// `shape`; everyone else leaves it `None` and lets the aggregate resolve the ordinal.
#[derive(Clone)]
pub struct Preliminary {
    pub ray_t: f32,
    pub prim_uv: (f32, f32),
    pub shape_index: u32,
    pub prim_index: u32,
    pub shape: Option<Arc<dyn Shape>>,
}

impl Preliminary {
    pub fn new(ray_t: f32, prim_uv: (f32, f32), shape_index: u32, prim_index: u32) -> Self {
        Preliminary {
            ray_t,
            prim_uv,
            shape_index,
            prim_index,
            shape: None,
        }
    }

    pub fn invalid() -> Self {
        Preliminary {
            ray_t: f32::INFINITY,
            prim_uv: (0.0, 0.0),
            shape_index: 0,
            prim_index: 0,
            shape: None,
        }
    }

    pub fn with_shape(self, shape: Arc<dyn Shape>) -> Self {
        Preliminary {
            shape: Some(shape),
            ..self
        }
    }

    pub fn is_valid(&self) -> bool {
        self.ray_t.is_finite()
    }
}

impl Default for Preliminary {
    fn default() -> Self {
        Self::invalid()
    }
}

impl std::fmt::Debug for Preliminary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preliminary")
            .field("ray_t", &self.ray_t)
            .field("prim_uv", &self.prim_uv)
            .field("shape_index", &self.shape_index)
            .field("prim_index", &self.prim_index)
            .field("shape", &self.shape.as_ref().map(|s| s.summary()))
            .finish()
    }
}

/// Represents the characteristics of an intersectable shape: a bag of primitives with a bounding
/// box, per-primitive intersection routines, and backend-specific geometry handles.
/// - See `mesh.rs` for `TriangleMesh`, `simple.rs` for `Sphere`.
/// - Aggregates of shapes (instanced groups) implement this trait too, which is why
///   `compute_surface_interaction` threads a recursion depth through the call.
pub trait Shape: Send + Sync {
    /// Short lower-case class name, consumed by aggregation layers for topology checks.
    fn type_name(&self) -> &'static str;

    fn summary(&self) -> String;

    fn bbox(&self) -> BBox;

    fn primitive_count(&self) -> u32;

    /// Bounds of one primitive. Used by software spatial indices that organize primitives from
    /// several shapes into a single tree.
    fn prim_bbox(&self, prim_index: u32) -> BBox;

    fn is_mesh(&self) -> bool {
        false
    }
    fn is_emitter(&self) -> bool {
        false
    }
    fn is_sensor(&self) -> bool {
        false
    }

    /// Intersects the ray with a single primitive of this shape.
    fn intersect_prim(&self, prim_index: u32, r: &Ray) -> Option<PrimHit>;

    /// Occlusion-only variant of `intersect_prim`; shapes may shortcut attribute computation.
    fn occludes_prim(&self, prim_index: u32, r: &Ray) -> bool {
        self.intersect_prim(prim_index, r).is_some()
    }

    /// Expands a preliminary hit into the full surface interaction. `depth` counts how many
    /// instancing levels the call has already crossed; shapes that are themselves aggregates
    /// use it to refuse re-entrant traversal. `active` is the execution mask of the query;
    /// inactive lanes produce the default (invalid) interaction.
    fn compute_surface_interaction(
        &self,
        r: &Ray,
        pi: &Preliminary,
        flags: HitFlags,
        depth: u32,
        active: bool,
    ) -> SurfaceInteraction;

    /// The shape's native geometry handle for the hardware ray-tracing backend.
    fn hw_geometry(&self, device: &Arc<HwDevice>) -> HwGeometry;

    /// Appends this shape's hit-group record(s) for the GPU pipeline's shader binding table.
    fn push_hit_records(&self, out: &mut Vec<HitGroupRecord>);
}
