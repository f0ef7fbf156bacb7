//! The three acceleration-structure strategies a group can be backed by.
//!
//! Exactly one strategy is active per group, chosen from the [`Backend`] that was selected when
//! the scene was configured. The choice is made once at construction; query paths match on the
//! already-chosen variant instead of re-deciding per call.

pub mod bvh;

use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use shape::gpu::BlasHandle;
use shape::hwaccel::HwCommittedScene;

use crate::registry::{RegistryBridge, ShapeRegistry};

/// The execution mode the renderer was configured for. Selected once, before any group is
/// built; groups constructed from different backends are not interchangeable.
#[derive(Clone)]
pub enum Backend {
    /// Scalar execution backed by the software primitive index.
    Scalar,
    /// Vectorized CPU execution backed by a hardware ray-tracing engine scene. Hit records
    /// carry registry identifiers, so the backend needs the registry that assigned them.
    Vectorized(Arc<dyn ShapeRegistry>),
    /// GPU execution backed by bottom-level/top-level structures.
    Gpu,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Scalar => write!(f, "Backend::Scalar"),
            Backend::Vectorized(_) => write!(f, "Backend::Vectorized"),
            Backend::Gpu => write!(f, "Backend::Gpu"),
        }
    }
}

/// The per-group acceleration structure: the one concrete strategy this group was built with.
pub(crate) enum GroupAccel {
    /// Built eagerly during group construction; immutable afterwards.
    Software(bvh::PrimBvh),
    /// The engine scene is built lazily, on the first geometry-handle request, and at most
    /// once; the bridge translating child ordinals to registry identifiers is populated
    /// eagerly because hit records may refer to the group before its scene is ever requested.
    Hardware {
        scene: OnceCell<Arc<HwCommittedScene>>,
        bridge: RegistryBridge,
        registry: Arc<dyn ShapeRegistry>,
    },
    /// The bottom-level structure is built lazily per instancing request; the offset into the
    /// hit-record table is recorded whenever the table is (re)filled.
    Gpu {
        blas: OnceCell<Arc<BlasHandle>>,
        sbt_offset: AtomicU32,
    },
}
