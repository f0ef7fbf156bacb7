//! Handle layer for the hardware ray-tracing backend.
//!
//! The types here mirror the object lifecycle of a hardware-accelerated tracing engine: a
//! `HwDevice` mints geometry handles, an `HwScene` collects attached geometry until it is
//! committed, and a committed scene can only be referenced through instance geometries. Handle
//! ownership follows the engine convention: attaching a geometry moves it into the scene, and a
//! committed scene is immutable for the rest of its life.
//!
//! Geometry buffers may be written asynchronously by a vectorized evaluator; `HwDevice::sync()`
//! is the barrier that retires those writes. Committing a scene with writes still in flight is a
//! correctness bug and is rejected loudly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Factory and synchronization point for hardware geometry handles. One device usually exists
/// per process; everything it hands out stays tied to it.
pub struct HwDevice {
    pending_writes: AtomicU32,
    sync_count: AtomicU32,
    commit_count: AtomicU32,
}

impl HwDevice {
    pub fn new() -> Arc<HwDevice> {
        Arc::new(HwDevice {
            pending_writes: AtomicU32::new(0),
            sync_count: AtomicU32::new(0),
            commit_count: AtomicU32::new(0),
        })
    }

    /// Registers one outstanding asynchronous write to geometry buffers on this device. The
    /// write retires at the next `sync()`.
    pub fn defer_write(&self) {
        self.pending_writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Barrier: retires every outstanding geometry write and drains in-flight tracing kernels.
    pub fn sync(&self) {
        self.pending_writes.store(0, Ordering::SeqCst);
        self.sync_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn pending_writes(&self) -> u32 {
        self.pending_writes.load(Ordering::SeqCst)
    }

    pub fn sync_count(&self) -> u32 {
        self.sync_count.load(Ordering::SeqCst)
    }

    /// How many scenes have been committed against this device.
    pub fn commit_count(&self) -> u32 {
        self.commit_count.load(Ordering::SeqCst)
    }

    fn record_commit(&self) {
        self.commit_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A native geometry handle. Leaf variants describe primitive buffers owned by one shape;
/// `Instance` references a whole committed scene and is the only way a scene crosses into a
/// parent acceleration structure.
pub enum HwGeometry {
    Triangles {
        vertex_count: u32,
        triangle_count: u32,
    },
    Analytic {
        prim_count: u32,
    },
    Instance(Arc<HwCommittedScene>),
}

impl HwGeometry {
    pub fn instance_of(scene: &Arc<HwCommittedScene>) -> HwGeometry {
        HwGeometry::Instance(Arc::clone(scene))
    }

    pub fn prim_count(&self) -> u32 {
        match self {
            HwGeometry::Triangles { triangle_count, .. } => *triangle_count,
            HwGeometry::Analytic { prim_count } => *prim_count,
            HwGeometry::Instance(scene) => scene.prim_count(),
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, HwGeometry::Instance(_))
    }

    pub fn instanced_scene(&self) -> Option<&Arc<HwCommittedScene>> {
        match self {
            HwGeometry::Instance(scene) => Some(scene),
            _ => None,
        }
    }
}

/// A scene under construction. Geometries are attached one by one; `commit()` consumes the
/// builder, so the type system rules out attaching to an already-committed scene.
pub struct HwScene {
    device: Arc<HwDevice>,
    geometries: Vec<HwGeometry>,
}

impl HwScene {
    pub fn new(device: &Arc<HwDevice>) -> HwScene {
        HwScene {
            device: Arc::clone(device),
            geometries: Vec::new(),
        }
    }

    /// Attaches a geometry. The handle moves into the scene, which owns it from here on.
    pub fn attach(&mut self, geometry: HwGeometry) {
        self.geometries.push(geometry);
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Builds the internal index over everything attached so far and freezes the scene.
    ///
    /// All asynchronous writes to the attached geometry buffers must have retired before this
    /// point; callers are expected to issue `device.sync()` first.
    pub fn commit(self) -> Arc<HwCommittedScene> {
        assert_eq!(
            self.device.pending_writes(),
            0,
            "scene committed with geometry writes still in flight"
        );
        let prim_count = self.geometries.iter().map(|g| g.prim_count()).sum();
        self.device.record_commit();
        log::trace!(
            "committed hardware scene: {} geometries, {} primitives",
            self.geometries.len(),
            prim_count
        );
        Arc::new(HwCommittedScene {
            device: Arc::clone(&self.device),
            geometries: self.geometries,
            prim_count,
        })
    }
}

/// An immutable, committed scene. Parents reference it through `HwGeometry::Instance` handles;
/// the scene outlives every handle because the handles hold strong references.
pub struct HwCommittedScene {
    device: Arc<HwDevice>,
    geometries: Vec<HwGeometry>,
    prim_count: u32,
}

impl HwCommittedScene {
    pub fn device(&self) -> &Arc<HwDevice> {
        &self.device
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn prim_count(&self) -> u32 {
        self.prim_count
    }
}

impl Drop for HwCommittedScene {
    fn drop(&mut self) {
        // In-flight tracing kernels may still read this scene; drain them before the geometry
        // buffers go away.
        self.device.sync();
    }
}
