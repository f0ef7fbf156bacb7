//! Shape registry service and the per-group ordinal-to-identifier bridge.
//!
//! Vectorized hit processing cannot carry shape pointers through wide registers; hit records
//! carry small stable identifiers instead. The renderer's object registry assigns those
//! identifiers; this module defines the lookup interface the hit resolver is handed, plus the
//! buffer each group keeps to translate its child ordinals into identifiers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use shape::Shape;

/// Identifier/shape lookup service. Implemented by the renderer's global object registry;
/// injected into groups running under the vectorized backend so hit resolution never touches
/// ambient global state.
pub trait ShapeRegistry: Send + Sync {
    /// Registers a shape (idempotent) and returns its stable identifier. Identifiers are
    /// nonzero; zero is reserved for "no shape".
    fn register(&self, shape: &Arc<dyn Shape>) -> u32;

    /// The identifier of an already-registered shape.
    fn id_of(&self, shape: &Arc<dyn Shape>) -> Option<u32>;

    /// Resolves a stable identifier back to the shape it was assigned to.
    fn resolve(&self, id: u32) -> Option<Arc<dyn Shape>>;
}

#[derive(Default)]
struct RegistryInner {
    by_ptr: HashMap<usize, u32>,
    shapes: Vec<Arc<dyn Shape>>,
}

/// A `HashMap`-backed registry keyed on shape identity. One of these typically lives alongside
/// the scene graph that owns the shapes.
#[derive(Default)]
pub struct SceneRegistry {
    inner: RwLock<RegistryInner>,
}

fn ptr_key(shape: &Arc<dyn Shape>) -> usize {
    Arc::as_ptr(shape) as *const () as usize
}

impl SceneRegistry {
    pub fn new() -> Arc<SceneRegistry> {
        Arc::new(SceneRegistry::default())
    }
}

impl ShapeRegistry for SceneRegistry {
    fn register(&self, shape: &Arc<dyn Shape>) -> u32 {
        let mut inner = self.inner.write().unwrap();
        let key = ptr_key(shape);
        if let Some(&id) = inner.by_ptr.get(&key) {
            return id;
        }
        inner.shapes.push(Arc::clone(shape));
        let id = inner.shapes.len() as u32; // ids start at 1
        inner.by_ptr.insert(key, id);
        id
    }

    fn id_of(&self, shape: &Arc<dyn Shape>) -> Option<u32> {
        self.inner.read().unwrap().by_ptr.get(&ptr_key(shape)).copied()
    }

    fn resolve(&self, id: u32) -> Option<Arc<dyn Shape>> {
        if id == 0 {
            return None;
        }
        self.inner
            .read()
            .unwrap()
            .shapes
            .get(id as usize - 1)
            .map(Arc::clone)
    }
}

/// Maps a group's child ordinal to the child's stable registry identifier. Populated exactly
/// once at group construction; afterwards the buffer is only gathered from, never written.
pub struct RegistryBridge {
    ids: Vec<u32>,
}

impl RegistryBridge {
    pub fn populate(shapes: &[Arc<dyn Shape>], registry: &dyn ShapeRegistry) -> RegistryBridge {
        let ids = shapes.iter().map(|s| registry.register(s)).collect();
        RegistryBridge { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The registry identifier of the child at `ordinal`.
    pub fn gather(&self, ordinal: u32) -> u32 {
        self.ids[ordinal as usize]
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }
}
