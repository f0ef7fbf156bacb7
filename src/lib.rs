//! Instanced-geometry acceleration structures.
//!
//! A [`ShapeGroup`] aggregates a list of shapes into a single intersectable unit that can be
//! referenced by any number of transformed [`Instance`]s without duplicating geometry. The group
//! builds the spatial index matching the active execution [`Backend`]:
//!
//! - **software index** (scalar execution): a BVH over every child primitive, built eagerly at
//!   construction and queried with scalar nearest-hit / any-hit routines;
//! - **hardware scene** (vectorized CPU execution): the children's native geometry handles are
//!   attached to an engine scene that is committed lazily, at most once; the group only ever
//!   hands out instance handles against that scene;
//! - **GPU pipeline**: a bottom-level structure per group plus shader-binding-table offset
//!   bookkeeping, assembled into the parent's top-level structure.
//!
//! Hit records coming back from any backend are resolved to the owning child shape by the
//! group's hit resolver, which also guards against re-entrant instance traversal.

pub mod accel;
pub mod error;
pub mod group;
pub mod instance;
pub mod registry;

pub use accel::Backend;
pub use error::GroupError;
pub use group::{SceneObject, ShapeGroup};
pub use instance::Instance;
pub use registry::{RegistryBridge, SceneRegistry, ShapeRegistry};
