//! Error types for group construction.

use thiserror::Error;

/// Failures detected while aggregating child shapes into an instanced group. Every one of them
/// aborts construction as a whole; there is no partially built group.
#[derive(Error, Debug)]
pub enum GroupError {
    /// A child is itself an instance wrapper.
    #[error("Nested instancing is not permitted")]
    NestedInstancing,

    /// A child is itself a shape group.
    #[error("Nested ShapeGroup is not permitted")]
    NestedGroup,

    /// A child has an emitter attached.
    #[error("Instancing of emitters is not supported")]
    EmitterChild,

    /// A child has a sensor attached.
    #[error("Instancing of sensors is not supported")]
    SensorChild,

    /// A child does not satisfy the shape interface at all.
    #[error("Tried to add an unsupported object of type \"{0}\"")]
    UnsupportedChild(String),

    /// The backend could not allocate its native scene or structure.
    #[error("Acceleration structure allocation failed: {0}")]
    AllocationFailed(String),
}

pub type Result<T> = std::result::Result<T, GroupError>;
