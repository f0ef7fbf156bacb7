/// Defines the `BBox` bounding-box type.
pub mod bbox;
pub mod interaction;
pub mod ray;
pub mod transform;

pub use bbox::BBox;
pub use interaction::{HitFlags, SurfaceInteraction};
pub use ray::Ray;
pub use transform::{AffineTransform, Transform};
