use std::fmt::{Display, Formatter, Result};
use std::ops::BitOr;

use glam::Vec3;

/// Bit-set of query flags passed to surface-interaction computation. Shapes may skip filling
/// attributes that the caller did not ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitFlags(pub u32);

impl HitFlags {
    pub const MINIMAL: HitFlags = HitFlags(0);
    pub const UV: HitFlags = HitFlags(1 << 0);
    pub const DPDU: HitFlags = HitFlags(1 << 1);
    pub const SHADING_FRAME: HitFlags = HitFlags(1 << 2);
    pub const ALL: HitFlags = HitFlags((1 << 3) - 1);

    pub fn contains(self, other: HitFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for HitFlags {
    type Output = HitFlags;
    fn bitor(self, rhs: HitFlags) -> HitFlags {
        HitFlags(self.0 | rhs.0)
    }
}

/// Contains geometric information on a ray-surface intersection:
///  - `pos`: position of intersection
///  - `ray_t`: t-value of the ray at the intersection
///  - `normal`: normal vector of the surface
///  - `uv`, `dpdu`: shape-specific surface parameterization and tangent
///
/// The `Default` value is the canonical *invalid* interaction: `ray_t` is infinite, all vectors
/// are zero and `is_valid()` returns false. Code that must terminate a traversal (such as the
/// instancing recursion guard) returns exactly this value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInteraction {
    pub pos: Vec3,
    pub ray_t: f32,
    pub uv: (f32, f32),
    pub normal: Vec3,
    pub dpdu: Vec3,
}

impl SurfaceInteraction {
    pub fn new(pos: Vec3, ray_t: f32, uv: (f32, f32), normal: Vec3) -> SurfaceInteraction {
        SurfaceInteraction {
            pos,
            ray_t,
            uv,
            normal,
            dpdu: Vec3::ZERO,
        }
    }

    pub fn with_dpdu(self, dpdu: Vec3) -> SurfaceInteraction {
        SurfaceInteraction { dpdu, ..self }
    }

    pub fn is_valid(&self) -> bool {
        self.ray_t.is_finite()
    }
}

impl Default for SurfaceInteraction {
    fn default() -> Self {
        SurfaceInteraction {
            pos: Vec3::ZERO,
            ray_t: f32::INFINITY,
            uv: (0.0, 0.0),
            normal: Vec3::ZERO,
            dpdu: Vec3::ZERO,
        }
    }
}

impl Display for SurfaceInteraction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let (u, v) = self.uv;
        write!(
            f,
            "pos = {}, t = {:.2}, uv = ({:.2}, {:.2}), normal = {}",
            self.pos, self.ray_t, u, v, self.normal
        )
    }
}
