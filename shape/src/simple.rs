use std::f32::consts::PI;
use std::sync::Arc;

use glam::Vec3;

use geometry::bbox::BBox;
use geometry::interaction::{HitFlags, SurfaceInteraction};
use geometry::ray::Ray;

use crate::gpu::{HitGroupRecord, PrimitiveKind};
use crate::hwaccel::{HwDevice, HwGeometry};
use crate::{Preliminary, PrimHit, Shape};

/// An analytically intersected sphere. The whole sphere is a single primitive.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    emitter: bool,
    sensor: bool,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Sphere {
        assert!(radius.is_finite() && radius > 0.0);
        Sphere {
            center,
            radius,
            emitter: false,
            sensor: false,
        }
    }

    /// Marks the sphere as having an emitter attached.
    pub fn emissive(self) -> Self {
        Self {
            emitter: true,
            ..self
        }
    }

    /// Marks the sphere as having a sensor attached.
    pub fn sensing(self) -> Self {
        Self {
            sensor: true,
            ..self
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }
    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn spherical_uv(normal: Vec3) -> (f32, f32) {
        let theta = normal.y.clamp(-1.0, 1.0).acos();
        let phi = normal.z.atan2(normal.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }
}

impl Shape for Sphere {
    fn type_name(&self) -> &'static str {
        "sphere"
    }

    fn summary(&self) -> String {
        format!("Sphere{{ {}, radius = {} }}", self.center, self.radius)
    }

    fn bbox(&self) -> BBox {
        let half_diagonal = Vec3::splat(self.radius);
        BBox::new(self.center - half_diagonal, self.center + half_diagonal)
    }

    fn primitive_count(&self) -> u32 {
        1
    }

    fn prim_bbox(&self, prim_index: u32) -> BBox {
        debug_assert_eq!(prim_index, 0);
        self.bbox()
    }

    fn is_emitter(&self) -> bool {
        self.emitter
    }
    fn is_sensor(&self) -> bool {
        self.sensor
    }

    fn intersect_prim(&self, _prim_index: u32, r: &Ray) -> Option<PrimHit> {
        // Solve |o + t*d - c|^2 = radius^2 for t; the stable form divides through the
        // half-b formulation to avoid catastrophic cancellation for distant spheres.
        let f = r.origin - self.center;
        let a = r.dir.length_squared();
        let b_half = -f.dot(r.dir);
        let discriminant =
            self.radius * self.radius - (f + b_half / a * r.dir).length_squared();
        if discriminant < 0.0 {
            return None;
        }
        let c = f.length_squared() - self.radius * self.radius;
        let q = b_half + b_half.signum() * (discriminant * a).sqrt();
        let (t0, t1) = (c / q, q / a);
        let (t_low, t_high) = if t0 < t1 { (t0, t1) } else { (t1, t0) };

        let ray_t = match (r.truncated_t(t_low), r.truncated_t(t_high)) {
            (Some(low), _) => low,
            (None, Some(high)) => high,
            (None, None) => return None,
        };
        let normal = (r.position_at(ray_t) - self.center).normalize();
        Some(PrimHit {
            ray_t,
            uv: Self::spherical_uv(normal),
        })
    }

    fn compute_surface_interaction(
        &self,
        r: &Ray,
        pi: &Preliminary,
        flags: HitFlags,
        _depth: u32,
        active: bool,
    ) -> SurfaceInteraction {
        if !active || !pi.is_valid() {
            return SurfaceInteraction::default();
        }
        let normal = (r.position_at(pi.ray_t) - self.center).normalize();
        // Re-project onto the surface so spawned rays start outside the sphere.
        let pos = self.center + normal * self.radius;
        let uv = if flags.contains(HitFlags::UV) {
            Self::spherical_uv(normal)
        } else {
            pi.prim_uv
        };
        let si = SurfaceInteraction::new(pos, pi.ray_t, uv, normal);
        if flags.contains(HitFlags::DPDU) {
            // Rotating the hit point around the polar axis traces out the u direction.
            let dpdu = Vec3::new(-normal.z, 0.0, normal.x);
            let dpdu = if dpdu.length_squared() > 1e-12 {
                dpdu.normalize()
            } else {
                Vec3::X
            };
            si.with_dpdu(dpdu)
        } else {
            si
        }
    }

    fn hw_geometry(&self, device: &Arc<HwDevice>) -> HwGeometry {
        device.defer_write();
        HwGeometry::Analytic { prim_count: 1 }
    }

    fn push_hit_records(&self, out: &mut Vec<HitGroupRecord>) {
        out.push(HitGroupRecord {
            kind: PrimitiveKind::Analytic,
            prim_count: 1,
        });
    }
}
