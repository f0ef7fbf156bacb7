use glam::{Mat4, Quat, Vec3};

use crate::bbox::BBox;
use crate::interaction::SurfaceInteraction;
use crate::ray::Ray;

pub trait Transform<T> {
    fn apply(&self, x: T) -> T;
}

/// An invertible affine transform stored together with its inverse, so that applying the inverse
/// never recomputes a matrix inversion on the hot path.
#[derive(Debug, Clone, Copy)]
pub struct AffineTransform {
    forward: Mat4,
    inverse: Mat4,
}

impl AffineTransform {
    fn build(forward: Mat4, inverse: Mat4) -> Self {
        Self { forward, inverse }
    }

    pub fn identity() -> Self {
        Self::build(Mat4::IDENTITY, Mat4::IDENTITY)
    }

    pub fn translater(t: Vec3) -> Self {
        Self::build(Mat4::from_translation(t), Mat4::from_translation(-t))
    }

    pub fn scaler(s: Vec3) -> Self {
        assert!(s.abs().min_element() > f32::EPSILON, "near-singular scale {}", s);
        Self::build(Mat4::from_scale(s), Mat4::from_scale(1.0 / s))
    }

    pub fn rotater(axis: Vec3, angle_rad: f32) -> Self {
        let q = Quat::from_axis_angle(axis.normalize(), angle_rad);
        Self::build(Mat4::from_quat(q), Mat4::from_quat(q.inverse()))
    }

    pub fn from_matrix(forward: Mat4) -> Self {
        Self::build(forward, forward.inverse())
    }

    pub fn inverse(&self) -> Self {
        Self::build(self.inverse, self.forward)
    }

    pub fn matrix(&self) -> Mat4 {
        self.forward
    }

    /// Composes the two transforms; the resulting transform applies `rhs` first, then `self`.
    pub fn compose(self, rhs: AffineTransform) -> AffineTransform {
        // (A * B)^-1 = B^-1 * A^-1
        Self::build(self.forward * rhs.forward, rhs.inverse * self.inverse)
    }

    pub fn point(&self, p: Vec3) -> Vec3 {
        self.forward.transform_point3(p)
    }

    pub fn vector(&self, v: Vec3) -> Vec3 {
        self.forward.transform_vector3(v)
    }

    /// Transforms a normal vector with the inverse-transpose, keeping it perpendicular to the
    /// surface under non-uniform scaling.
    pub fn normal(&self, n: Vec3) -> Vec3 {
        self.inverse.transpose().transform_vector3(n).normalize_or_zero()
    }
}

impl Transform<Ray> for AffineTransform {
    fn apply(&self, r: Ray) -> Ray {
        Ray {
            origin: self.point(r.origin),
            dir: self.vector(r.dir),
            t_max: r.t_max,
        }
    }
}

impl Transform<Vec3> for AffineTransform {
    fn apply(&self, p: Vec3) -> Vec3 {
        self.point(p)
    }
}

impl Transform<BBox> for AffineTransform {
    fn apply(&self, b: BBox) -> BBox {
        if b.is_empty() {
            return b;
        }
        b.all_corners()
            .iter()
            .fold(BBox::empty(), |acc, &corner| acc.union(self.point(corner)))
    }
}

impl Transform<SurfaceInteraction> for AffineTransform {
    fn apply(&self, si: SurfaceInteraction) -> SurfaceInteraction {
        if !si.is_valid() {
            return si;
        }
        SurfaceInteraction {
            pos: self.point(si.pos),
            ray_t: si.ray_t,
            uv: si.uv,
            normal: self.normal(si.normal),
            dpdu: self.vector(si.dpdu),
        }
    }
}
