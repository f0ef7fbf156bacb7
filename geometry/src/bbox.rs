use std::fmt::{Debug, Display, Formatter, Result};

use glam::Vec3;

use crate::ray::Ray;

fn min_max(a: f32, b: f32) -> (f32, f32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 3D bounding-box type. Boundary check is half-open (`[min, max)`) on all axes.
/// - Build one from 2 points;
/// - Expand it by `b.union()` or `union(b1, b2)`;
/// - Check if it `contains()` a point or `encloses()` another box, or intersects with a `Ray`.
#[derive(Debug, Clone, Copy)]
pub struct BBox {
    min: Vec3,
    max: Vec3,
}

impl BBox {
    pub fn empty() -> BBox {
        BBox {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(-f32::INFINITY),
        }
    }
    pub fn new(p0: Vec3, p1: Vec3) -> BBox {
        let (xmin, xmax) = min_max(p0.x, p1.x);
        let (ymin, ymax) = min_max(p0.y, p1.y);
        let (zmin, zmax) = min_max(p0.z, p1.z);
        BBox {
            min: Vec3::new(xmin, ymin, zmin),
            max: Vec3::new(xmax, ymax, zmax),
        }
    }

    /// An empty box has `min > max` on at least one axis. Freshly built boxes that never saw a
    /// point are empty; so are boxes of degenerate primitives.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    pub fn union(self, p: Vec3) -> BBox {
        BBox {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn midpoint(self) -> Vec3 {
        (self.max - self.min) * 0.5 + self.min
    }

    pub fn diag(&self) -> Vec3 {
        self.max - self.min
    }

    /// The axis (0, 1, or 2) along which the box extends the most.
    pub fn max_dimension(&self) -> usize {
        let d = self.diag();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Computes the surface area of the bounding box.
    pub fn area(&self) -> f32 {
        let d = self.diag();
        let (x, y, z) = (d.x, d.y, d.z);
        if x.is_sign_positive() && y.is_sign_positive() && z.is_sign_positive() {
            (x * y + y * z + z * x) * 2.0
        } else {
            0.0
        }
    }

    pub fn intersect(&self, r: &Ray) -> bool {
        let (mut t_min, mut t_max) = (0.0f32, r.t_max);
        for axis in 0..3 {
            let inv_dir = 1.0 / r.dir[axis];
            let t0 = (self.min[axis] - r.origin[axis]) * inv_dir;
            let t1 = (self.max[axis] - r.origin[axis]) * inv_dir;
            let (t0, t1) = min_max(t0, t1);
            // Shrinks [t_min, t_max] by intersecting it with [t0, t1].
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_max < t_min {
                return false;
            }
        }
        true
    }

    pub fn encloses(&self, other: Self) -> bool {
        for axis in 0..3 {
            if self.min[axis] > other.min[axis] {
                return false;
            }
            if self.max[axis] < other.max[axis] {
                return false;
            }
        }
        true
    }

    pub fn contains(&self, p: Vec3) -> bool {
        for axis in 0..3 {
            if self.min[axis] > p[axis] {
                return false;
            }
            if self.max[axis] < p[axis] {
                return false;
            }
        }
        true
    }

    pub fn all_corners(&self) -> [Vec3; 8] {
        let mut res = [Vec3::ZERO; 8];
        for i in 0..8 {
            for axis in 0..3 {
                res[i][axis] = if i & (1 << axis) == 0 {
                    self.min[axis]
                } else {
                    self.max[axis]
                };
            }
        }
        res
    }
}

impl Display for BBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "box[{} -> {}]", self.min, self.max)
    }
}

pub fn union(b0: BBox, b1: BBox) -> BBox {
    // Unioning with the corners of an empty box would poison the result with infinities.
    if b1.is_empty() {
        b0
    } else if b0.is_empty() {
        b1
    } else {
        b0.union(b1.min).union(b1.max)
    }
}
