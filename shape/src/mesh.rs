use std::ops::{Add, Mul};
use std::sync::Arc;

use glam::Vec3;

use geometry::bbox::BBox;
use geometry::interaction::{HitFlags, SurfaceInteraction};
use geometry::ray::Ray;

use crate::gpu::{HitGroupRecord, PrimitiveKind};
use crate::hwaccel::{HwDevice, HwGeometry};
use crate::{Preliminary, PrimHit, Shape};

fn barycentric_lerp<T>(vals: (T, T, T), bc: (f32, f32, f32)) -> T
where
    T: Mul<f32, Output = T> + Add<Output = T> + Copy,
{
    vals.0 * bc.0 + vals.1 * bc.1 + vals.2 * bc.2
}

/// Möller-Trumbore ray-triangle intersection. Returns the t-value and the barycentric
/// coordinates of the hit (weights of the 2nd and 3rd vertices).
pub fn intersect_triangle(p0: Vec3, p1: Vec3, p2: Vec3, r: &Ray) -> Option<(f32, (f32, f32))> {
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;
    let h = r.dir.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < 1e-9 {
        return None; // Ray is parallel to the triangle plane.
    }
    let inv_det = 1.0 / det;
    let s = r.origin - p0;
    let b1 = s.dot(h) * inv_det;
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }
    let q = s.cross(edge1);
    let b2 = r.dir.dot(q) * inv_det;
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    let t = r.truncated_t(t)?;
    Some((t, (b1, b2)))
}

/// An indexed triangle mesh with per-vertex normals and UVs. One triangle is one primitive;
/// primitive ordinals are indices into the triangle list.
pub struct TriangleMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<(f32, f32)>,
    indices: Vec<(u32, u32, u32)>,
    emitter: bool,
    sensor: bool,
}

impl TriangleMesh {
    pub fn from_soa(
        positions: Vec<Vec3>, normals: Vec<Vec3>, uvs: Vec<(f32, f32)>,
        indices: Vec<(u32, u32, u32)>,
    ) -> Self {
        assert_eq!(positions.len(), normals.len());
        assert_eq!(positions.len(), uvs.len());
        Self {
            positions,
            normals,
            uvs,
            indices,
            emitter: false,
            sensor: false,
        }
    }

    /// An axis-aligned box tessellated into 12 triangles, with face normals and trivial UVs.
    pub fn cube(min: Vec3, max: Vec3) -> Self {
        let corner = |i: usize| {
            Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        // Each face as two triangles over the 8 corners, wound so normals point outward.
        let faces: [[usize; 4]; 6] = [
            [0, 2, 3, 1], // z = min
            [4, 5, 7, 6], // z = max
            [0, 1, 5, 4], // y = min
            [2, 6, 7, 3], // y = max
            [0, 4, 6, 2], // x = min
            [1, 3, 7, 5], // x = max
        ];
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut indices = Vec::new();
        for quad in faces.iter() {
            let base = positions.len() as u32;
            let (p0, p1, p2, p3) = (
                corner(quad[0]),
                corner(quad[1]),
                corner(quad[2]),
                corner(quad[3]),
            );
            let n = (p1 - p0).cross(p3 - p0).normalize();
            positions.extend_from_slice(&[p0, p1, p2, p3]);
            normals.extend_from_slice(&[n; 4]);
            uvs.extend_from_slice(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
            indices.push((base, base + 1, base + 2));
            indices.push((base, base + 2, base + 3));
        }
        Self::from_soa(positions, normals, uvs, indices)
    }

    /// Marks the mesh as having an emitter attached.
    pub fn emissive(self) -> Self {
        Self {
            emitter: true,
            ..self
        }
    }

    /// Marks the mesh as having a sensor attached.
    pub fn sensing(self) -> Self {
        Self {
            sensor: true,
            ..self
        }
    }

    pub fn triangle_count(&self) -> u32 {
        self.indices.len() as u32
    }

    fn triangle(&self, prim_index: u32) -> (Vec3, Vec3, Vec3) {
        let (i, j, k) = self.indices[prim_index as usize];
        (
            self.positions[i as usize],
            self.positions[j as usize],
            self.positions[k as usize],
        )
    }
}

impl Shape for TriangleMesh {
    fn type_name(&self) -> &'static str {
        "trimesh"
    }

    fn summary(&self) -> String {
        format!(
            "TriangleMesh{{{} triangles, {} vertices, bbox = {}}}",
            self.indices.len(),
            self.positions.len(),
            self.bbox()
        )
    }

    fn bbox(&self) -> BBox {
        self.positions
            .iter()
            .fold(BBox::empty(), |b, &p| b.union(p))
    }

    fn primitive_count(&self) -> u32 {
        self.indices.len() as u32
    }

    fn prim_bbox(&self, prim_index: u32) -> BBox {
        let (p0, p1, p2) = self.triangle(prim_index);
        BBox::new(p0, p1).union(p2)
    }

    fn is_mesh(&self) -> bool {
        true
    }
    fn is_emitter(&self) -> bool {
        self.emitter
    }
    fn is_sensor(&self) -> bool {
        self.sensor
    }

    fn intersect_prim(&self, prim_index: u32, r: &Ray) -> Option<PrimHit> {
        let (p0, p1, p2) = self.triangle(prim_index);
        let (ray_t, uv) = intersect_triangle(p0, p1, p2, r)?;
        Some(PrimHit { ray_t, uv })
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
        let (i, j, k) = self.indices[pi.prim_index as usize];
        let (i, j, k) = (i as usize, j as usize, k as usize);
        let (p0, p1, p2) = (self.positions[i], self.positions[j], self.positions[k]);
        let (b1, b2) = pi.prim_uv;
        let bc = (1.0 - b1 - b2, b1, b2);

        let pos = barycentric_lerp((p0, p1, p2), bc);
        let geo_normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        let normal = barycentric_lerp((self.normals[i], self.normals[j], self.normals[k]), bc);
        let normal = if normal.length_squared() > 1e-12 {
            normal.normalize()
        } else {
            geo_normal
        };

        let uv = if flags.contains(HitFlags::UV) {
            (
                barycentric_lerp((self.uvs[i].0, self.uvs[j].0, self.uvs[k].0), bc),
                barycentric_lerp((self.uvs[i].1, self.uvs[j].1, self.uvs[k].1), bc),
            )
        } else {
            (0.0, 0.0)
        };

        let si = SurfaceInteraction::new(pos, pi.ray_t, uv, normal);
        if flags.contains(HitFlags::DPDU) {
            // Solve the tangent from the UV parameterization; degenerate UVs fall back to an
            // edge of the triangle.
            let (u0, v0) = self.uvs[i];
            let (u1, v1) = (self.uvs[j].0 - u0, self.uvs[j].1 - v0);
            let (u2, v2) = (self.uvs[k].0 - u0, self.uvs[k].1 - v0);
            let det = u1 * v2 - u2 * v1;
            let dpdu = if det.abs() > 1e-12 {
                ((p1 - p0) * v2 - (p2 - p0) * v1) / det
            } else {
                p1 - p0
            };
            si.with_dpdu(dpdu.normalize_or_zero())
        } else {
            si
        }
    }

    fn hw_geometry(&self, device: &Arc<HwDevice>) -> HwGeometry {
        // Vertex and index buffers are handed to the device asynchronously.
        device.defer_write();
        HwGeometry::Triangles {
            vertex_count: self.positions.len() as u32,
            triangle_count: self.indices.len() as u32,
        }
    }

    fn push_hit_records(&self, out: &mut Vec<HitGroupRecord>) {
        out.push(HitGroupRecord {
            kind: PrimitiveKind::Triangles,
            prim_count: self.primitive_count(),
        });
    }
}
