//! Transformed references to a shared [`ShapeGroup`].

use std::sync::Arc;

use geometry::bbox::BBox;
use geometry::interaction::{HitFlags, SurfaceInteraction};
use geometry::ray::Ray;
use geometry::transform::{AffineTransform, Transform};
use shape::gpu::{GpuInstance, HitGroupRecord};
use shape::hwaccel::{HwDevice, HwGeometry};
use shape::{Preliminary, PrimHit, Shape};

/// One placement of a group in the scene: the group's geometry, rigidly reused under an
/// object-to-world transform. Many instances may share one group; none of them owns it.
#[derive(Clone)]
pub struct Instance {
    group: Arc<crate::ShapeGroup>,
    to_world: AffineTransform,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance[group = \"{}\", bbox = {}]", self.group.id(), self.bbox())
    }
}

impl Instance {
    pub fn new(group: Arc<crate::ShapeGroup>, to_world: AffineTransform) -> Self {
        Instance { group, to_world }
    }

    pub fn group(&self) -> &Arc<crate::ShapeGroup> {
        &self.group
    }

    pub fn to_world(&self) -> &AffineTransform {
        &self.to_world
    }

    /// Scalar closest hit through the instance: the ray is taken into group space, traced
    /// against the group's index, and the interaction is taken back out to world space.
    pub fn intersect(&self, r: &Ray, flags: HitFlags) -> Option<SurfaceInteraction> {
        let local_ray = self.to_world.inverse().apply(*r);
        let pi = self.group.ray_intersect_scalar(&local_ray);
        if !pi.is_valid() {
            return None;
        }
        let si = self
            .group
            .compute_surface_interaction(&local_ray, &pi, flags, 0, true);
        si.is_valid().then(|| self.to_world.apply(si))
    }

    pub fn occludes(&self, r: &Ray) -> bool {
        let local_ray = self.to_world.inverse().apply(*r);
        self.group.ray_test_scalar(&local_ray)
    }
}

impl Shape for Instance {
    fn type_name(&self) -> &'static str {
        "instance"
    }

    fn summary(&self) -> String {
        format!("Instance of {}", self.group.summary())
    }

    fn bbox(&self) -> BBox {
        self.to_world.apply(self.group.bbox())
    }

    fn primitive_count(&self) -> u32 {
        self.group.primitive_count()
    }

    fn prim_bbox(&self, _prim_index: u32) -> BBox {
        panic!("instance primitives are indexed by the instanced group");
    }

    fn intersect_prim(&self, _prim_index: u32, _r: &Ray) -> Option<PrimHit> {
        panic!("instance primitives are indexed by the instanced group");
    }

    fn compute_surface_interaction(
        &self,
        r: &Ray,
        pi: &Preliminary,
        flags: HitFlags,
        depth: u32,
        active: bool,
    ) -> SurfaceInteraction {
        let local_ray = self.to_world.inverse().apply(*r);
        let si = self
            .group
            .compute_surface_interaction(&local_ray, pi, flags, depth, active);
        self.to_world.apply(si)
    }

    /// The group's committed scene wrapped in a fresh instance handle.
    fn hw_geometry(&self, device: &Arc<HwDevice>) -> HwGeometry {
        self.group.hw_geometry(device)
    }

    fn push_hit_records(&self, out: &mut Vec<HitGroupRecord>) {
        self.group.push_hit_records(out);
    }
}

/// Assembles the top-level entries for a set of instances. Each instance asks its group for
/// the (memoized) bottom-level structure and contributes one transformed entry.
pub fn prepare_top_level(instances: &[Instance], out: &mut Vec<GpuInstance>) {
    for (i, instance) in instances.iter().enumerate() {
        instance
            .group
            .prepare_gpu_instances(i as u32, instance.to_world.matrix(), out);
    }
}
