use std::sync::Arc;

use glam::{Mat4, Vec3};

use geometry::interaction::HitFlags;
use geometry::ray::Ray;
use geometry::transform::AffineTransform;
use instancing::{Backend, Instance, SceneObject, SceneRegistry, ShapeGroup};
use shape::gpu::HitGroupRecord;
use shape::hwaccel::HwDevice;
use shape::{Shape, Sphere, TriangleMesh};

fn cube_at(lo: f32) -> TriangleMesh {
    TriangleMesh::cube(Vec3::splat(lo), Vec3::splat(lo + 1.0))
}

fn three_cubes() -> Vec<SceneObject> {
    vec![
        SceneObject::shape(cube_at(0.0)),
        SceneObject::shape(cube_at(2.0)),
        SceneObject::shape(cube_at(4.0)),
    ]
}

fn vectorized_group(id: &str) -> ShapeGroup {
    let registry = SceneRegistry::new();
    ShapeGroup::new(id, three_cubes(), &Backend::Vectorized(registry)).unwrap()
}

#[test]
fn hardware_scene_builds_exactly_once() {
    let device = HwDevice::new();
    let group = vectorized_group("g");

    let first = group.hw_geometry(&device);
    assert_eq!(device.commit_count(), 1);
    // Geometry uploads were flushed before the scene build.
    assert_eq!(device.pending_writes(), 0);
    assert!(device.sync_count() >= 1);

    // The second request observes the committed scene and only mints a new handle.
    let second = group.hw_geometry(&device);
    assert_eq!(device.commit_count(), 1);
    assert!(Arc::ptr_eq(
        first.instanced_scene().unwrap(),
        second.instanced_scene().unwrap()
    ));
}

#[test]
fn group_scene_contains_all_children() {
    let device = HwDevice::new();
    let group = vectorized_group("g");
    let handle = group.hw_geometry(&device);
    assert!(handle.is_instance());
    let scene = handle.instanced_scene().unwrap();
    assert_eq!(scene.geometry_count(), 3);
    assert_eq!(scene.prim_count(), 36);
}

#[test]
#[should_panic(expected = "hardware scene backend")]
fn hw_geometry_on_scalar_group_is_a_usage_error() {
    let device = HwDevice::new();
    let group = ShapeGroup::new("g", three_cubes(), &Backend::Scalar).unwrap();
    let _ = group.hw_geometry(&device);
}

#[test]
fn sbt_offsets_partition_the_record_table() {
    let group_a = ShapeGroup::new("a", three_cubes(), &Backend::Gpu).unwrap();
    let group_b = ShapeGroup::new(
        "b",
        vec![
            SceneObject::shape(cube_at(0.0)),
            SceneObject::shape(Sphere::new(Vec3::splat(9.0), 1.0)),
        ],
        &Backend::Gpu,
    )
    .unwrap();

    let mut records: Vec<HitGroupRecord> = Vec::new();
    group_a.push_hit_records(&mut records);
    group_b.push_hit_records(&mut records);

    assert_eq!(group_a.sbt_offset(), 0);
    assert_eq!(group_b.sbt_offset(), 3);
    assert_eq!(records.len(), 5);

    // Refilling the table moves the offsets with it.
    let mut records = vec![HitGroupRecord {
        kind: shape::gpu::PrimitiveKind::Analytic,
        prim_count: 1,
    }];
    group_a.push_hit_records(&mut records);
    assert_eq!(group_a.sbt_offset(), 1);
}

#[test]
fn bottom_level_structure_is_memoized_across_instances() {
    let group = Arc::new(ShapeGroup::new("g", three_cubes(), &Backend::Gpu).unwrap());
    let mut table = Vec::new();
    group.push_hit_records(&mut table);

    let mut instances = Vec::new();
    group.prepare_gpu_instances(0, Mat4::IDENTITY, &mut instances);
    group.prepare_gpu_instances(1, Mat4::from_translation(Vec3::X * 8.0), &mut instances);

    assert_eq!(instances.len(), 2);
    assert!(Arc::ptr_eq(&instances[0].blas, &instances[1].blas));
    assert_eq!(instances[0].blas.prim_count(), 36);
    assert_eq!(instances[0].sbt_offset, group.sbt_offset());
    assert_eq!(instances[1].instance_id, 1);
}

#[test]
fn top_level_assembly_collects_each_instance() {
    let group = Arc::new(ShapeGroup::new("g", three_cubes(), &Backend::Gpu).unwrap());
    let instances = vec![
        Instance::new(Arc::clone(&group), AffineTransform::identity()),
        Instance::new(Arc::clone(&group), AffineTransform::translater(Vec3::Y * 20.0)),
    ];
    let mut entries = Vec::new();
    instancing::instance::prepare_top_level(&instances, &mut entries);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].instance_id, 0);
    assert_eq!(entries[1].instance_id, 1);
    assert!(Arc::ptr_eq(&entries[0].blas, &entries[1].blas));
}

#[test]
fn instance_intersects_through_its_transform() {
    let group = Arc::new(ShapeGroup::new("g", three_cubes(), &Backend::Scalar).unwrap());
    let instance = Instance::new(Arc::clone(&group), AffineTransform::translater(Vec3::X * 10.0));

    // World-space ray through the third cube of the shifted copy.
    let ray = Ray::new(Vec3::new(14.5, 4.5, -1.0), Vec3::Z);
    let si = instance.intersect(&ray, HitFlags::ALL).expect("hit");
    assert!((si.pos - Vec3::new(14.5, 4.5, 4.0)).length() < 1e-3);
    assert!(instance.occludes(&ray));

    // The untransformed ray misses the shifted copy.
    let original = Ray::new(Vec3::new(4.5, 4.5, -1.0), Vec3::Z);
    assert!(instance.intersect(&original, HitFlags::ALL).is_none());
    assert!(!instance.occludes(&original));

    // The instance's world bounds follow the transform.
    assert!((instance.bbox().min() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-3);
    assert!((instance.bbox().max() - Vec3::new(15.0, 5.0, 5.0)).length() < 1e-3);
}

#[test]
fn gpu_hits_resolve_through_the_record_shape() {
    let group = ShapeGroup::new("g", three_cubes(), &Backend::Gpu).unwrap();
    let child = Arc::clone(&group.children()[2]);

    // A GPU hit program reports the owning shape directly instead of an ordinal.
    let ray = Ray::new(Vec3::new(4.5, 4.5, -1.0), Vec3::Z);
    let (prim, hit) = (0..child.primitive_count())
        .filter_map(|p| child.intersect_prim(p, &ray).map(|h| (p, h)))
        .min_by(|a, b| a.1.ray_t.partial_cmp(&b.1.ray_t).unwrap())
        .expect("ray crosses the third cube");
    let pi = shape::Preliminary::new(hit.ray_t, hit.uv, 2, prim).with_shape(Arc::clone(&child));

    let si = group.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 0, true);
    let direct = child.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 1, true);
    assert!(si.is_valid());
    assert_eq!(si, direct);

    // The guard applies to GPU-resolved hits too.
    let guarded = group.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 1, true);
    assert!(!guarded.is_valid());
}

#[test]
fn instance_delegation_keeps_recursion_guard() {
    let group = Arc::new(ShapeGroup::new("g", three_cubes(), &Backend::Scalar).unwrap());
    let instance = Instance::new(Arc::clone(&group), AffineTransform::identity());

    let ray = Ray::new(Vec3::new(4.5, 4.5, -1.0), Vec3::Z);
    let pi = group.ray_intersect_scalar(&ray);
    assert!(pi.is_valid());

    // Depth 0 resolves normally through the wrapper...
    let si = instance.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 0, true);
    assert!(si.is_valid());
    // ...but a re-entrant call terminates with the default interaction.
    let guarded = instance.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 1, true);
    assert!(!guarded.is_valid());
}
