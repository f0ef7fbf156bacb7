use glam::Vec3;

use geometry::interaction::HitFlags;
use geometry::ray::Ray;
use shape::{Preliminary, Shape, Sphere, TriangleMesh};

fn unit_cube() -> TriangleMesh {
    TriangleMesh::cube(Vec3::ZERO, Vec3::ONE)
}

#[test]
fn cube_has_twelve_triangles() {
    let cube = unit_cube();
    assert_eq!(cube.primitive_count(), 12);
    assert!(cube.is_mesh());
    assert!(!cube.is_emitter());
    assert!(!cube.is_sensor());
    let b = cube.bbox();
    assert_eq!(b.min(), Vec3::ZERO);
    assert_eq!(b.max(), Vec3::ONE);
}

#[test]
fn cube_prim_bboxes_union_to_mesh_bbox() {
    let cube = unit_cube();
    let mut acc = geometry::bbox::BBox::empty();
    for prim in 0..cube.primitive_count() {
        acc = geometry::bbox::union(acc, cube.prim_bbox(prim));
    }
    assert_eq!(acc.min(), cube.bbox().min());
    assert_eq!(acc.max(), cube.bbox().max());
}

#[test]
fn some_cube_triangle_stops_a_crossing_ray() {
    let cube = unit_cube();
    let ray = Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z);
    let hits: Vec<_> = (0..cube.primitive_count())
        .filter_map(|prim| cube.intersect_prim(prim, &ray).map(|h| (prim, h)))
        .collect();
    // The ray crosses the z = 0 and z = 1 faces, one or two triangles each.
    assert!(!hits.is_empty());
    let nearest = hits
        .iter()
        .map(|(_, h)| h.ray_t)
        .fold(f32::INFINITY, f32::min);
    assert!((nearest - 1.0).abs() < 1e-4);
}

#[test]
fn mesh_interaction_reconstructs_hit_point() {
    let cube = unit_cube();
    let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::Z);
    let (prim, hit) = (0..cube.primitive_count())
        .filter_map(|p| cube.intersect_prim(p, &ray).map(|h| (p, h)))
        .min_by(|a, b| a.1.ray_t.partial_cmp(&b.1.ray_t).unwrap())
        .unwrap();
    let pi = Preliminary::new(hit.ray_t, hit.uv, 0, prim);
    let si = cube.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 1, true);
    assert!(si.is_valid());
    assert!((si.pos - ray.position_at(hit.ray_t)).length() < 1e-4);
    // The hit is on the z = 0 face.
    assert!(si.pos.z.abs() < 1e-4);
    assert!(si.normal.z.abs() > 0.99);
}

#[test]
fn inactive_query_yields_default_interaction() {
    let cube = unit_cube();
    let ray = Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z);
    let pi = Preliminary::new(1.0, (0.2, 0.2), 0, 0);
    let si = cube.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 0, false);
    assert!(!si.is_valid());
}

#[test]
fn sphere_hit_from_outside() {
    let sphere = Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0);
    let ray = Ray::new(Vec3::ZERO, Vec3::Z);
    let hit = sphere.intersect_prim(0, &ray).expect("ray through center");
    assert!((hit.ray_t - 4.0).abs() < 1e-3);

    let pi = Preliminary::new(hit.ray_t, hit.uv, 0, 0);
    let si = sphere.compute_surface_interaction(&ray, &pi, HitFlags::ALL, 1, true);
    assert!((si.pos - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-3);
    assert!((si.normal + Vec3::Z).length() < 1e-3);
    assert!(si.normal.dot(si.dpdu).abs() < 1e-3);
}

#[test]
fn sphere_miss_and_extent() {
    let sphere = Sphere::new(Vec3::new(0.0, 3.0, 0.0), 1.0);
    assert!(sphere.intersect_prim(0, &Ray::new(Vec3::ZERO, Vec3::X)).is_none());
    // A hit beyond the ray extent does not count.
    let short = Ray::new(Vec3::ZERO, Vec3::Y).with_extent(1.5);
    assert!(sphere.intersect_prim(0, &short).is_none());
}

#[test]
fn emitter_and_sensor_flags() {
    let lamp = Sphere::new(Vec3::ZERO, 1.0).emissive();
    assert!(lamp.is_emitter());
    assert!(!lamp.is_sensor());

    let probe = unit_cube().sensing();
    assert!(probe.is_sensor());
    assert!(!probe.is_emitter());
}
