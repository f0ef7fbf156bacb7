use geometry::bbox::{self, BBox};
use geometry::ray::Ray;
use glam::Vec3;

#[test]
fn empty_box_is_empty() {
    let b = BBox::empty();
    assert!(b.is_empty());
    assert_eq!(b.area(), 0.0);
    assert!(!b.contains(Vec3::ZERO));
}

#[test]
fn union_accumulates_points() {
    let b = BBox::empty()
        .union(Vec3::new(1.0, 2.0, 3.0))
        .union(Vec3::new(-1.0, 0.5, 4.0));
    assert!(!b.is_empty());
    assert_eq!(b.min(), Vec3::new(-1.0, 0.5, 3.0));
    assert_eq!(b.max(), Vec3::new(1.0, 2.0, 4.0));
}

#[test]
fn union_with_empty_is_identity() {
    let b = BBox::new(Vec3::ZERO, Vec3::ONE);
    let u = bbox::union(b, BBox::empty());
    assert_eq!(u.min(), b.min());
    assert_eq!(u.max(), b.max());

    let u = bbox::union(BBox::empty(), b);
    assert_eq!(u.min(), b.min());
    assert_eq!(u.max(), b.max());
}

#[test]
fn union_of_disjoint_boxes_spans_both() {
    let b0 = BBox::new(Vec3::ZERO, Vec3::ONE);
    let b1 = BBox::new(Vec3::splat(4.0), Vec3::splat(5.0));
    let u = bbox::union(b0, b1);
    assert_eq!(u.min(), Vec3::ZERO);
    assert_eq!(u.max(), Vec3::splat(5.0));
    assert!(u.encloses(b0));
    assert!(u.encloses(b1));
}

#[test]
fn ray_hits_box_in_front() {
    let b = BBox::new(Vec3::splat(1.0), Vec3::splat(2.0));
    let hit_ray = Ray::new(Vec3::ZERO, Vec3::ONE);
    assert!(b.intersect(&hit_ray));

    // Same line, pointing away from the box.
    let miss_ray = Ray::new(Vec3::ZERO, -Vec3::ONE);
    assert!(!b.intersect(&miss_ray));
}

#[test]
fn ray_extent_limits_box_hit() {
    let b = BBox::new(Vec3::splat(10.0), Vec3::splat(11.0));
    let ray = Ray::new(Vec3::ZERO, Vec3::ONE);
    assert!(b.intersect(&ray));
    assert!(!b.intersect(&ray.with_extent(2.0)));
}

#[test]
fn max_dimension_picks_longest_axis() {
    let b = BBox::new(Vec3::ZERO, Vec3::new(1.0, 5.0, 2.0));
    assert_eq!(b.max_dimension(), 1);
}
