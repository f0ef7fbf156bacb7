//! Software spatial index: a BVH over every primitive of every child shape of a group.
//!
//! Primitives from all children are indexed together; each entry remembers which shape it came
//! from, so a query answers with `(t, uv, shape ordinal, primitive ordinal)` and the caller can
//! resolve the owning shape afterwards.

use std::ops::Range;
use std::sync::Arc;

use partition::partition;

use geometry::bbox::{self, BBox};
use geometry::ray::Ray;
use shape::{Preliminary, Shape};

/// One indexed primitive: its bounds and where it lives.
#[derive(Debug, Clone, Copy)]
struct PrimRef {
    bbox: BBox,
    shape_index: u32,
    prim_index: u32,
}

enum BvhNodeContent {
    Children([Box<BvhNode>; 2], usize),
    Leaf(Range<usize>),
}

struct BvhNode {
    bbox: BBox,
    content: BvhNodeContent,
}

use BvhNodeContent::Children;
use BvhNodeContent::Leaf;

impl BvhNode {
    fn height(&self) -> usize {
        match &self.content {
            Children([left, right], _) => std::cmp::max(left.height(), right.height()) + 1,
            Leaf(_) => 1,
        }
    }
}

/// A BVH over the primitives of an ordered shape list. Built once, immutable afterwards.
pub struct PrimBvh {
    prims: Vec<PrimRef>,
    bbox: BBox,
    root: Option<BvhNode>,
}

impl PrimBvh {
    /// Collects every primitive of every shape and builds the tree. Primitives with empty
    /// bounds cannot be indexed and are discarded, so `primitive_count()` on the built index
    /// may be smaller than the naive sum over the shapes.
    pub fn build(shapes: &[Arc<dyn Shape>]) -> PrimBvh {
        let mut prims = Vec::new();
        let mut discarded = 0usize;
        for (shape_index, shape) in shapes.iter().enumerate() {
            for prim_index in 0..shape.primitive_count() {
                let bbox = shape.prim_bbox(prim_index);
                if bbox.is_empty() {
                    discarded += 1;
                    continue;
                }
                prims.push(PrimRef {
                    bbox,
                    shape_index: shape_index as u32,
                    prim_index,
                });
            }
        }
        if discarded > 0 {
            log::warn!("discarded {} degenerate primitives while building the index", discarded);
        }

        if prims.is_empty() {
            return PrimBvh {
                prims,
                bbox: BBox::empty(),
                root: None,
            };
        }

        let num_prims = prims.len();
        let tree = recursive_build(&mut prims, 0..num_prims, |p: &PrimRef| p.bbox);
        log::debug!(
            "built primitive index: {} primitives, tree height {}",
            num_prims,
            tree.height()
        );
        PrimBvh {
            prims,
            bbox: tree.bbox,
            root: Some(tree),
        }
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn primitive_count(&self) -> u32 {
        self.prims.len() as u32
    }

    /// Closest-hit query. Returns an invalid `Preliminary` if nothing is hit.
    pub fn ray_intersect(&self, shapes: &[Arc<dyn Shape>], r: &Ray) -> Preliminary {
        let tree = match &self.root {
            Some(tree) => tree,
            None => return Preliminary::invalid(),
        };
        if !tree.bbox.intersect(r) {
            return Preliminary::invalid();
        }

        let mut node_stack = Vec::with_capacity(60);
        node_stack.push(tree);

        let mut best = Preliminary::invalid();
        let mut ray = *r;
        while let Some(node) = node_stack.pop() {
            if !node.bbox.intersect(&ray) {
                continue;
            }
            match &node.content {
                Leaf(range) => {
                    // Ranges are not `Copy`: https://github.com/rust-lang/rust/pull/27186
                    for prim in self.prims[range.clone()].iter() {
                        let shape = &shapes[prim.shape_index as usize];
                        if let Some(hit) = shape.intersect_prim(prim.prim_index, &ray) {
                            if hit.ray_t < best.ray_t {
                                best = Preliminary::new(
                                    hit.ray_t,
                                    hit.uv,
                                    prim.shape_index,
                                    prim.prim_index,
                                );
                            }
                        }
                    }
                }
                Children([left, right], axis) => {
                    // Visit the nearer child first.
                    if ray.dir[*axis] > 0.0 {
                        node_stack.push(right);
                        node_stack.push(left);
                    } else {
                        node_stack.push(left);
                        node_stack.push(right);
                    }
                }
            }
            if best.is_valid() {
                ray.set_extent(best.ray_t);
            }
        }
        best
    }

    /// Any-hit query: true as soon as one primitive occludes the ray.
    pub fn ray_test(&self, shapes: &[Arc<dyn Shape>], r: &Ray) -> bool {
        let tree = match &self.root {
            Some(tree) => tree,
            None => return false,
        };

        let mut node_stack = vec![tree];
        while let Some(node) = node_stack.pop() {
            if !node.bbox.intersect(r) {
                continue;
            }
            match &node.content {
                Leaf(range) => {
                    let occluded = self.prims[range.clone()].iter().any(|prim| {
                        shapes[prim.shape_index as usize].occludes_prim(prim.prim_index, r)
                    });
                    if occluded {
                        return true;
                    }
                }
                Children([left, right], _) => {
                    node_stack.push(left);
                    node_stack.push(right);
                }
            }
        }
        false
    }
}

fn recursive_build<S, F>(prims: &mut Vec<S>, range: Range<usize>, box_getter: F) -> BvhNode
where
    F: Fn(&S) -> BBox + Copy,
{
    if range.len() <= 4 {
        let bbox = prims[range.clone()]
            .iter()
            .fold(BBox::empty(), |b, p| bbox::union(b, box_getter(p)));
        return BvhNode {
            bbox,
            content: Leaf(range),
        };
    }

    let mut bboxes: Vec<_> = prims[range.clone()].iter().map(|p| box_getter(p)).collect();
    let centroid_bbox = bboxes
        .iter()
        .fold(BBox::empty(), |sum, b| sum.union(b.midpoint()));
    let split_axis = centroid_bbox.max_dimension();
    if centroid_bbox.diag()[split_axis] < 1e-8 {
        // All centroids coincide; a leaf is the only sensible node.
        return BvhNode {
            bbox: bboxes
                .iter()
                .fold(BBox::empty(), |b0, b1| bbox::union(b0, *b1)),
            content: Leaf(range),
        };
    }

    // Computes the plane "axis = pivot_value" that will be used to partition the primitives:
    // sort the boxes along the split axis, then walk the prefix until half of the total surface
    // area is covered.
    bboxes.sort_by(|b0, b1| {
        let axis_pos_0 = b0.midpoint()[split_axis];
        let axis_pos_1 = b1.midpoint()[split_axis];
        axis_pos_0.partial_cmp(&axis_pos_1).unwrap()
    });

    let bbox_area_sum: f32 = bboxes.iter().map(|b| b.area()).sum();
    let surface_area_pivot = bbox_area_sum * 0.5;

    let mut partial_sum = 0.0;
    let mut split_index = 0;
    for (i, b) in bboxes.iter().enumerate() {
        partial_sum += b.area();
        if partial_sum >= surface_area_pivot {
            split_index = i;
            break;
        }
    }
    let pivot_value = bboxes[split_index].midpoint()[split_axis];

    let (left, right) = partition(&mut prims[range.clone()], |p| {
        box_getter(p).midpoint()[split_axis] <= pivot_value
    });
    let mut mid_point = left.len() + range.start;
    debug_assert_eq!(range.end - mid_point, right.len());

    if left.is_empty() || right.is_empty() {
        // The pivot failed to separate anything; fall back to a median split.
        prims[range.clone()].select_nth_unstable_by(range.len() / 2, |p0, p1| {
            box_getter(p0).midpoint()[split_axis]
                .partial_cmp(&box_getter(p1).midpoint()[split_axis])
                .unwrap()
        });
        mid_point = range.start + range.len() / 2;
    }
    assert!(mid_point != range.start && mid_point != range.end);

    let left_child = recursive_build(prims, range.start..mid_point, box_getter);
    let right_child = recursive_build(prims, mid_point..range.end, box_getter);

    BvhNode {
        bbox: bbox::union(left_child.bbox, right_child.bbox),
        content: Children([Box::new(left_child), Box::new(right_child)], split_axis),
    }
}

#[test]
fn closest_hit_across_many_spheres() {
    use glam::Vec3;
    use shape::Sphere;

    // A row of spheres along +z; the query must report the nearest one and its ordinal.
    let shapes: Vec<Arc<dyn Shape>> = (0..16)
        .map(|i| {
            Arc::new(Sphere::new(Vec3::new(0.0, 0.0, 3.0 * i as f32 + 5.0), 1.0))
                as Arc<dyn Shape>
        })
        .collect();
    let index = PrimBvh::build(&shapes);
    assert_eq!(index.primitive_count(), 16);

    let ray = Ray::new(Vec3::ZERO, Vec3::Z);
    let pi = index.ray_intersect(&shapes, &ray);
    assert!(pi.is_valid());
    assert_eq!(pi.shape_index, 0);
    assert!((pi.ray_t - 4.0).abs() < 1e-3);
    assert!(index.ray_test(&shapes, &ray));

    // Starting past the first few spheres finds a later ordinal.
    let ray = Ray::new(Vec3::new(0.0, 0.0, 9.5), Vec3::Z);
    let pi = index.ray_intersect(&shapes, &ray);
    assert_eq!(pi.shape_index, 2);
    assert!((pi.ray_t - 0.5).abs() < 1e-3);

    let side = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::Z);
    assert!(!index.ray_intersect(&shapes, &side).is_valid());
    assert!(!index.ray_test(&shapes, &side));
}
