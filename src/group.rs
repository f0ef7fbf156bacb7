//! Shape aggregation and per-group hit resolution.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use glam::Mat4;
use once_cell::sync::OnceCell;

use geometry::bbox::{self, BBox};
use geometry::interaction::{HitFlags, SurfaceInteraction};
use geometry::ray::Ray;
use shape::gpu::{self, GpuInstance, HitGroupRecord};
use shape::hwaccel::{HwDevice, HwGeometry, HwScene};
use shape::{Preliminary, PrimHit, Shape};

use crate::accel::bvh::PrimBvh;
use crate::accel::{Backend, GroupAccel};
use crate::error::{GroupError, Result};
use crate::registry::RegistryBridge;

/// What the scene-graph layer hands to the aggregator: either something that satisfies the
/// shape interface, or an object of some other type that the parser could not coerce.
pub enum SceneObject {
    Shape(Arc<dyn Shape>),
    Other { type_name: String },
}

impl SceneObject {
    pub fn shape<S: Shape + 'static>(s: S) -> SceneObject {
        SceneObject::Shape(Arc::new(s))
    }
}

/// An aggregate of shapes that is built once and referenced by any number of transformed
/// instances. The group owns one acceleration structure matching the backend it was
/// constructed for, and resolves hits against that structure back to its children.
///
/// Construction validates the topology up front: a group may not contain another group, an
/// instance wrapper, an emitter, or a sensor. Any violation fails the whole construction.
pub struct ShapeGroup {
    id: String,
    shapes: Vec<Arc<dyn Shape>>,
    bbox: BBox,
    has_meshes: bool,
    has_others: bool,
    accel: GroupAccel,
}

impl fmt::Debug for ShapeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeGroup")
            .field("id", &self.id)
            .field("has_meshes", &self.has_meshes)
            .field("has_others", &self.has_others)
            .finish()
    }
}

impl ShapeGroup {
    pub fn new(id: &str, children: Vec<SceneObject>, backend: &Backend) -> Result<ShapeGroup> {
        let mut shapes: Vec<Arc<dyn Shape>> = Vec::with_capacity(children.len());
        let mut bbox = BBox::empty();
        let mut has_meshes = false;
        let mut has_others = false;

        for child in children {
            let shape = match child {
                SceneObject::Shape(shape) => shape,
                SceneObject::Other { type_name } => {
                    return Err(GroupError::UnsupportedChild(type_name))
                }
            };
            if shape.type_name() == "instance" {
                return Err(GroupError::NestedInstancing);
            }
            if shape.type_name() == "group" {
                return Err(GroupError::NestedGroup);
            }
            if shape.is_emitter() {
                return Err(GroupError::EmitterChild);
            }
            if shape.is_sensor() {
                return Err(GroupError::SensorChild);
            }
            bbox = bbox::union(bbox, shape.bbox());
            has_meshes |= shape.is_mesh();
            has_others |= !shape.is_mesh();
            shapes.push(shape);
        }

        let accel = match backend {
            Backend::Scalar => {
                let index = PrimBvh::build(&shapes);
                // The index computes bounds from primitive data, which may be tighter than
                // the boxes the shapes reported; prefer its answer.
                bbox = index.bbox();
                GroupAccel::Software(index)
            }
            Backend::Vectorized(registry) => GroupAccel::Hardware {
                scene: OnceCell::new(),
                bridge: RegistryBridge::populate(&shapes, registry.as_ref()),
                registry: Arc::clone(registry),
            },
            Backend::Gpu => GroupAccel::Gpu {
                blas: OnceCell::new(),
                sbt_offset: AtomicU32::new(0),
            },
        };

        log::debug!(
            "built shape group \"{}\": {} children, backend {:?}",
            id,
            shapes.len(),
            backend
        );
        Ok(ShapeGroup {
            id: id.to_string(),
            shapes,
            bbox,
            has_meshes,
            has_others,
            accel,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn children(&self) -> &[Arc<dyn Shape>] {
        &self.shapes
    }

    pub fn has_meshes(&self) -> bool {
        self.has_meshes
    }

    pub fn has_others(&self) -> bool {
        self.has_others
    }

    /// Scalar closest-hit query against the software index. The returned record carries the
    /// distance, the primitive's local UV, and the (shape ordinal, primitive ordinal) pair.
    pub fn ray_intersect_scalar(&self, r: &Ray) -> Preliminary {
        match &self.accel {
            GroupAccel::Software(index) => index.ray_intersect(&self.shapes, r),
            _ => panic!("ray_intersect_scalar() requires the software index backend"),
        }
    }

    /// Scalar any-hit query against the software index.
    pub fn ray_test_scalar(&self, r: &Ray) -> bool {
        match &self.accel {
            GroupAccel::Software(index) => index.ray_test(&self.shapes, r),
            _ => panic!("ray_test_scalar() requires the software index backend"),
        }
    }

    /// GPU backend: builds the group's bottom-level structure (at most once) and appends one
    /// top-level instance entry referencing it.
    pub fn prepare_gpu_instances(
        &self,
        instance_id: u32,
        to_world: Mat4,
        out: &mut Vec<GpuInstance>,
    ) {
        match &self.accel {
            GroupAccel::Gpu { blas, sbt_offset } => {
                let blas = blas.get_or_init(|| gpu::build_blas(&self.shapes));
                out.push(GpuInstance {
                    blas: Arc::clone(blas),
                    instance_id,
                    sbt_offset: sbt_offset.load(Ordering::SeqCst),
                    to_world,
                });
            }
            _ => panic!("prepare_gpu_instances() requires the GPU backend"),
        }
    }

    /// GPU backend: where this group's hit-group records start in the shader binding table.
    /// Meaningful once the table has been filled.
    pub fn sbt_offset(&self) -> u32 {
        match &self.accel {
            GroupAccel::Gpu { sbt_offset, .. } => sbt_offset.load(Ordering::SeqCst),
            _ => panic!("sbt_offset() requires the GPU backend"),
        }
    }

    /// The ordinal-to-identifier buffer, for callers assembling device-side tables.
    /// Vectorized backend only.
    pub fn registry_ids(&self) -> &[u32] {
        match &self.accel {
            GroupAccel::Hardware { bridge, .. } => bridge.ids(),
            _ => panic!("registry_ids() requires the hardware scene backend"),
        }
    }
}

impl Shape for ShapeGroup {
    fn type_name(&self) -> &'static str {
        "group"
    }

    fn summary(&self) -> String {
        format!(
            "ShapeGroup[\n  name = \"{}\",\n  prim_count = {}\n]",
            self.id,
            self.primitive_count()
        )
    }

    fn bbox(&self) -> BBox {
        self.bbox
    }

    /// For the software backend this is the index's own count (degenerate primitives are
    /// dropped at build time); for the other backends it is the plain sum over the children.
    fn primitive_count(&self) -> u32 {
        match &self.accel {
            GroupAccel::Software(index) => index.primitive_count(),
            _ => self.shapes.iter().map(|s| s.primitive_count()).sum(),
        }
    }

    fn prim_bbox(&self, _prim_index: u32) -> BBox {
        panic!("group primitives are indexed by the group's own structure");
    }

    fn intersect_prim(&self, _prim_index: u32, _r: &Ray) -> Option<PrimHit> {
        panic!("group primitives are indexed by the group's own structure");
    }

    /// Resolves the owning child of a preliminary hit and delegates the interaction
    /// computation to it.
    ///
    /// `depth` guards against re-entrant traversal: a group's geometry must not be entered
    /// from within an already-entered instance, so any call that is already one level deep
    /// terminates with the default (invalid) interaction.
    fn compute_surface_interaction(
        &self,
        r: &Ray,
        pi: &Preliminary,
        flags: HitFlags,
        depth: u32,
        active: bool,
    ) -> SurfaceInteraction {
        if !active {
            return SurfaceInteraction::default();
        }

        let shape: Arc<dyn Shape> = match &self.accel {
            GroupAccel::Software(_) => {
                assert!(
                    (pi.shape_index as usize) < self.shapes.len(),
                    "shape ordinal {} out of range ({} children)",
                    pi.shape_index,
                    self.shapes.len()
                );
                Arc::clone(&self.shapes[pi.shape_index as usize])
            }
            GroupAccel::Hardware {
                bridge, registry, ..
            } => {
                let id = bridge.gather(pi.shape_index);
                registry.resolve(id).unwrap_or_else(|| {
                    panic!("registry identifier {} does not resolve to a shape", id)
                })
            }
            GroupAccel::Gpu { .. } => {
                let shape = pi
                    .shape
                    .as_ref()
                    .expect("GPU hit records carry the owning shape");
                Arc::clone(shape)
            }
        };

        if depth > 0 {
            return SurfaceInteraction::default();
        }

        shape.compute_surface_interaction(r, pi, flags, 1, active)
    }

    /// Lazily builds the engine scene over the children (at most once), then mints a fresh
    /// instance handle against it. Hardware scene backend only.
    fn hw_geometry(&self, device: &Arc<HwDevice>) -> HwGeometry {
        match &self.accel {
            GroupAccel::Hardware { scene, .. } => {
                let scene = scene.get_or_init(|| {
                    log::trace!("building hardware scene for group \"{}\"", self.id);
                    let mut hw_scene = HwScene::new(device);
                    for shape in &self.shapes {
                        hw_scene.attach(shape.hw_geometry(device));
                    }
                    // Asynchronous writes to the children's geometry buffers must retire
                    // before the scene build reads them.
                    device.sync();
                    hw_scene.commit()
                });
                HwGeometry::instance_of(scene)
            }
            _ => panic!("hw_geometry() requires the hardware scene backend"),
        }
    }

    /// Records this group's offset into the hit-record table, then appends one record per
    /// child. GPU backend only.
    fn push_hit_records(&self, out: &mut Vec<HitGroupRecord>) {
        match &self.accel {
            GroupAccel::Gpu { sbt_offset, .. } => {
                sbt_offset.store(out.len() as u32, Ordering::SeqCst);
                gpu::fill_hit_records(&self.shapes, out);
            }
            _ => panic!("push_hit_records() requires the GPU backend"),
        }
    }
}

impl fmt::Display for ShapeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
