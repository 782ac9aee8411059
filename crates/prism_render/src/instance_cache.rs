//! Instance Cache
//!
//! Deduplicates native geometry by the content hash of the source object,
//! its motion samples and the geometry-affecting attributes it is baked with.
//!
//! # Overview
//!
//! Every entity gets an [`Instance`]:
//!
//! - **Shared**: a hidden master node (`instance:<hash>`, visibility 0)
//!   referenced by a per-entity `ginstance` node named after the entity.
//!   Masters are created once per hash, even when many threads ask at once.
//! - **Unique**: the entity's own shape node, used for objects the
//!   attributes mark as non-instanceable.
//!
//! Procedurals are expanded into a private context parented to their
//! master node (see [`procedural`](crate::procedural)).

use std::sync::Arc;

use prism_core::{ContentHash, ContentHasher, Hash128, PrismError, Result};
use prism_scene::{Object, ObjectKind, check_sample_count, ensure_uniform_samples};

use crate::attributes::AttributesBundle;
use crate::cache::OnceCache;
use crate::native::{NodeKey, ShapeKind};
use crate::procedural::{self, Expansion};
use crate::scope::{NodeScope, OwnedNode};
use crate::shader_cache::ShaderHandle;

/// The native node family an object converts to. `None` for cameras.
#[must_use]
pub fn shape_kind(kind: ObjectKind) -> Option<ShapeKind> {
    match kind {
        ObjectKind::Mesh => Some(ShapeKind::Mesh),
        ObjectKind::Curves => Some(ShapeKind::Curves),
        ObjectKind::Points => Some(ShapeKind::Points),
        ObjectKind::Volume => Some(ShapeKind::Volume),
        ObjectKind::ExternalProcedural | ObjectKind::Procedural => Some(ShapeKind::Procedural),
        ObjectKind::Camera => None,
    }
}

/// A converted shape plus whatever must live as long as it does.
struct Geometry {
    node: OwnedNode,
    _displacement: Option<Arc<ShaderHandle>>,
    _expansion: Option<Expansion>,
}

/// The native representation of one entity's geometry.
pub struct Instance {
    /// The `ginstance` node, when the geometry is shared.
    reference: Option<OwnedNode>,
    geometry: Arc<Geometry>,
    shape: ShapeKind,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("node", &self.node())
            .field("master", &self.master())
            .field("shape", &self.shape)
            .finish()
    }
}

impl Instance {
    /// The node the entity's transform and non-geometric attributes go on.
    #[must_use]
    pub fn node(&self) -> NodeKey {
        self.reference.as_ref().map_or_else(|| self.geometry.node.key(), OwnedNode::key)
    }

    /// The node holding the geometry itself.
    #[inline]
    #[must_use]
    pub fn master(&self) -> NodeKey {
        self.geometry.node.key()
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    #[inline]
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.reference.is_some()
    }
}

pub struct InstanceCache {
    scope: NodeScope,
    cache: OnceCache<Geometry>,
}

impl std::fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCache")
            .field("len", &self.cache.len())
            .field("scope", &self.scope)
            .finish()
    }
}

impl InstanceCache {
    #[must_use]
    pub fn new(scope: NodeScope) -> Self {
        Self {
            scope,
            cache: OnceCache::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> &NodeScope {
        &self.scope
    }

    pub fn get(&self, object: &Object, attributes: &AttributesBundle, name: &str) -> Result<Instance> {
        self.instance(std::slice::from_ref(object), &[], attributes, name)
    }

    /// Time-sampled geometry. `times` must match `samples` in length and be
    /// uniformly spaced, and every sample must be the same kind of object.
    pub fn get_samples(
        &self,
        samples: &[Object],
        times: &[f32],
        attributes: &AttributesBundle,
        name: &str,
    ) -> Result<Instance> {
        check_sample_count(samples.len(), times.len())?;
        ensure_uniform_samples(times)?;
        self.instance(samples, times, attributes, name)
    }

    /// Converts `object` into geometry owned by the caller alone, bypassing
    /// the cache.
    pub fn get_unique(&self, object: &Object, attributes: &AttributesBundle, name: &str) -> Result<Instance> {
        let shape = Self::validate(std::slice::from_ref(object))?;
        let geometry = self.convert(std::slice::from_ref(object), &[], attributes, shape, name)?;
        Ok(Instance {
            reference: None,
            geometry: Arc::new(geometry),
            shape,
        })
    }

    fn validate(samples: &[Object]) -> Result<ShapeKind> {
        let first = samples.first().ok_or(PrismError::SampleCountMismatch { samples: 0, times: 0 })?;
        let kind = first.kind();
        if let Some(other) = samples.iter().find(|o| o.kind() != kind) {
            return Err(PrismError::SampleMismatch(format!(
                "samples mix {kind} and {}",
                other.kind()
            )));
        }
        shape_kind(kind).ok_or_else(|| {
            PrismError::UnsupportedObject(format!("{kind} objects cannot be converted to geometry"))
        })
    }

    fn instance(&self, samples: &[Object], times: &[f32], attributes: &AttributesBundle, name: &str) -> Result<Instance> {
        let shape = Self::validate(samples)?;

        if !samples.iter().all(|o| attributes.can_instance(o)) {
            let geometry = self.convert(samples, times, attributes, shape, name)?;
            return Ok(Instance {
                reference: None,
                geometry: Arc::new(geometry),
                shape,
            });
        }

        let key = Self::key(samples, times, attributes, shape);
        let geometry = self.cache.get_or_try_insert(key, || {
            let geometry = self.convert(samples, times, attributes, shape, &format!("instance:{key}"))?;
            // Only the references are visible.
            self.scope.set(geometry.node.key(), "visibility", 0u8);
            Ok(geometry)
        })?;

        let reference = self.scope.create("ginstance", name)?;
        self.scope.set(reference.key(), "node", geometry.node.key());
        self.scope.set(reference.key(), "inherit_xform", false);

        Ok(Instance {
            reference: Some(reference),
            geometry,
            shape,
        })
    }

    fn key(samples: &[Object], times: &[f32], attributes: &AttributesBundle, shape: ShapeKind) -> Hash128 {
        let mut h = ContentHasher::new();
        h.append(samples);
        h.append(times);
        h.write_hash(attributes.geometry_hash(shape));
        h.finish()
    }

    fn convert(
        &self,
        samples: &[Object],
        times: &[f32],
        attributes: &AttributesBundle,
        shape: ShapeKind,
        name: &str,
    ) -> Result<Geometry> {
        let (node, expansion) = match &samples[0] {
            Object::Procedural(content) => {
                if samples.len() > 1 {
                    self.scope.messages().debug(
                        "prism::InstanceCache",
                        format!("\"{name}\" : procedurals do not support motion samples; using the first"),
                    );
                }
                let node = self.scope.create("procedural", name)?;
                let expansion = procedural::expand(&self.scope, node.key(), content.as_ref(), attributes.source())?;
                (node, Some(expansion))
            }
            object => {
                let kind = object.kind();
                let converter = self
                    .scope
                    .registry()
                    .converter(kind)
                    .ok_or_else(|| PrismError::UnsupportedObject(format!("no converter registered for {kind}")))?;
                let node = if times.is_empty() {
                    converter.convert(object, &self.scope, name)?
                } else {
                    converter.convert_samples(samples, times, &self.scope, name)?
                };
                (node, None)
            }
        };

        attributes.apply_geometric(&self.scope, node.key(), shape);
        Ok(Geometry {
            node,
            _displacement: attributes.displacement().cloned().filter(|_| shape == ShapeKind::Mesh),
            _expansion: expansion,
        })
    }

    /// Drops masters no entity references any more. Returns how many.
    pub fn clear_unused(&self) -> usize {
        self.cache.clear_unused()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{ParamValue, Universe};
    use crate::registry::Registry;
    use crate::settings::NodeLifetime;
    use crate::shader_cache::ShaderCache;
    use prism_core::MessageHandler;
    use prism_scene::{Dictionary, MeshPrimitive, Value};

    struct Fixture {
        shaders: ShaderCache,
        instances: InstanceCache,
        messages: MessageHandler,
    }

    fn fixture(lifetime: NodeLifetime) -> Fixture {
        let messages = MessageHandler::new();
        let scope = NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            messages.clone(),
            lifetime,
        );
        Fixture {
            shaders: ShaderCache::new(scope.clone()),
            instances: InstanceCache::new(scope),
            messages,
        }
    }

    impl Fixture {
        fn bundle(&self, dict: &Dictionary) -> AttributesBundle {
            AttributesBundle::new(dict, &self.shaders, &self.messages)
        }
    }

    #[test]
    fn test_identical_objects_share_a_master() {
        let f = fixture(NodeLifetime::Arena);
        let attrs = f.bundle(&Dictionary::new());
        let plane = Object::from(MeshPrimitive::plane());

        let a = f.instances.get(&plane, &attrs, "a").unwrap();
        let b = f.instances.get(&plane, &attrs, "b").unwrap();
        assert!(a.is_shared());
        assert_eq!(a.master(), b.master());
        assert_ne!(a.node(), b.node());

        let u = f.instances.scope().universe();
        assert_eq!(u.param(a.master(), "visibility"), Some(ParamValue::Byte(0)));
        assert_eq!(u.param(a.node(), "node"), Some(ParamValue::Node(Some(a.master()))));
        assert_eq!(u.name(a.node()).as_deref(), Some("a"));
        assert_eq!(f.instances.len(), 1);
    }

    #[test]
    fn test_geometric_attributes_split_masters() {
        let f = fixture(NodeLifetime::Arena);
        let two = f.bundle(&Dictionary::new().with("prism:polymesh:subdiv_iterations", Value::from(2)));
        let three = f.bundle(&Dictionary::new().with("prism:polymesh:subdiv_iterations", Value::from(3)));
        let matte = f.bundle(
            &Dictionary::new()
                .with("prism:polymesh:subdiv_iterations", Value::from(2))
                .with("prism:matte", Value::from(true)),
        );
        let plane = Object::from(MeshPrimitive::plane());

        let a = f.instances.get(&plane, &two, "a").unwrap();
        let b = f.instances.get(&plane, &three, "b").unwrap();
        let c = f.instances.get(&plane, &matte, "c").unwrap();
        assert_ne!(a.master(), b.master());
        assert_eq!(a.master(), c.master());
        assert_eq!(
            f.instances.scope().universe().param(b.master(), "subdiv_iterations"),
            Some(ParamValue::Byte(3))
        );
    }

    #[test]
    fn test_non_instanceable_objects_are_unique() {
        let f = fixture(NodeLifetime::Arena);
        let attrs = f.bundle(&Dictionary::new().with("prism:automaticInstancing", Value::from(false)));
        let plane = Object::from(MeshPrimitive::plane());

        let a = f.instances.get(&plane, &attrs, "a").unwrap();
        assert!(!a.is_shared());
        assert_eq!(a.node(), a.master());
        assert!(f.instances.is_empty());
    }

    #[test]
    fn test_samples_are_validated() {
        let f = fixture(NodeLifetime::Arena);
        let attrs = f.bundle(&Dictionary::new());
        let plane = Object::from(MeshPrimitive::plane());
        let samples = vec![plane.clone(), plane.clone(), plane.clone(), plane];

        let err = f.instances.get_samples(&samples, &[0.0, 0.2, 0.5, 1.0], &attrs, "a");
        assert!(matches!(err, Err(PrismError::NonUniformSamples { .. })));
        let err = f.instances.get_samples(&samples[..2], &[0.0], &attrs, "a");
        assert!(matches!(err, Err(PrismError::SampleCountMismatch { .. })));
        f.instances.get_samples(&samples[..3], &[0.0, 0.5, 1.0], &attrs, "a").unwrap();
    }

    #[test]
    fn test_cameras_are_not_geometry() {
        let f = fixture(NodeLifetime::Arena);
        let attrs = f.bundle(&Dictionary::new());
        let camera = Object::from(prism_scene::CameraData::default());
        assert!(matches!(
            f.instances.get(&camera, &attrs, "cam"),
            Err(PrismError::UnsupportedObject(_))
        ));
    }

    #[test]
    fn test_clear_unused_destroys_eager_masters() {
        let f = fixture(NodeLifetime::Eager);
        let attrs = f.bundle(&Dictionary::new());
        let plane = Object::from(MeshPrimitive::plane());

        let a = f.instances.get(&plane, &attrs, "a").unwrap();
        let master = a.master();
        drop(a);
        let u = f.instances.scope().universe().clone();
        assert!(u.contains(master));
        assert_eq!(f.instances.clear_unused(), 1);
        assert!(!u.contains(master));
    }
}
