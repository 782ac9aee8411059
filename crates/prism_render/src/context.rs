//! Scene Context
//!
//! One translation context: a [`NodeScope`] with its own [`ShaderCache`]
//! and [`InstanceCache`], and the entity factory built on top of them.
//!
//! The renderer owns the top-level context. Every procedural expansion gets
//! a private one scoped to the procedural's node, so nothing created inside
//! a procedural is ever shared with, or visible in, the caches above it.

use std::sync::Arc;

use prism_core::{PrismError, Result};
use prism_scene::{
    AttributesHandle, CameraData, Dictionary, Object, ObjectInterfacePtr, ObjectKind,
};

use crate::attributes::AttributesBundle;
use crate::instance_cache::InstanceCache;
use crate::objects::{CameraHandle, LightFilterHandle, LightHandle, ObjectHandle};
use crate::scope::NodeScope;
use crate::shader_cache::ShaderCache;

#[derive(Debug)]
pub struct SceneContext {
    scope: NodeScope,
    shaders: ShaderCache,
    instances: InstanceCache,
}

impl SceneContext {
    #[must_use]
    pub fn new(scope: NodeScope) -> Arc<Self> {
        Arc::new(Self {
            shaders: ShaderCache::new(scope.clone()),
            instances: InstanceCache::new(scope.clone()),
            scope,
        })
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> &NodeScope {
        &self.scope
    }

    #[inline]
    #[must_use]
    pub fn shaders(&self) -> &ShaderCache {
        &self.shaders
    }

    #[inline]
    #[must_use]
    pub fn instances(&self) -> &InstanceCache {
        &self.instances
    }

    // ========================================================================
    // Entity factory
    // ========================================================================

    #[must_use]
    pub fn attributes(&self, attributes: &Dictionary) -> AttributesHandle {
        Arc::new(AttributesBundle::new(attributes, &self.shaders, self.scope.messages()))
    }

    pub fn object(self: &Arc<Self>, name: &str, object: &Object, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        let bundle = bundle(attributes)?;
        let instance = self.instances.get(object, bundle, name)?;
        Ok(Arc::new(ObjectHandle::new(self.clone(), instance, attributes.clone())))
    }

    pub fn object_samples(
        self: &Arc<Self>,
        name: &str,
        samples: &[Object],
        times: &[f32],
        attributes: &AttributesHandle,
    ) -> Result<ObjectInterfacePtr> {
        let bundle = bundle(attributes)?;
        let instance = self.instances.get_samples(samples, times, bundle, name)?;
        Ok(Arc::new(ObjectHandle::new(self.clone(), instance, attributes.clone())))
    }

    pub fn light(
        self: &Arc<Self>,
        name: &str,
        object: Option<&Object>,
        attributes: &AttributesHandle,
    ) -> Result<ObjectInterfacePtr> {
        if let Some(object) = object
            && object.kind() != ObjectKind::Mesh
        {
            return Err(PrismError::UnsupportedObject(format!(
                "light \"{name}\" : only meshes can be lights, not {}",
                object.kind()
            )));
        }
        Ok(Arc::new(LightHandle::new(self.clone(), name, object, attributes.clone())?))
    }

    pub fn light_filter(
        self: &Arc<Self>,
        name: &str,
        object: Option<&Object>,
        attributes: &AttributesHandle,
    ) -> Result<ObjectInterfacePtr> {
        if object.is_some() {
            self.scope.messages().debug(
                "prism::SceneContext",
                format!("light filter \"{name}\" : geometry is ignored"),
            );
        }
        Ok(Arc::new(LightFilterHandle::new(self.clone(), name, attributes.clone())?))
    }

    pub fn camera(
        self: &Arc<Self>,
        name: &str,
        camera: &CameraData,
        attributes: &AttributesHandle,
    ) -> Result<Arc<CameraHandle>> {
        bundle(attributes)?;
        Ok(Arc::new(CameraHandle::new(self.clone(), name, camera)?))
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Sweeps both caches. Instances go first since masters may hold
    /// displacement shaders. Returns `(shaders, instances)` removed.
    pub fn clear_unused(&self) -> (usize, usize) {
        let instances = self.instances.clear_unused();
        let shaders = self.shaders.clear_unused();
        (shaders, instances)
    }

    pub fn clear(&self) {
        self.instances.clear();
        self.shaders.clear();
    }
}

/// The [`AttributesBundle`] behind `attributes`.
pub(crate) fn bundle(attributes: &AttributesHandle) -> Result<&AttributesBundle> {
    AttributesBundle::from_handle(attributes).ok_or_else(|| {
        PrismError::UnsupportedObject("attributes were created by a different renderer".into())
    })
}
