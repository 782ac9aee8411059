use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;
use prism_core::{PrismError, Result};
use prism_scene::{
    AttributesHandle, CameraData, Object, ObjectInterface, ObjectKind, ObjectSet, check_sample_count,
    ensure_uniform_samples,
};

use super::Transform;
use crate::context::SceneContext;
use crate::convert::declare_and_set;
use crate::native::{NodeKey, ParamValue};
use crate::scope::OwnedNode;

/// A render camera.
///
/// Resolution, crop window and shutter live on [`CameraData`] but are
/// pushed into the global options by the renderer before each render.
pub struct CameraHandle {
    name: String,
    context: Arc<SceneContext>,
    data: CameraData,
    node: OwnedNode,
    transform: Mutex<Transform>,
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("name", &self.name)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl CameraHandle {
    pub(crate) fn new(
        context: Arc<SceneContext>,
        name: &str,
        camera: &CameraData,
    ) -> Result<Self> {
        let converter = context
            .scope()
            .registry()
            .converter(ObjectKind::Camera)
            .ok_or_else(|| PrismError::UnsupportedObject("no converter registered for Camera".into()))?;
        let node = converter.convert(&Object::Camera(camera.clone()), context.scope(), name)?;

        Ok(Self {
            name: name.to_string(),
            context,
            data: camera.clone(),
            node,
            transform: Mutex::new(Transform::default()),
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &CameraData {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeKey {
        self.node.key()
    }

    /// The current transform, or its first sample when time-sampled.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.transform.lock().first()
    }

    fn set_transform(&self, transform: Transform) {
        let mut current = self.transform.lock();
        transform.apply(self.context.scope(), self.node.key());
        *current = transform;
    }
}

impl ObjectInterface for CameraHandle {
    fn transform(&self, matrix: Mat4) {
        self.set_transform(Transform::fixed(matrix));
    }

    fn transform_samples(&self, samples: &[Mat4], times: &[f32]) -> Result<()> {
        check_sample_count(samples.len(), times.len())?;
        ensure_uniform_samples(times)?;
        self.set_transform(Transform::sampled(samples, times));
        Ok(())
    }

    /// Cameras have no attribute-driven state.
    fn attributes(&self, _attributes: &AttributesHandle) -> bool {
        true
    }

    fn link(&self, role: &str, _objects: Option<&ObjectSet>) {
        self.context.scope().messages().warning(
            "prism::CameraHandle",
            format!("\"{}\" : unsupported link role \"{role}\"", self.name),
        );
    }

    fn assign_id(&self, id: u32) {
        declare_and_set(self.context.scope(), self.node.key(), "entity_id", ParamValue::UInt(id), false);
    }
}
