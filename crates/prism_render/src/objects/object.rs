use std::any::Any;
use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;
use prism_core::Result;
use prism_scene::{
    AttributesHandle, ObjectInterface, ObjectSet, check_sample_count, ensure_uniform_samples,
};

use super::{LightHandle, Transform, native_roots, set_link};
use crate::attributes::AttributesBundle;
use crate::context::SceneContext;
use crate::convert::declare_and_set;
use crate::instance_cache::Instance;
use crate::native::{NodeKey, ParamValue};

const CONTEXT: &str = "prism::ObjectHandle";

struct ObjectState {
    attributes: AttributesHandle,
    transform: Transform,
}

/// A geometric entity.
pub struct ObjectHandle {
    context: Arc<SceneContext>,
    instance: Instance,
    state: Mutex<ObjectState>,
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle").field("instance", &self.instance).finish()
    }
}

impl ObjectHandle {
    pub(crate) fn new(context: Arc<SceneContext>, instance: Instance, attributes: AttributesHandle) -> Self {
        if let Some(bundle) = AttributesBundle::from_handle(&attributes) {
            bundle.apply_non_geometric(context.scope(), instance.node(), instance.shape(), None);
        }
        Self {
            context,
            instance,
            state: Mutex::new(ObjectState {
                attributes,
                transform: Transform::default(),
            }),
        }
    }

    /// The node carrying this entity's transform and attributes.
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeKey {
        self.instance.node()
    }

    #[inline]
    #[must_use]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The current transform, or its first sample when time-sampled.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.state.lock().transform.first()
    }

    fn set_transform(&self, transform: Transform) {
        let mut state = self.state.lock();
        transform.apply(self.context.scope(), self.node());
        state.transform = transform;
    }
}

impl ObjectInterface for ObjectHandle {
    fn transform(&self, matrix: Mat4) {
        self.set_transform(Transform::fixed(matrix));
    }

    fn transform_samples(&self, samples: &[Mat4], times: &[f32]) -> Result<()> {
        check_sample_count(samples.len(), times.len())?;
        ensure_uniform_samples(times)?;
        self.set_transform(Transform::sampled(samples, times));
        Ok(())
    }

    fn attributes(&self, attributes: &AttributesHandle) -> bool {
        let Some(bundle) = AttributesBundle::from_handle(attributes) else {
            return false;
        };
        let mut state = self.state.lock();
        let previous = AttributesBundle::from_handle(&state.attributes);
        if !bundle.apply_non_geometric(self.context.scope(), self.node(), self.instance.shape(), previous) {
            return false;
        }
        state.attributes = attributes.clone();
        true
    }

    fn link(&self, role: &str, objects: Option<&ObjectSet>) {
        let (group, use_group) = match role {
            "lights" => ("light_group", "use_light_group"),
            "shadowedLights" => ("shadow_group", "use_shadow_group"),
            _ => {
                self.context
                    .scope()
                    .messages()
                    .warning(CONTEXT, format!("Unsupported link role \"{role}\""));
                return;
            }
        };

        let _state = self.state.lock();
        let scope = self.context.scope();
        let roots = objects.map(|objects| {
            native_roots(objects, |any: &dyn Any| {
                any.downcast_ref::<LightHandle>().map(LightHandle::root)
            })
        });
        scope.set(self.node(), use_group, roots.is_some());
        set_link(scope, self.node(), group, roots);
    }

    fn assign_id(&self, id: u32) {
        declare_and_set(self.context.scope(), self.node(), "entity_id", ParamValue::UInt(id), false);
    }
}
