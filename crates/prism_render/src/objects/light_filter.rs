use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;
use prism_core::{PrismError, Result};
use prism_scene::{
    AttributesHandle, ObjectInterface, ObjectSet, check_sample_count, ensure_uniform_samples,
};

use super::Transform;
use crate::attributes::AttributesBundle;
use crate::context::{SceneContext, bundle};
use crate::convert::declare_and_set;
use crate::native::{NodeKey, ParamValue};
use crate::shader_cache::ShaderHandle;

struct FilterState {
    attributes: AttributesHandle,
    shader: ShaderHandle,
    transform: Transform,
    id: Option<u32>,
}

/// A light filter, linked to lights through their `lightFilters` role.
///
/// The root node never changes identity: an edit that would change the
/// filter type is refused, so lights never point at a stale node.
pub struct LightFilterHandle {
    name: String,
    context: Arc<SceneContext>,
    root: NodeKey,
    state: Mutex<FilterState>,
}

impl std::fmt::Debug for LightFilterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightFilterHandle")
            .field("name", &self.name)
            .field("root", &self.root)
            .finish()
    }
}

impl LightFilterHandle {
    pub(crate) fn new(context: Arc<SceneContext>, name: &str, attributes: AttributesHandle) -> Result<Self> {
        let (_, network) = bundle(&attributes)?
            .light_filter_shader()
            .ok_or_else(|| PrismError::MissingData {
                context: format!("light filter \"{name}\""),
                name: "prism:lightFilter:<name>".into(),
            })?;
        let shader = context
            .shaders()
            .convert_unique(network, &format!("lightFilter:{name}"))?;

        Ok(Self {
            name: name.to_string(),
            root: shader.root(),
            context,
            state: Mutex::new(FilterState {
                attributes,
                shader,
                transform: Transform::default(),
                id: None,
            }),
        })
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.root
    }

    #[must_use]
    pub fn filter_type(&self) -> String {
        self.state.lock().shader.root_type().to_string()
    }

    fn set_transform(&self, transform: Transform) {
        let mut state = self.state.lock();
        transform.apply(self.context.scope(), self.root);
        state.transform = transform;
    }
}

impl ObjectInterface for LightFilterHandle {
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
        let Some((_, network)) = AttributesBundle::from_handle(attributes).and_then(AttributesBundle::light_filter_shader)
        else {
            return false;
        };

        let mut state = self.state.lock();
        if Arc::ptr_eq(&state.attributes, attributes) {
            return true;
        }
        if !self.context.shaders().update(&mut state.shader, network) {
            return false;
        }
        state.transform.apply(self.context.scope(), self.root);
        if let Some(id) = state.id {
            declare_and_set(self.context.scope(), self.root, "entity_id", ParamValue::UInt(id), false);
        }
        state.attributes = attributes.clone();
        true
    }

    fn link(&self, role: &str, _objects: Option<&ObjectSet>) {
        self.context.scope().messages().warning(
            "prism::LightFilterHandle",
            format!("\"{}\" : unsupported link role \"{role}\"", self.name),
        );
    }

    fn assign_id(&self, id: u32) {
        self.state.lock().id = Some(id);
        declare_and_set(self.context.scope(), self.root, "entity_id", ParamValue::UInt(id), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Universe;
    use crate::objects::LightHandle;
    use crate::registry::Registry;
    use crate::scope::NodeScope;
    use crate::settings::NodeLifetime;
    use prism_core::MessageHandler;
    use prism_scene::{Dictionary, Shader, ShaderNetwork};
    use std::any::Any;

    fn context() -> Arc<SceneContext> {
        SceneContext::new(NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            MessageHandler::new(),
            NodeLifetime::Arena,
        ))
    }

    fn filter_attributes(context: &SceneContext, filter_type: &str, density: f32) -> AttributesHandle {
        let network = ShaderNetwork::single("f", Shader::new(filter_type, "lightFilter").with_parameter("density", density));
        context.attributes(&Dictionary::new().with("prism:lightFilter:blocker", network))
    }

    #[test]
    fn test_filter_type_change_is_refused() {
        let context = context();
        let filter = context
            .light_filter("blocker", None, &filter_attributes(&context, "light_blocker", 0.5))
            .unwrap();

        assert!(filter.attributes(&filter_attributes(&context, "light_blocker", 0.8)));
        assert!(!filter.attributes(&filter_attributes(&context, "gobo", 0.8)));

        let any: &dyn Any = &*filter;
        let handle = any.downcast_ref::<LightFilterHandle>().unwrap();
        assert_eq!(handle.filter_type(), "light_blocker");
        assert_eq!(
            context.scope().universe().param(handle.root(), "density"),
            Some(ParamValue::Float(0.8))
        );
    }

    #[test]
    fn test_assigned_id_survives_updates() {
        let context = context();
        let filter = context
            .light_filter("blocker", None, &filter_attributes(&context, "light_blocker", 0.5))
            .unwrap();
        filter.assign_id(11);
        assert!(filter.attributes(&filter_attributes(&context, "light_blocker", 0.9)));

        let any: &dyn Any = &*filter;
        let root = any.downcast_ref::<LightFilterHandle>().unwrap().root();
        let u = context.scope().universe();
        assert_eq!(u.param(root, "entity_id"), Some(ParamValue::UInt(11)));
        assert_eq!(u.param(root, "density"), Some(ParamValue::Float(0.9)));
    }

    #[test]
    fn test_lights_link_filters() {
        let context = context();
        let filter = context
            .light_filter("blocker", None, &filter_attributes(&context, "light_blocker", 0.5))
            .unwrap();
        let light_network = ShaderNetwork::single("l", Shader::new("spot_light", "light"));
        let light = context
            .light("spot", None, &context.attributes(&Dictionary::new().with("light", light_network)))
            .unwrap();

        light.link("lightFilters", Some(&vec![filter.clone()]));
        let light_root = {
            let any: &dyn Any = &*light;
            any.downcast_ref::<LightHandle>().unwrap().root()
        };
        let filter_root = {
            let any: &dyn Any = &*filter;
            any.downcast_ref::<LightFilterHandle>().unwrap().root()
        };

        let u = context.scope().universe();
        assert_eq!(u.param(light_root, "filters"), Some(ParamValue::nodes([filter_root])));
        light.link("lightFilters", None);
        assert!(!u.is_set(light_root, "filters"));
    }
}
