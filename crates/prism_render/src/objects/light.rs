use std::any::Any;
use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;
use prism_core::{PrismError, Result};
use prism_scene::{
    AttributesHandle, Object, ObjectInterface, ObjectSet, Parameter, ShaderNetwork, check_sample_count,
    ensure_uniform_samples,
};

use super::{LightFilterHandle, Transform, native_roots, set_link};
use crate::attributes::AttributesBundle;
use crate::context::{SceneContext, bundle};
use crate::convert::declare_and_set;
use crate::instance_cache::Instance;
use crate::native::{NodeKey, ParamValue};
use crate::shader_cache::ShaderHandle;

const CONTEXT: &str = "prism::LightHandle";

struct LightState {
    attributes: AttributesHandle,
    network: Arc<ShaderNetwork>,
    shader: ShaderHandle,
    transform: Transform,
    filters: Option<Vec<NodeKey>>,
    id: Option<u32>,
}

/// A light: a uniquely owned light shader graph, plus hidden geometry for
/// mesh lights.
pub struct LightHandle {
    name: String,
    context: Arc<SceneContext>,
    mesh: Option<Instance>,
    state: Mutex<LightState>,
}

impl std::fmt::Debug for LightHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightHandle")
            .field("name", &self.name)
            .field("mesh", &self.mesh)
            .finish_non_exhaustive()
    }
}

impl LightHandle {
    pub(crate) fn new(
        context: Arc<SceneContext>,
        name: &str,
        object: Option<&Object>,
        attributes: AttributesHandle,
    ) -> Result<Self> {
        let b = bundle(&attributes)?;
        let network = b.light_shader().cloned().ok_or_else(|| PrismError::MissingData {
            context: format!("light \"{name}\""),
            name: "prism:light".into(),
        })?;
        let shader = context.shaders().convert_unique(&network, &format!("light:{name}"))?;

        let mesh = match object {
            Some(object) => {
                let instance = context.instances().get_unique(object, b, &format!("light:{name}:mesh"))?;
                // Emission comes from the light; the mesh itself is never seen.
                context.scope().set(instance.master(), "visibility", 0u8);
                Some(instance)
            }
            None => None,
        };

        let light = Self {
            name: name.to_string(),
            context,
            mesh,
            state: Mutex::new(LightState {
                attributes,
                network,
                shader,
                transform: Transform::default(),
                filters: None,
                id: None,
            }),
        };
        light.bind(&light.state.lock());
        Ok(light)
    }

    /// The light node, which is what objects link to.
    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.state.lock().shader.root()
    }

    /// The hidden mesh of a mesh light.
    #[must_use]
    pub fn mesh(&self) -> Option<&Instance> {
        self.mesh.as_ref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// (Re)applies everything the light node holds besides its shader
    /// parameters.
    fn bind(&self, state: &LightState) {
        let scope = self.context.scope();
        let root = state.shader.root();
        state.transform.apply(scope, root);
        if let Some(mesh) = &self.mesh {
            scope.set(root, "mesh", mesh.master());
            state.transform.apply(scope, mesh.master());
        }
        if state.filters.is_some() {
            set_link(scope, root, "filters", state.filters.clone());
        }
        if let Some(id) = state.id {
            declare_and_set(scope, root, "entity_id", ParamValue::UInt(id), false);
        }
    }

    fn set_transform(&self, transform: Transform) {
        let mut state = self.state.lock();
        state.transform = transform;
        self.bind(&state);
    }

    /// `true` when the light type must be rebuilt because the network
    /// feeding its `color` changed.
    fn needs_rebuild(&self, state: &LightState, network: &ShaderNetwork) -> bool {
        let policy = self.context.scope().registry().light_update_policy();
        if !policy.rebuilds_on_color_change(state.shader.root_type()) {
            return false;
        }
        let color = |n: &ShaderNetwork| n.input_hash(&Parameter::new(n.output().shader.clone(), "color"));
        color(&state.network) != color(network)
    }
}

impl ObjectInterface for LightHandle {
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
        let Some(b) = AttributesBundle::from_handle(attributes) else {
            return false;
        };
        let Some(network) = b.light_shader() else {
            return false;
        };

        let mut state = self.state.lock();
        if self.needs_rebuild(&state, network) {
            self.context.scope().messages().debug(
                CONTEXT,
                format!("\"{}\" : {} color input changed; rebuild required", self.name, state.shader.root_type()),
            );
            return false;
        }
        if let Some(mesh) = &self.mesh {
            let previous = AttributesBundle::from_handle(&state.attributes);
            if previous.is_some_and(|p| p.geometry_hash(mesh.shape()) != b.geometry_hash(mesh.shape())) {
                return false;
            }
        }
        if !self.context.shaders().update(&mut state.shader, network) {
            return false;
        }

        state.network = network.clone();
        state.attributes = attributes.clone();
        self.bind(&state);
        true
    }

    fn link(&self, role: &str, objects: Option<&ObjectSet>) {
        if role != "lightFilters" {
            self.context
                .scope()
                .messages()
                .warning(CONTEXT, format!("Unsupported link role \"{role}\""));
            return;
        }

        let roots = objects.map(|objects| {
            native_roots(objects, |any: &dyn Any| {
                any.downcast_ref::<LightFilterHandle>().map(LightFilterHandle::root)
            })
        });
        let mut state = self.state.lock();
        set_link(self.context.scope(), state.shader.root(), "filters", roots.clone());
        state.filters = roots;
    }

    fn assign_id(&self, id: u32) {
        let mut state = self.state.lock();
        state.id = Some(id);
        declare_and_set(self.context.scope(), state.shader.root(), "entity_id", ParamValue::UInt(id), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{ParamType, Universe};
    use crate::registry::Registry;
    use crate::scope::NodeScope;
    use crate::settings::NodeLifetime;
    use glam::Vec3;
    use prism_core::MessageHandler;
    use prism_scene::{Connection, Dictionary, MeshPrimitive, Shader};

    fn context() -> Arc<SceneContext> {
        SceneContext::new(NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            MessageHandler::new(),
            NodeLifetime::Arena,
        ))
    }

    fn textured(light_type: &str, file: &str) -> ShaderNetwork {
        let mut network = ShaderNetwork::single("light", Shader::new(light_type, "light"));
        network.add_shader("tex", Shader::new("image", "shader").with_parameter("filename", file));
        network.add_connection(Connection::new(Parameter::output("tex"), Parameter::new("light", "color")));
        network
    }

    fn light_of(object: &Arc<dyn ObjectInterface>) -> &LightHandle {
        let any: &dyn Any = &**object;
        any.downcast_ref::<LightHandle>().unwrap()
    }

    #[test]
    fn test_quad_light_color_change_is_refused() {
        let context = context();
        let attrs = context.attributes(&Dictionary::new().with("light", textured("quad_light", "a.tx")));
        let light = context.light("quad", None, &attrs).unwrap();

        let same = context.attributes(&Dictionary::new().with("light", textured("quad_light", "a.tx")));
        assert!(light.attributes(&same));
        let changed = context.attributes(&Dictionary::new().with("light", textured("quad_light", "b.tx")));
        assert!(!light.attributes(&changed));
    }

    #[test]
    fn test_point_light_color_change_is_applied() {
        let context = context();
        let attrs = context.attributes(&Dictionary::new().with("light", textured("point_light", "a.tx")));
        let light = context.light("point", None, &attrs).unwrap();
        let root = light_of(&light).root();

        let changed = context.attributes(&Dictionary::new().with("light", textured("point_light", "b.tx")));
        assert!(light.attributes(&changed));
        assert_eq!(light_of(&light).root(), root);

        let u = context.scope().universe();
        let (tex, _) = u.link_source(root, "color").unwrap();
        assert_eq!(u.param(tex, "filename"), Some(ParamValue::from("b.tx")));
    }

    #[test]
    fn test_light_type_change_is_refused() {
        let context = context();
        let point = ShaderNetwork::single("l", Shader::new("point_light", "light"));
        let spot = ShaderNetwork::single("l", Shader::new("spot_light", "light"));
        let light = context
            .light("l", None, &context.attributes(&Dictionary::new().with("light", point)))
            .unwrap();
        assert!(!light.attributes(&context.attributes(&Dictionary::new().with("light", spot))));
    }

    #[test]
    fn test_transform_survives_updates() {
        let context = context();
        let network = ShaderNetwork::single("l", Shader::new("point_light", "light").with_parameter("intensity", 2.0f32));
        let light = context
            .light("l", None, &context.attributes(&Dictionary::new().with("light", network)))
            .unwrap();
        let matrix = Mat4::from_translation(Vec3::Y);
        light.transform(matrix);

        let brighter = ShaderNetwork::single("l", Shader::new("point_light", "light").with_parameter("intensity", 4.0f32));
        assert!(light.attributes(&context.attributes(&Dictionary::new().with("light", brighter))));

        let u = context.scope().universe();
        let root = light_of(&light).root();
        assert_eq!(
            u.param(root, "matrix"),
            Some(ParamValue::array(ParamType::Matrix, vec![ParamValue::Matrix(matrix)]))
        );
        assert_eq!(u.param(root, "intensity"), Some(ParamValue::Float(4.0)));
    }

    #[test]
    fn test_assigned_id_survives_updates() {
        let context = context();
        let dim = ShaderNetwork::single("l", Shader::new("point_light", "light").with_parameter("intensity", 1.0f32));
        let light = context
            .light("l", None, &context.attributes(&Dictionary::new().with("light", dim)))
            .unwrap();
        light.assign_id(7);

        let bright = ShaderNetwork::single("l", Shader::new("point_light", "light").with_parameter("intensity", 3.0f32));
        assert!(light.attributes(&context.attributes(&Dictionary::new().with("light", bright))));

        let u = context.scope().universe();
        let root = light_of(&light).root();
        assert_eq!(u.param(root, "entity_id"), Some(ParamValue::UInt(7)));
        assert_eq!(u.param(root, "intensity"), Some(ParamValue::Float(3.0)));
    }

    #[test]
    fn test_mesh_light_binds_hidden_mesh() {
        let context = context();
        let network = ShaderNetwork::single("l", Shader::new("mesh_light", "light"));
        let attrs = context.attributes(&Dictionary::new().with("light", network));
        let light = context
            .light("panel", Some(&MeshPrimitive::plane().into()), &attrs)
            .unwrap();
        let handle = light_of(&light);
        let mesh = handle.mesh().unwrap().master();

        let u = context.scope().universe();
        assert_eq!(u.param(handle.root(), "mesh"), Some(ParamValue::Node(Some(mesh))));
        assert_eq!(u.param(mesh, "visibility"), Some(ParamValue::Byte(0)));
        assert!(context.instances().is_empty());
    }

    #[test]
    fn test_light_without_shader_is_an_error() {
        let context = context();
        let attrs = context.attributes(&Dictionary::new());
        assert!(matches!(
            context.light("l", None, &attrs),
            Err(PrismError::MissingData { .. })
        ));
    }
}
