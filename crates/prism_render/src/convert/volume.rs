use prism_core::Result;
use prism_scene::Object;

use super::{ObjectConverter, pass_through, unexpected};
use crate::native::{ParamType, ParamValue};
use crate::scope::{NodeScope, OwnedNode};

/// [`VolumeObject`](prism_scene::VolumeObject) → `volume`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeConverter;

impl ObjectConverter for VolumeConverter {
    fn convert(&self, object: &Object, scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        let Object::Volume(volume) = object else {
            return Err(unexpected("VolumeObject", object));
        };

        let node = scope.create("volume", name)?;
        let key = node.key();
        scope.set(key, "filename", volume.file_name.as_str());
        scope.set(
            key,
            "grids",
            ParamValue::array(
                ParamType::String,
                volume.grids.iter().cloned().map(ParamValue::String).collect(),
            ),
        );
        pass_through(scope, key, &volume.parameters);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Universe;
    use crate::registry::Registry;
    use crate::settings::NodeLifetime;
    use prism_core::MessageHandler;
    use prism_scene::VolumeObject;
    use std::sync::Arc;

    #[test]
    fn test_volume_parameters() {
        let scope = NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            MessageHandler::new(),
            NodeLifetime::Arena,
        );
        let mut volume = VolumeObject::new("smoke.vdb", vec!["density".into()]);
        volume.parameters.insert("step_scale", 0.5f32);
        volume.parameters.insert("velocity_scale", 2.0f32);

        let node = VolumeConverter.convert(&volume.into(), &scope, "smoke").unwrap();
        let u = scope.universe();
        assert_eq!(u.param(node.key(), "filename"), Some(ParamValue::from("smoke.vdb")));
        assert_eq!(u.param(node.key(), "step_scale"), Some(ParamValue::Float(0.5)));
        assert_eq!(u.user_params(node.key()), vec!["velocity_scale".to_string()]);
    }
}
