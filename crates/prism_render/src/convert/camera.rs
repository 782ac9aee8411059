use prism_core::Result;
use prism_scene::{CameraData, Object, Projection};

use super::{ObjectConverter, pass_through, unexpected};
use crate::native::NodeKey;
use crate::scope::{NodeScope, OwnedNode};

/// [`CameraData`] → `persp_camera` / `ortho_camera`.
///
/// Resolution, pixel aspect and crop window are render-global natively and
/// are applied by the globals, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraConverter;

impl ObjectConverter for CameraConverter {
    fn convert(&self, object: &Object, scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        let camera = object.as_camera().ok_or_else(|| unexpected("CameraData", object))?;
        let entry = match camera.projection {
            Projection::Perspective => "persp_camera",
            Projection::Orthographic => "ortho_camera",
        };
        let node = scope.create(entry, name)?;
        apply_camera(scope, node.key(), camera);
        Ok(node)
    }
}

fn apply_camera(scope: &NodeScope, node: NodeKey, camera: &CameraData) {
    let (window_min, window_max) = camera.screen_window();
    scope.set(node, "screen_window_min", window_min);
    scope.set(node, "screen_window_max", window_max);
    scope.set(node, "near_clip", camera.clipping_planes.x);
    scope.set(node, "far_clip", camera.clipping_planes.y);
    scope.set(node, "shutter_start", camera.shutter.x);
    scope.set(node, "shutter_end", camera.shutter.y);

    if camera.projection == Projection::Perspective {
        scope.set(node, "fov", camera.field_of_view);
        scope.set(node, "focus_distance", camera.focus_distance);
        if camera.f_stop > 0.0 {
            scope.set(node, "aperture_size", camera.focal_length / (2.0 * camera.f_stop));
        }
    }

    pass_through(scope, node, &camera.parameters);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{ParamValue, Universe};
    use crate::registry::Registry;
    use crate::settings::NodeLifetime;
    use glam::Vec2;
    use prism_core::MessageHandler;
    use std::sync::Arc;

    fn scope() -> NodeScope {
        NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            MessageHandler::new(),
            NodeLifetime::Arena,
        )
    }

    #[test]
    fn test_perspective_camera() {
        let scope = scope();
        let camera = CameraData {
            f_stop: 2.0,
            focal_length: 0.05,
            ..CameraData::default().with_resolution(200, 100).with_shutter(-0.25, 0.25)
        };
        let node = CameraConverter.convert(&camera.into(), &scope, "cam").unwrap();
        let u = scope.universe();

        assert_eq!(u.entry(node.key()).unwrap().name(), "persp_camera");
        assert_eq!(u.param(node.key(), "screen_window_min"), Some(ParamValue::Vec2(Vec2::new(-1.0, -0.5))));
        assert_eq!(u.param(node.key(), "shutter_start"), Some(ParamValue::Float(-0.25)));
        assert_eq!(u.param(node.key(), "aperture_size"), Some(ParamValue::Float(0.0125)));
    }

    #[test]
    fn test_orthographic_camera_has_no_fov() {
        let scope = scope();
        let camera = CameraData {
            projection: Projection::Orthographic,
            ..Default::default()
        };
        let node = CameraConverter.convert(&camera.into(), &scope, "ortho").unwrap();
        assert_eq!(scope.universe().entry(node.key()).unwrap().name(), "ortho_camera");
        assert!(scope.universe().param(node.key(), "fov").is_none());
    }
}
