use prism_core::{Data, PrismError, Result};
use prism_scene::{Interpolation, MeshInterpolation, MeshPrimitive, Object, PrimitiveVariables};

use super::{
    ObjectConverter, export_primitive_variables, motion_param, required_positions, set_motion_range,
    typed_samples, uint_array,
};
use crate::native::{ParamType, ParamValue};
use crate::scope::{NodeScope, OwnedNode};

/// [`MeshPrimitive`] → `polymesh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshConverter;

impl ObjectConverter for MeshConverter {
    fn convert(&self, object: &Object, scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        self.convert_samples(std::slice::from_ref(object), &[], scope, name)
    }

    fn convert_samples(&self, samples: &[Object], times: &[f32], scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        let meshes = typed_samples(samples, "MeshPrimitive", Object::as_mesh)?;
        let first = meshes[0];
        if meshes
            .iter()
            .any(|m| m.vertex_ids != first.vertex_ids || m.vertices_per_face != first.vertices_per_face)
        {
            return Err(PrismError::SampleMismatch(format!(
                "\"{name}\" : mesh topology differs between samples"
            )));
        }

        let variables: Vec<&PrimitiveVariables> = meshes.iter().map(|m| &m.variables).collect();
        let vlist = required_positions(&variables, name)?;

        let node = scope.create("polymesh", name)?;
        let key = node.key();

        scope.set(key, "nsides", uint_array(&first.vertices_per_face));
        scope.set(key, "vidxs", uint_array(&first.vertex_ids));
        scope.set(key, "vlist", vlist);

        let subdivided = first.interpolation == MeshInterpolation::CatmullClark;
        scope.set(key, "subdiv_type", if subdivided { "catclark" } else { "none" });

        if let Some(normals) = motion_param(&variables, "N", name)? {
            let indices = face_varying_indices(first, "N");
            scope.set(key, "nlist", normals);
            scope.set(key, "nidxs", indices);
            scope.set(key, "smoothing", true);
        } else if subdivided {
            scope.set(key, "smoothing", true);
        }

        if let Some(uv) = first.variables.get("uv") {
            match &uv.data {
                Data::V2fVector(values) => {
                    scope.set(
                        key,
                        "uvlist",
                        ParamValue::array(ParamType::Vec2, values.iter().copied().map(ParamValue::Vec2).collect()),
                    );
                    scope.set(key, "uvidxs", face_varying_indices(first, "uv"));
                }
                other => scope.messages().warning(
                    "prism::MeshConverter",
                    format!("\"{name}\" : ignoring \"uv\" of type {}", other.type_name()),
                ),
            }
        }

        export_primitive_variables(scope, key, &first.variables, &["P", "N", "uv"]);
        set_motion_range(scope, key, times);
        Ok(node)
    }
}

/// Per face-vertex indices for a variable: its own index buffer, the
/// vertex ids for vertex-interpolated data, or a running index for plain
/// face-varying data.
fn face_varying_indices(mesh: &MeshPrimitive, name: &str) -> ParamValue {
    let Some(var) = mesh.variables.get(name) else {
        return ParamValue::empty_array(ParamType::UInt);
    };
    if let Some(indices) = &var.indices {
        return uint_array(indices);
    }
    match var.interpolation {
        Interpolation::Vertex | Interpolation::Varying => uint_array(&mesh.vertex_ids),
        _ => {
            let count = i32::try_from(mesh.vertex_ids.len()).unwrap_or(i32::MAX);
            uint_array(&(0..count).collect::<Vec<_>>())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::settings::NodeLifetime;
    use crate::native::Universe;
    use glam::{Vec2, Vec3};
    use prism_core::MessageHandler;
    use prism_scene::PrimitiveVariable;
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
    fn test_plane_conversion() {
        let scope = scope();
        let mut plane = MeshPrimitive::plane();
        plane.variables.insert(
            "uv".into(),
            PrimitiveVariable::new(Interpolation::FaceVarying, vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y]),
        );
        let node = MeshConverter.convert(&Object::Mesh(plane), &scope, "plane").unwrap();
        let u = scope.universe();

        assert_eq!(u.param(node.key(), "nsides").unwrap().elements(), &[ParamValue::UInt(4)]);
        assert_eq!(u.param(node.key(), "vlist").unwrap().elements().len(), 4);
        assert_eq!(u.param(node.key(), "uvidxs").unwrap().elements().len(), 4);
        assert_eq!(u.param(node.key(), "subdiv_type"), Some(ParamValue::from("none")));
    }

    #[test]
    fn test_motion_samples() {
        let scope = scope();
        let a = MeshPrimitive::plane();
        let mut b = MeshPrimitive::plane();
        b.variables.insert(
            "P".into(),
            PrimitiveVariable::new(Interpolation::Vertex, vec![Vec3::ONE; 4]),
        );
        let node = MeshConverter
            .convert_samples(&[Object::Mesh(a), Object::Mesh(b)], &[0.0, 1.0], &scope, "moving")
            .unwrap();
        let vlist = scope.universe().param(node.key(), "vlist").unwrap();
        assert_eq!(vlist.keys(), 2);
        assert_eq!(vlist.elements().len(), 8);
    }

    #[test]
    fn test_topology_mismatch() {
        let scope = scope();
        let a = MeshPrimitive::plane();
        let b = MeshPrimitive::new(vec![3], vec![0, 1, 2], vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let result = MeshConverter.convert_samples(&[Object::Mesh(a), Object::Mesh(b)], &[0.0, 1.0], &scope, "bad");
        assert!(matches!(result, Err(PrismError::SampleMismatch(_))));
    }

    #[test]
    fn test_missing_positions() {
        let scope = scope();
        let mesh = MeshPrimitive {
            vertices_per_face: vec![3],
            vertex_ids: vec![0, 1, 2],
            ..Default::default()
        };
        let result = MeshConverter.convert(&Object::Mesh(mesh), &scope, "empty");
        assert!(matches!(result, Err(PrismError::MissingData { .. })));
    }
}
