use prism_core::Result;
use prism_scene::{Object, PrimitiveVariables};

use super::{
    ObjectConverter, export_primitive_variables, motion_param, required_positions, set_motion_range,
    typed_samples, uint_array,
};
use crate::native::{ParamType, ParamValue};
use crate::scope::{NodeScope, OwnedNode};

/// [`CurvesPrimitive`](prism_scene::CurvesPrimitive) → `curves`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurvesConverter;

impl ObjectConverter for CurvesConverter {
    fn convert(&self, object: &Object, scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        self.convert_samples(std::slice::from_ref(object), &[], scope, name)
    }

    fn convert_samples(&self, samples: &[Object], times: &[f32], scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        let curves = typed_samples(samples, "CurvesPrimitive", |o| match o {
            Object::Curves(c) => Some(c),
            _ => None,
        })?;
        let first = curves[0];
        let variables: Vec<&PrimitiveVariables> = curves.iter().map(|c| &c.variables).collect();
        let points = required_positions(&variables, name)?;

        let node = scope.create("curves", name)?;
        let key = node.key();

        scope.set(key, "num_points", uint_array(&first.vertices_per_curve));
        scope.set(key, "points", points);
        scope.set(key, "basis", first.basis.as_str());

        if let Some(radius) = radius(&variables, name)? {
            scope.set(key, "radius", radius);
        }
        if let Some(orientations) = motion_param(&variables, "N", name)? {
            scope.set(key, "orientations", orientations);
            scope.set(key, "mode", "oriented");
        }
        if first.periodic {
            scope.messages().warning(
                "prism::CurvesConverter",
                format!("\"{name}\" : periodic curves are not supported and will render open"),
            );
        }

        export_primitive_variables(scope, key, &first.variables, &["P", "N", "width"]);
        set_motion_range(scope, key, times);
        Ok(node)
    }
}

/// Half of the `width` variable, per motion sample. A constant width is
/// expanded to a single radius per sample.
pub(super) fn radius(samples: &[&PrimitiveVariables], context: &str) -> Result<Option<ParamValue>> {
    let Some(widths) = motion_param(samples, "width", context)? else {
        return Ok(None);
    };
    let keys = widths.keys();
    let values = widths
        .elements()
        .iter()
        .filter_map(ParamValue::as_float)
        .map(|w| ParamValue::Float(w * 0.5))
        .collect();
    Ok(Some(ParamValue::motion_array(ParamType::Float, keys, values)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Universe;
    use prism_scene::{CurvesBasis, CurvesPrimitive};
    use crate::registry::Registry;
    use crate::settings::NodeLifetime;
    use glam::Vec3;
    use prism_core::MessageHandler;
    use prism_scene::{Interpolation, PrimitiveVariable};
    use std::sync::Arc;

    fn scope() -> NodeScope {
        NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            MessageHandler::new(),
            NodeLifetime::Arena,
        )
    }

    fn curve() -> CurvesPrimitive {
        let mut c = CurvesPrimitive::new(vec![4], CurvesBasis::CatmullRom, vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        c.variables.insert(
            "width".into(),
            PrimitiveVariable::new(Interpolation::Constant, 0.5f32),
        );
        c
    }

    #[test]
    fn test_curves_conversion() {
        let scope = scope();
        let node = CurvesConverter.convert(&Object::Curves(curve()), &scope, "hair").unwrap();
        let u = scope.universe();

        assert_eq!(u.param(node.key(), "basis"), Some(ParamValue::from("catmull-rom")));
        assert_eq!(u.param(node.key(), "num_points").unwrap().elements(), &[ParamValue::UInt(4)]);
        assert_eq!(u.param(node.key(), "radius").unwrap().elements(), &[ParamValue::Float(0.25)]);
        assert!(!u.is_set(node.key(), "orientations"));
    }

    #[test]
    fn test_curves_reject_other_objects() {
        let scope = scope();
        let result = CurvesConverter.convert(&Object::Mesh(prism_scene::MeshPrimitive::plane()), &scope, "x");
        assert!(matches!(result, Err(prism_core::PrismError::UnsupportedObject(_))));
    }
}
