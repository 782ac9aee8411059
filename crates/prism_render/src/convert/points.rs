use prism_core::Result;
use prism_scene::{Object, PrimitiveVariables};

use super::curves::radius;
use super::{
    ObjectConverter, export_primitive_variables, required_positions, set_motion_range, typed_samples,
};
use crate::scope::{NodeScope, OwnedNode};

/// [`PointsPrimitive`](prism_scene::PointsPrimitive) → `points`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointsConverter;

impl ObjectConverter for PointsConverter {
    fn convert(&self, object: &Object, scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        self.convert_samples(std::slice::from_ref(object), &[], scope, name)
    }

    fn convert_samples(&self, samples: &[Object], times: &[f32], scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        let points = typed_samples(samples, "PointsPrimitive", |o| match o {
            Object::Points(p) => Some(p),
            _ => None,
        })?;
        let variables: Vec<&PrimitiveVariables> = points.iter().map(|p| &p.variables).collect();
        let positions = required_positions(&variables, name)?;

        let node = scope.create("points", name)?;
        let key = node.key();
        scope.set(key, "points", positions);
        if let Some(radius) = radius(&variables, name)? {
            scope.set(key, "radius", radius);
        }
        if let Some(mode) = points[0].variables.get("type").and_then(|v| v.data.as_str()) {
            scope.set(key, "mode", mode);
        }

        export_primitive_variables(scope, key, &points[0].variables, &["P", "width", "type"]);
        set_motion_range(scope, key, times);
        Ok(node)
    }
}
