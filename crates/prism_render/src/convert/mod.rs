//! Object Converters
//!
//! Conversion of individual [`Object`]s into native shape and camera nodes.
//! Converters are looked up in the [`Registry`](crate::registry::Registry)
//! by [`ObjectKind`](prism_scene::ObjectKind); the caches above them decide
//! *whether* to convert, converters only decide *how*.
//!
//! All converters raise data errors for missing positions and for motion
//! samples that disagree in type or topology.

mod camera;
mod curves;
mod mesh;
mod points;
mod procedural;
mod volume;

pub use camera::CameraConverter;
pub use curves::CurvesConverter;
pub use mesh::MeshConverter;
pub use points::PointsConverter;
pub use procedural::ExternalProceduralConverter;
pub use volume::VolumeConverter;

use prism_core::{CompoundData, PrismError, Result};
use prism_scene::{Interpolation, Object, PrimitiveVariables};

use crate::native::{NodeKey, ParamError, ParamValue};
use crate::scope::{NodeScope, OwnedNode};

/// Converts one kind of [`Object`] into a native node.
pub trait ObjectConverter: Send + Sync {
    fn convert(&self, object: &Object, scope: &NodeScope, name: &str) -> Result<OwnedNode>;

    /// Converts time samples into a single motion-blurred node. The default
    /// ignores all but the first sample.
    fn convert_samples(&self, samples: &[Object], times: &[f32], scope: &NodeScope, name: &str) -> Result<OwnedNode> {
        let first = samples.first().ok_or(PrismError::SampleCountMismatch {
            samples: 0,
            times: times.len(),
        })?;
        if samples.len() > 1 {
            scope.messages().debug(
                "prism::ObjectConverter",
                format!("\"{name}\" : {} does not support motion samples; using the first", first.kind()),
            );
        }
        self.convert(first, scope, name)
    }
}

fn unexpected(expected: &str, object: &Object) -> PrismError {
    PrismError::UnsupportedObject(format!("expected {expected}, got {}", object.kind()))
}

/// Casts every sample to the converter's primitive type.
fn typed_samples<'a, T>(
    samples: &'a [Object],
    expected: &str,
    cast: impl Fn(&'a Object) -> Option<&'a T>,
) -> Result<Vec<&'a T>> {
    if samples.is_empty() {
        return Err(PrismError::SampleCountMismatch { samples: 0, times: 0 });
    }
    samples
        .iter()
        .map(|o| cast(o).ok_or_else(|| unexpected(expected, o)))
        .collect()
}

/// Gathers primitive variable `name` from every sample into one
/// motion-keyed array. `None` if the first sample lacks the variable.
fn motion_param(samples: &[&PrimitiveVariables], name: &str, context: &str) -> Result<Option<ParamValue>> {
    let Some(first) = samples.first().and_then(|vars| vars.get(name)) else {
        return Ok(None);
    };

    let mut element = None;
    let mut values = Vec::new();
    for vars in samples {
        let var = vars.get(name).ok_or_else(|| {
            PrismError::SampleMismatch(format!("{context} : \"{name}\" is missing from some samples"))
        })?;
        if var.data.type_name() != first.data.type_name() {
            return Err(PrismError::SampleMismatch(format!(
                "{context} : \"{name}\" is {} in one sample and {} in another",
                first.data.type_name(),
                var.data.type_name()
            )));
        }
        if var.data.len() != first.data.len() {
            return Err(PrismError::SampleMismatch(format!(
                "{context} : \"{name}\" changes length between samples"
            )));
        }
        let value = ParamValue::from_data(&var.data).ok_or_else(|| {
            PrismError::SampleMismatch(format!("{context} : \"{name}\" has unsupported type {}", var.data.type_name()))
        })?;
        element = Some(value.ty());
        values.extend(value.elements().iter().cloned());
    }

    Ok(element.map(|element| ParamValue::motion_array(element, samples.len() as u32, values)))
}

fn required_positions(samples: &[&PrimitiveVariables], context: &str) -> Result<ParamValue> {
    motion_param(samples, "P", context)?.ok_or_else(|| PrismError::MissingData {
        context: context.to_string(),
        name: "P".into(),
    })
}

fn uint_array(values: &[i32]) -> ParamValue {
    ParamValue::array(
        crate::native::ParamType::UInt,
        values.iter().map(|&v| ParamValue::UInt(v.max(0) as u32)).collect(),
    )
}

/// Motion range of the node, from the first and last sample time.
fn set_motion_range(scope: &NodeScope, node: NodeKey, times: &[f32]) {
    if let (Some(&start), Some(&end)) = (times.first(), times.last()) {
        scope.set(node, "motion_start", start);
        scope.set(node, "motion_end", end);
    }
}

/// Exports the remaining primitive variables as user parameters.
fn export_primitive_variables(scope: &NodeScope, node: NodeKey, variables: &PrimitiveVariables, skip: &[&str]) {
    for (name, var) in variables {
        if skip.contains(&name.as_str()) {
            continue;
        }
        let Some(value) = ParamValue::from_data(&var.data) else {
            scope.messages().warning(
                "prism::ObjectConverter",
                format!("Primitive variable \"{name}\" has unsupported type {}", var.data.type_name()),
            );
            continue;
        };
        let array = value.is_array() || var.interpolation != Interpolation::Constant;
        declare_and_set(scope, node, name, value, array);
    }
}

pub(crate) fn declare_and_set(scope: &NodeScope, node: NodeKey, name: &str, value: ParamValue, array: bool) {
    match scope.universe().declare_user_param(node, name, value.ty(), array) {
        Ok(()) => {
            scope.set(node, name, value);
        }
        Err(ParamError::BuiltinClash(_)) => scope.messages().warning(
            "prism::ObjectConverter",
            format!("\"{name}\" clashes with a built-in parameter and will be ignored"),
        ),
        Err(e) => scope
            .messages()
            .warning("prism::ObjectConverter", format!("Unable to declare \"{name}\" : {e}")),
    }
}

/// Applies pass-through parameters: built-in ones are set directly, others
/// are declared as user parameters.
pub(crate) fn pass_through(scope: &NodeScope, node: NodeKey, parameters: &CompoundData) {
    let entry = scope.universe().entry(node);
    for (name, data) in parameters {
        let Some(value) = ParamValue::from_data(data) else {
            continue;
        };
        if entry.as_ref().is_some_and(|e| e.has_param(name)) {
            scope.set(node, name, value);
        } else {
            let array = value.is_array();
            declare_and_set(scope, node, name, value, array);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use prism_core::Data;
    use prism_scene::PrimitiveVariable;

    fn vars(points: Vec<Vec3>) -> PrimitiveVariables {
        let mut v = PrimitiveVariables::new();
        v.insert("P".into(), PrimitiveVariable::new(Interpolation::Vertex, points));
        v
    }

    #[test]
    fn test_motion_param_concatenates_keys() {
        let a = vars(vec![Vec3::ZERO, Vec3::X]);
        let b = vars(vec![Vec3::Y, Vec3::Z]);
        let p = required_positions(&[&a, &b], "test").unwrap();
        assert_eq!(p.keys(), 2);
        assert_eq!(p.elements().len(), 4);
    }

    #[test]
    fn test_motion_param_rejects_length_change() {
        let a = vars(vec![Vec3::ZERO, Vec3::X]);
        let b = vars(vec![Vec3::Y]);
        assert!(matches!(
            required_positions(&[&a, &b], "test"),
            Err(PrismError::SampleMismatch(_))
        ));
    }

    #[test]
    fn test_motion_param_rejects_type_change() {
        let a = vars(vec![Vec3::ZERO]);
        let mut b = PrimitiveVariables::new();
        b.insert(
            "P".into(),
            PrimitiveVariable::new(Interpolation::Vertex, Data::FloatVector(vec![0.0])),
        );
        assert!(matches!(
            required_positions(&[&a, &b], "test"),
            Err(PrismError::SampleMismatch(_))
        ));
    }

    #[test]
    fn test_missing_positions() {
        let empty = PrimitiveVariables::new();
        assert!(matches!(
            required_positions(&[&empty], "test"),
            Err(PrismError::MissingData { .. })
        ));
    }
}
