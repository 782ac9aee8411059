//! Scene Entities
//!
//! The [`ObjectInterface`](prism_scene::ObjectInterface) family: one handle
//! per live entity, each owning its native node(s) and the attributes it was
//! last successfully edited with.
//!
//! | Handle | Native node | Links |
//! |---|---|---|
//! | [`ObjectHandle`] | `ginstance` or unique shape | `lights`, `shadowedLights` |
//! | [`LightHandle`] | light shader graph (+ hidden mesh) | `lightFilters` |
//! | [`LightFilterHandle`] | light filter shader graph | none |
//! | [`CameraHandle`] | `persp_camera` / `ortho_camera` | none |
//!
//! Edits to one handle are serialised by an internal mutex. A refused edit
//! (`attributes()` returning `false`) leaves the handle exactly as it was.

mod camera;
mod light;
mod light_filter;
mod object;

pub use camera::CameraHandle;
pub use light::LightHandle;
pub use light_filter::LightFilterHandle;
pub use object::ObjectHandle;

use std::any::Any;

use glam::Mat4;
use prism_scene::{ObjectInterfacePtr, ObjectSet, SampleTimes};
use smallvec::SmallVec;

use crate::native::{NodeKey, ParamType, ParamValue};
use crate::scope::NodeScope;

/// Stored transform samples.
#[derive(Debug, Clone)]
pub(crate) struct Transform {
    samples: SmallVec<[Mat4; 4]>,
    times: SampleTimes,
}

impl Default for Transform {
    fn default() -> Self {
        Self::fixed(Mat4::IDENTITY)
    }
}

impl Transform {
    pub fn fixed(matrix: Mat4) -> Self {
        Self {
            samples: SmallVec::from_slice(&[matrix]),
            times: SampleTimes::new(),
        }
    }

    pub fn sampled(samples: &[Mat4], times: &[f32]) -> Self {
        Self {
            samples: SmallVec::from_slice(samples),
            times: SampleTimes::from_slice(times),
        }
    }

    #[must_use]
    pub fn first(&self) -> Mat4 {
        self.samples.first().copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Writes the transform to `node`'s `matrix`, collapsing to the first
    /// sample when the parameter takes no motion keys.
    pub fn apply(&self, scope: &NodeScope, node: NodeKey) {
        let Some(&first) = self.samples.first() else {
            return;
        };
        if self.samples.len() == 1 {
            scope.set(node, "matrix", first);
            return;
        }

        let motion = scope
            .universe()
            .entry(node)
            .and_then(|e| e.param("matrix").map(|p| p.motion))
            .unwrap_or(false);
        if !motion {
            let name = scope.universe().name(node).unwrap_or_default();
            scope.messages().warning(
                "prism::Transform",
                format!("\"{name}\" does not support transform motion; using the first sample"),
            );
            scope.set(node, "matrix", first);
            return;
        }

        let keys = self.samples.iter().map(|m| ParamValue::Matrix(*m)).collect();
        scope.set(
            node,
            "matrix",
            ParamValue::motion_array(ParamType::Matrix, self.samples.len() as u32, keys),
        );
        if let (Some(&start), Some(&end)) = (self.times.first(), self.times.last()) {
            scope.set(node, "motion_start", start);
            scope.set(node, "motion_end", end);
        }
    }
}

/// Native root nodes of the handles in `objects` that `root` recognises.
/// Foreign handles are skipped.
pub(crate) fn native_roots(objects: &ObjectSet, root: impl Fn(&dyn Any) -> Option<NodeKey>) -> Vec<NodeKey> {
    objects
        .iter()
        .filter_map(|object: &ObjectInterfacePtr| {
            let any: &dyn Any = &**object;
            root(any)
        })
        .collect()
}

/// Sets a node-array parameter from a link, or clears it.
pub(crate) fn set_link(scope: &NodeScope, node: NodeKey, param: &str, roots: Option<Vec<NodeKey>>) {
    match roots {
        Some(roots) => {
            scope.set(node, param, ParamValue::nodes(roots));
        }
        None => scope.universe().reset_param(node, param),
    }
}
