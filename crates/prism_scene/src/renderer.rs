//! Renderer Interface
//!
//! The method surface a renderer backend exposes to the scene description.
//!
//! # Overview
//!
//! - [`SceneRenderer`]: options, outputs, entity creation and render control
//! - [`AttributesInterface`]: an opaque, immutable, renderer-specific bundle
//!   built from an attribute [`Dictionary`]
//! - [`ObjectInterface`]: a handle to one live scene entity; dropping the
//!   last handle removes the entity
//! - [`Procedural`]: nested scene content that describes itself into any
//!   [`SceneRenderer`]
//!
//! All methods take `&self`. Entity creation may be called from many threads
//! at once; edits to a *single* handle must be externally ordered.

use std::any::Any;
use std::sync::Arc;

use glam::Mat4;
use prism_core::{CompoundData, ContentHash, Data, Result};

use crate::camera::CameraData;
use crate::object::Object;
use crate::output::Output;
use crate::value::{Dictionary, Value};

/// Renderer-specific processed attributes.
pub trait AttributesInterface: Any + Send + Sync {}

pub type AttributesHandle = Arc<dyn AttributesInterface>;

/// A live scene entity.
pub trait ObjectInterface: Any + Send + Sync {
    fn transform(&self, matrix: Mat4);

    /// Time-sampled transform. `times` must be uniformly spaced.
    fn transform_samples(&self, samples: &[Mat4], times: &[f32]) -> Result<()>;

    /// Applies new attributes in place. Returns `false` if the edit cannot
    /// be applied without rebuilding the entity; prior state is then kept.
    fn attributes(&self, attributes: &AttributesHandle) -> bool;

    /// Resolves the relationship `role` against `objects`. `None` clears it.
    fn link(&self, role: &str, objects: Option<&ObjectSet>);

    /// Tags the entity with an opaque numeric id (e.g. for picking).
    fn assign_id(&self, id: u32);
}

pub type ObjectInterfacePtr = Arc<dyn ObjectInterface>;
pub type ObjectSet = Vec<ObjectInterfacePtr>;

/// Nested scene content expanded by the renderer.
pub trait Procedural: ContentHash + Send + Sync {
    /// Describes the procedural's children into `renderer`.
    fn render(&self, renderer: &dyn SceneRenderer) -> Result<()>;
}

/// The renderer backend surface.
pub trait SceneRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// Sets a global option. `None` restores its default. Unknown options
    /// are reported as warnings and ignored.
    fn option(&self, name: &str, value: Option<&Value>);

    /// Creates, replaces (`Some`) or removes (`None`) a named output.
    fn output(&self, name: &str, output: Option<&Output>) -> Result<()>;

    fn attributes(&self, attributes: &Dictionary) -> AttributesHandle;

    fn camera(&self, name: &str, camera: &CameraData, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr>;

    /// `object` is `None` for lights without geometry, or a mesh for mesh
    /// lights.
    fn light(&self, name: &str, object: Option<&Object>, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr>;

    fn light_filter(&self, name: &str, object: Option<&Object>, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr>;

    fn object(&self, name: &str, object: &Object, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr>;

    /// Time-sampled geometry. `samples` and `times` must have equal length
    /// and `times` must be uniformly spaced.
    fn object_samples(
        &self,
        name: &str,
        samples: &[Object],
        times: &[f32],
        attributes: &AttributesHandle,
    ) -> Result<ObjectInterfacePtr>;

    fn render(&self) -> Result<()>;

    /// Blocking interrupt of any in-flight render.
    fn pause(&self);

    /// Renderer-specific escape hatch. Unknown commands warn and return
    /// `None`.
    fn command(&self, name: &str, parameters: &CompoundData) -> Option<Data>;
}
