//! Procedural Expansion
//!
//! Materializes a [`Procedural`]'s nested scene description under a single
//! native `procedural` node.
//!
//! # Overview
//!
//! - Expansion runs the whole translation pipeline again inside a private
//!   [`SceneContext`] whose scope is parented to the procedural node. Child
//!   nodes are namespaced under it, destroyed with it, and never enter the
//!   caches of the enclosing context.
//! - Native procedurals apply strict override semantics to attributes, so
//!   inheritance is emulated by [`merge_attributes`] before each nested
//!   attribute bundle is built. Custom attributes are left out of the merge
//!   because user parameters already inherit natively: they are declared on
//!   the procedural node itself, including a shared master.
//! - Every node created during expansion is registered on the procedural
//!   node, in creation order, through [`ProceduralNodes`].
//!
//! Expansion runs on the calling thread, which usually holds the instance
//! cache slot lock of the procedural's master. Nested content that spawns
//! its own threads only ever touches the private context, so it cannot
//! contend with the lock held above it.

use std::sync::Arc;

use parking_lot::Mutex;
use prism_core::{CompoundData, Data, PrismError, Result};
use prism_scene::{
    AttributesHandle, CameraData, Dictionary, Object, ObjectInterfacePtr, Output, Procedural, SceneRenderer,
    Value,
};

use crate::context::SceneContext;
use crate::native::{NodeKey, ProceduralNodes};
use crate::scope::NodeScope;

const CONTEXT: &str = "prism::ProceduralRenderer";

/// `true` for `user:` and `render:` attributes.
#[inline]
#[must_use]
pub fn is_custom_attribute(name: &str) -> bool {
    name.starts_with("user:") || name.starts_with("render:")
}

/// The attributes a nested entity sees: everything in `local`, plus every
/// non-custom attribute of `inherited` that `local` does not override.
#[must_use]
pub fn merge_attributes(inherited: &Dictionary, local: &Dictionary) -> Dictionary {
    let mut merged = local.clone();
    for (name, value) in inherited {
        if !is_custom_attribute(name) && !merged.contains_key(name) {
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}

/// The ordered node list registered on a procedural node.
#[derive(Debug, Clone, Default)]
pub struct NodeList(Vec<NodeKey>);

impl ProceduralNodes for NodeList {
    fn node_count(&self) -> usize {
        self.0.len()
    }

    fn node_at(&self, index: usize) -> Option<NodeKey> {
        self.0.get(index).copied()
    }
}

/// The expanded contents of one procedural. Dropping it releases every
/// entity created during expansion.
pub(crate) struct Expansion {
    _renderer: ProceduralRenderer,
}

/// Expands `procedural` into the scope of `node`.
pub(crate) fn expand(
    scope: &NodeScope,
    node: NodeKey,
    procedural: &dyn Procedural,
    inherited: &Dictionary,
) -> Result<Expansion> {
    let child = scope.child(node);
    let renderer = ProceduralRenderer {
        context: SceneContext::new(child.clone()),
        inherited: inherited
            .iter()
            .filter(|(name, _)| !is_custom_attribute(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        entities: Mutex::new(Vec::new()),
    };

    procedural.render(&renderer)?;

    let nodes = child.recorded();
    log::debug!(
        "Expanded procedural \"{}\" into {} node(s)",
        scope.universe().name(node).unwrap_or_default(),
        nodes.len()
    );
    scope.universe().set_procedural_nodes(node, Box::new(NodeList(nodes)));
    Ok(Expansion { _renderer: renderer })
}

/// The [`SceneRenderer`] a procedural describes its contents into.
///
/// Only entity creation is meaningful inside a procedural; options, outputs
/// and render control belong to the top-level renderer and are ignored with
/// a warning.
pub struct ProceduralRenderer {
    context: Arc<SceneContext>,
    inherited: Dictionary,
    entities: Mutex<Vec<ObjectInterfacePtr>>,
}

impl ProceduralRenderer {
    fn keep(&self, entity: Result<ObjectInterfacePtr>) -> Result<ObjectInterfacePtr> {
        let entity = entity?;
        self.entities.lock().push(entity.clone());
        Ok(entity)
    }

    fn ignored(&self, call: &str) {
        self.context
            .scope()
            .messages()
            .warning(CONTEXT, format!("{call} is not supported inside a procedural"));
    }
}

impl SceneRenderer for ProceduralRenderer {
    fn name(&self) -> &str {
        "prism"
    }

    fn option(&self, name: &str, _value: Option<&Value>) {
        self.ignored(&format!("option(\"{name}\")"));
    }

    fn output(&self, name: &str, _output: Option<&Output>) -> Result<()> {
        self.ignored(&format!("output(\"{name}\")"));
        Ok(())
    }

    fn attributes(&self, attributes: &Dictionary) -> AttributesHandle {
        self.context.attributes(&merge_attributes(&self.inherited, attributes))
    }

    fn camera(&self, name: &str, _camera: &CameraData, _attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        Err(PrismError::UnsupportedObject(format!(
            "camera \"{name}\" : cameras cannot be created inside a procedural"
        )))
    }

    fn light(&self, name: &str, object: Option<&Object>, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        self.keep(self.context.light(name, object, attributes))
    }

    fn light_filter(&self, name: &str, object: Option<&Object>, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        self.keep(self.context.light_filter(name, object, attributes))
    }

    fn object(&self, name: &str, object: &Object, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        self.keep(self.context.object(name, object, attributes))
    }

    fn object_samples(
        &self,
        name: &str,
        samples: &[Object],
        times: &[f32],
        attributes: &AttributesHandle,
    ) -> Result<ObjectInterfacePtr> {
        self.keep(self.context.object_samples(name, samples, times, attributes))
    }

    fn render(&self) -> Result<()> {
        self.ignored("render()");
        Ok(())
    }

    fn pause(&self) {
        self.ignored("pause()");
    }

    fn command(&self, name: &str, _parameters: &CompoundData) -> Option<Data> {
        self.ignored(&format!("command(\"{name}\")"));
        None
    }
}
