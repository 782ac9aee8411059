//! Translation Scope
//!
//! A [`NodeScope`] is the context every native node is created in: the
//! universe, the registry, the message channel, the parent procedural (if
//! any) and the ownership policy. Nodes are handed out as [`OwnedNode`]s
//! whose drop behaviour follows that policy.

use std::sync::Arc;

use parking_lot::Mutex;
use prism_core::{MessageHandler, PrismError, Result};

use crate::native::{NodeEntry, NodeKey, ParamValue, Universe};
use crate::registry::Registry;
use crate::settings::NodeLifetime;

#[derive(Clone)]
pub struct NodeScope {
    universe: Arc<Universe>,
    registry: Arc<Registry>,
    messages: MessageHandler,
    parent: Option<NodeKey>,
    lifetime: NodeLifetime,
    /// Collects every node created in this scope (procedural expansion).
    recorder: Option<Arc<Mutex<Vec<NodeKey>>>>,
}

impl std::fmt::Debug for NodeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeScope")
            .field("parent", &self.parent)
            .field("lifetime", &self.lifetime)
            .field("recording", &self.recorder.is_some())
            .finish_non_exhaustive()
    }
}

impl NodeScope {
    /// The top-level scope.
    #[must_use]
    pub fn new(universe: Arc<Universe>, registry: Arc<Registry>, messages: MessageHandler, lifetime: NodeLifetime) -> Self {
        Self {
            universe,
            registry,
            messages,
            parent: None,
            lifetime,
            recorder: None,
        }
    }

    /// A scope for the contents of the procedural `parent`. Nodes created in
    /// it are owned by that procedural node and destroyed with it, so the
    /// child scope always uses [`NodeLifetime::Arena`], and records every
    /// node it creates.
    #[must_use]
    pub fn child(&self, parent: NodeKey) -> Self {
        Self {
            universe: self.universe.clone(),
            registry: self.registry.clone(),
            messages: self.messages.clone(),
            parent: Some(parent),
            lifetime: NodeLifetime::Arena,
            recorder: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    #[inline]
    #[must_use]
    pub fn universe(&self) -> &Arc<Universe> {
        &self.universe
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn messages(&self) -> &MessageHandler {
        &self.messages
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> NodeLifetime {
        self.lifetime
    }

    /// Nodes created so far, in creation order. Empty unless recording.
    #[must_use]
    pub fn recorded(&self) -> Vec<NodeKey> {
        self.recorder
            .as_ref()
            .map(|r| r.lock().clone())
            .unwrap_or_default()
    }

    pub fn entry(&self, entry: &str) -> Result<Arc<NodeEntry>> {
        self.registry
            .entry(entry)
            .cloned()
            .ok_or_else(|| PrismError::UnknownNodeType(entry.to_string()))
    }

    /// Creates a node of type `entry` named `name` in this scope.
    pub fn create(&self, entry: &str, name: &str) -> Result<OwnedNode> {
        let entry = self.entry(entry)?;
        let key = self.universe.create_node(entry, name, self.parent);
        if let Some(recorder) = &self.recorder {
            recorder.lock().push(key);
        }
        Ok(OwnedNode {
            key,
            universe: self.universe.clone(),
            lifetime: self.lifetime,
        })
    }

    /// Sets a parameter, reporting failures as warnings. Returns `true` on
    /// success.
    pub fn set(&self, node: NodeKey, param: &str, value: impl Into<ParamValue>) -> bool {
        match self.universe.set_param(node, param, value) {
            Ok(()) => true,
            Err(e) => {
                let node = self.universe.name(node).unwrap_or_default();
                self.messages
                    .warning("prism::NodeScope", format!("Unable to set \"{node}.{param}\" : {e}"));
                false
            }
        }
    }
}

/// A native node owned by the translation layer.
///
/// Under [`NodeLifetime::Eager`] dropping it destroys the node; under
/// [`NodeLifetime::Arena`] the node lives until the universe is cleared.
pub struct OwnedNode {
    key: NodeKey,
    universe: Arc<Universe>,
    lifetime: NodeLifetime,
}

impl std::fmt::Debug for OwnedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedNode")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl OwnedNode {
    #[inline]
    #[must_use]
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Destroys the node now, regardless of the ownership policy.
    pub fn destroy(mut self) {
        self.universe.destroy_node(self.key);
        self.lifetime = NodeLifetime::Arena;
    }
}

impl Drop for OwnedNode {
    fn drop(&mut self) {
        if self.lifetime == NodeLifetime::Eager {
            self.universe.destroy_node(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(lifetime: NodeLifetime) -> NodeScope {
        NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            MessageHandler::new(),
            lifetime,
        )
    }

    #[test]
    fn test_eager_nodes_are_destroyed_on_drop() {
        let scope = scope(NodeLifetime::Eager);
        let node = scope.create("polymesh", "a").unwrap();
        let key = node.key();
        drop(node);
        assert!(!scope.universe().contains(key));
    }

    #[test]
    fn test_arena_nodes_outlive_their_owner() {
        let scope = scope(NodeLifetime::Arena);
        let node = scope.create("polymesh", "a").unwrap();
        let key = node.key();
        drop(node);
        assert!(scope.universe().contains(key));
    }

    #[test]
    fn test_child_scope_records_and_parents() {
        let scope = scope(NodeLifetime::Eager);
        let parent = scope.create("procedural", "p").unwrap();
        let child = scope.child(parent.key());
        let a = child.create("polymesh", "a").unwrap();

        assert_eq!(child.lifetime(), NodeLifetime::Arena);
        assert_eq!(child.recorded(), vec![a.key()]);
        assert_eq!(scope.universe().parent(a.key()), Some(parent.key()));
        assert!(scope.recorded().is_empty());
    }

    #[test]
    fn test_unknown_entry() {
        let scope = scope(NodeLifetime::Arena);
        assert!(matches!(
            scope.create("teapot", "t"),
            Err(PrismError::UnknownNodeType(_))
        ));
    }
}
