//! The native node arena.
//!
//! All nodes live in a single [`SlotMap`] behind a [`RwLock`]. Keys are
//! versioned, so a stale [`NodeKey`] (e.g. a node destroyed together with its
//! parent procedural) resolves to nothing instead of aliasing a new node.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;
use slotmap::SlotMap;

use super::NodeKey;
use super::entry::NodeEntry;
use super::value::{ParamError, ParamType, ParamValue};

/// Enumerates the nodes generated by a procedural.
///
/// Registered on the procedural's node so the renderer can discover its
/// children without reaching into the translation layer's caches.
pub trait ProceduralNodes: Send + Sync {
    fn node_count(&self) -> usize;
    fn node_at(&self, index: usize) -> Option<NodeKey>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UserParam {
    ty: ParamType,
    array: bool,
}

struct Node {
    entry: Arc<NodeEntry>,
    name: String,
    parent: Option<NodeKey>,
    params: FxHashMap<String, ParamValue>,
    user_params: FxHashMap<String, UserParam>,
    /// Input parameter -> (source node, source output).
    links: FxHashMap<String, (NodeKey, String)>,
}

#[derive(Default)]
struct UniverseInner {
    nodes: SlotMap<NodeKey, Node>,
    names: FxHashMap<(Option<NodeKey>, String), NodeKey>,
    procedural_nodes: FxHashMap<NodeKey, Box<dyn ProceduralNodes>>,
}

/// Thread-safe native scene graph.
#[derive(Default)]
pub struct Universe {
    inner: RwLock<UniverseInner>,
}

impl std::fmt::Debug for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Universe")
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Universe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Creates a node named `name` inside the scope of `parent` (`None` is
    /// the top level).
    pub fn create_node(&self, entry: Arc<NodeEntry>, name: &str, parent: Option<NodeKey>) -> NodeKey {
        let mut inner = self.inner.write();
        let key = inner.nodes.insert(Node {
            entry,
            name: name.to_string(),
            parent,
            params: FxHashMap::default(),
            user_params: FxHashMap::default(),
            links: FxHashMap::default(),
        });
        if let Some(previous) = inner.names.insert((parent, name.to_string()), key)
            && inner.nodes.contains_key(previous)
        {
            log::warn!("Node name \"{name}\" is already in use; the newer node shadows it");
        }
        key
    }

    /// Destroys `node` and, recursively, every node parented to it.
    /// Returns `false` if the node no longer exists.
    pub fn destroy_node(&self, node: NodeKey) -> bool {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(node) {
            return false;
        }

        let mut children: FxHashMap<NodeKey, Vec<NodeKey>> = FxHashMap::default();
        for (key, n) in &inner.nodes {
            if let Some(parent) = n.parent {
                children.entry(parent).or_default().push(key);
            }
        }

        let mut doomed = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(kids) = children.remove(&current) {
                stack.extend(kids);
            }
            doomed.push(current);
        }

        for key in doomed {
            if let Some(removed) = inner.nodes.remove(key) {
                let name_key = (removed.parent, removed.name);
                if inner.names.get(&name_key) == Some(&key) {
                    inner.names.remove(&name_key);
                }
            }
            inner.procedural_nodes.remove(&key);
        }
        true
    }

    #[must_use]
    pub fn contains(&self, node: NodeKey) -> bool {
        self.inner.read().nodes.contains_key(node)
    }

    #[must_use]
    pub fn lookup(&self, name: &str, parent: Option<NodeKey>) -> Option<NodeKey> {
        let inner = self.inner.read();
        inner
            .names
            .get(&(parent, name.to_string()))
            .copied()
            .filter(|k| inner.nodes.contains_key(*k))
    }

    #[must_use]
    pub fn name(&self, node: NodeKey) -> Option<String> {
        self.inner.read().nodes.get(node).map(|n| n.name.clone())
    }

    #[must_use]
    pub fn entry(&self, node: NodeKey) -> Option<Arc<NodeEntry>> {
        self.inner.read().nodes.get(node).map(|n| n.entry.clone())
    }

    #[must_use]
    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.inner.read().nodes.get(node).and_then(|n| n.parent)
    }

    /// Nodes whose parent scope is `parent`.
    #[must_use]
    pub fn nodes_in_scope(&self, parent: Option<NodeKey>) -> Vec<NodeKey> {
        self.inner
            .read()
            .nodes
            .iter()
            .filter(|(_, n)| n.parent == parent)
            .map(|(k, _)| k)
            .collect()
    }

    /// All nodes of the given type, anywhere in the universe.
    #[must_use]
    pub fn nodes_of_type(&self, entry: &str) -> Vec<NodeKey> {
        self.inner
            .read()
            .nodes
            .iter()
            .filter(|(_, n)| n.entry.name() == entry)
            .map(|(k, _)| k)
            .collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.procedural_nodes.clear();
        inner.names.clear();
        inner.nodes.clear();
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Sets a built-in or declared user parameter. Scalars assigned to array
    /// parameters become one-element arrays.
    pub fn set_param(&self, node: NodeKey, name: &str, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        let value = value.into();
        let mut inner = self.inner.write();
        let n = inner.nodes.get_mut(node).ok_or(ParamError::UnknownNode)?;

        let (ty, array, motion) = if let Some(decl) = n.entry.param(name) {
            (decl.ty, decl.array, decl.motion)
        } else if let Some(user) = n.user_params.get(name) {
            (user.ty, user.array, false)
        } else {
            return Err(ParamError::UnknownParam {
                entry: n.entry.name().to_string(),
                param: name.to_string(),
            });
        };

        let mismatch = |found: &ParamValue| ParamError::TypeMismatch {
            param: name.to_string(),
            expected: if array { format!("{ty} array") } else { ty.to_string() },
            found: if found.is_array() {
                format!("{} array", found.ty())
            } else {
                found.ty().to_string()
            },
        };

        let value = match (&value, array) {
            (ParamValue::Array { keys, .. }, true) => {
                if *keys > 1 && !motion {
                    return Err(ParamError::NotMotion {
                        param: name.to_string(),
                    });
                }
                value.clone().coerce(ty).ok_or_else(|| mismatch(&value))?
            }
            (ParamValue::Array { .. }, false) => return Err(mismatch(&value)),
            (_, true) => {
                let element = value.clone().coerce(ty).ok_or_else(|| mismatch(&value))?;
                ParamValue::array(ty, vec![element])
            }
            (_, false) => value.clone().coerce(ty).ok_or_else(|| mismatch(&value))?,
        };

        n.params.insert(name.to_string(), value);
        Ok(())
    }

    /// The explicit value of a parameter, or its declared default.
    #[must_use]
    pub fn param(&self, node: NodeKey, name: &str) -> Option<ParamValue> {
        let inner = self.inner.read();
        let n = inner.nodes.get(node)?;
        n.params
            .get(name)
            .cloned()
            .or_else(|| n.entry.param(name).map(|d| d.default.clone()))
    }

    /// `true` if the parameter holds an explicit (non-default) value.
    #[must_use]
    pub fn is_set(&self, node: NodeKey, name: &str) -> bool {
        self.inner
            .read()
            .nodes
            .get(node)
            .is_some_and(|n| n.params.contains_key(name))
    }

    /// Names of all explicitly set parameters.
    #[must_use]
    pub fn set_params(&self, node: NodeKey) -> Vec<String> {
        self.inner
            .read()
            .nodes
            .get(node)
            .map(|n| n.params.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Restores a built-in parameter to its default. A user parameter is
    /// removed entirely, declaration included.
    pub fn reset_param(&self, node: NodeKey, name: &str) {
        let mut inner = self.inner.write();
        if let Some(n) = inner.nodes.get_mut(node) {
            n.params.remove(name);
            n.user_params.remove(name);
            n.links.remove(name);
        }
    }

    pub fn declare_user_param(&self, node: NodeKey, name: &str, ty: ParamType, array: bool) -> Result<(), ParamError> {
        let mut inner = self.inner.write();
        let n = inner.nodes.get_mut(node).ok_or(ParamError::UnknownNode)?;
        if n.entry.has_param(name) {
            return Err(ParamError::BuiltinClash(name.to_string()));
        }
        let declared = UserParam { ty, array };
        match n.user_params.get(name) {
            Some(existing) if *existing == declared => Ok(()),
            Some(existing) => {
                // Redeclaring with another type discards the old value.
                log::debug!("Redeclaring user parameter \"{name}\" from {:?} to {ty:?}", existing.ty);
                n.params.remove(name);
                n.user_params.insert(name.to_string(), declared);
                Ok(())
            }
            None => {
                n.user_params.insert(name.to_string(), declared);
                Ok(())
            }
        }
    }

    /// Names of the declared user parameters on `node`.
    #[must_use]
    pub fn user_params(&self, node: NodeKey) -> Vec<String> {
        self.inner
            .read()
            .nodes
            .get(node)
            .map(|n| n.user_params.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolves a user parameter, walking up through parent procedurals.
    /// This is how custom attributes inherit natively.
    #[must_use]
    pub fn user_param(&self, node: NodeKey, name: &str) -> Option<ParamValue> {
        let inner = self.inner.read();
        let mut current = Some(node);
        while let Some(key) = current {
            let n = inner.nodes.get(key)?;
            if n.user_params.contains_key(name)
                && let Some(v) = n.params.get(name)
            {
                return Some(v.clone());
            }
            current = n.parent;
        }
        None
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Connects `output` of `source` to the input `param` of `node`.
    pub fn link(&self, source: NodeKey, output: &str, node: NodeKey, param: &str) -> Result<(), ParamError> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(source) {
            return Err(ParamError::UnknownNode);
        }
        let n = inner.nodes.get_mut(node).ok_or(ParamError::UnknownNode)?;
        if !n.entry.has_param(param) && !n.user_params.contains_key(param) {
            return Err(ParamError::UnknownParam {
                entry: n.entry.name().to_string(),
                param: param.to_string(),
            });
        }
        n.links.insert(param.to_string(), (source, output.to_string()));
        Ok(())
    }

    pub fn unlink(&self, node: NodeKey, param: &str) {
        if let Some(n) = self.inner.write().nodes.get_mut(node) {
            n.links.remove(param);
        }
    }

    #[must_use]
    pub fn link_source(&self, node: NodeKey, param: &str) -> Option<(NodeKey, String)> {
        self.inner
            .read()
            .nodes
            .get(node)
            .and_then(|n| n.links.get(param).cloned())
    }

    /// Input parameters of `node` that are linked.
    #[must_use]
    pub fn linked_params(&self, node: NodeKey) -> Vec<String> {
        self.inner
            .read()
            .nodes
            .get(node)
            .map(|n| n.links.keys().cloned().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Procedurals
    // ========================================================================

    pub fn set_procedural_nodes(&self, node: NodeKey, nodes: Box<dyn ProceduralNodes>) {
        self.inner.write().procedural_nodes.insert(node, nodes);
    }

    /// The nodes registered on a procedural, in registration order.
    #[must_use]
    pub fn procedural_nodes(&self, node: NodeKey) -> Vec<NodeKey> {
        let inner = self.inner.read();
        inner
            .procedural_nodes
            .get(&node)
            .map(|list| (0..list.node_count()).filter_map(|i| list.node_at(i)).collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// A serializable description of every node, sorted by scope and name.
    /// Node references are written as node names.
    #[must_use]
    pub fn snapshot(&self) -> UniverseSnapshot {
        let inner = self.inner.read();
        let name_of = |key: NodeKey| inner.nodes.get(key).map(|n| n.name.clone());

        let resolve = |value: &ParamValue| -> SnapshotValue {
            match value {
                ParamValue::Node(key) => SnapshotValue::Node(key.and_then(name_of)),
                ParamValue::Array { element: ParamType::Node, values, .. } => SnapshotValue::Nodes(
                    values.iter().map(|v| v.as_node().and_then(name_of)).collect(),
                ),
                other => SnapshotValue::Value(other.clone()),
            }
        };

        let mut nodes: Vec<NodeSnapshot> = inner
            .nodes
            .values()
            .map(|n| NodeSnapshot {
                name: n.name.clone(),
                entry: n.entry.name().to_string(),
                parent: n.parent.and_then(name_of),
                params: n.params.iter().map(|(k, v)| (k.clone(), resolve(v))).collect(),
                user_params: n.user_params.iter().map(|(k, u)| (k.clone(), u.ty)).collect(),
                links: n
                    .links
                    .iter()
                    .map(|(param, (source, output))| {
                        let source = name_of(*source).unwrap_or_default();
                        let link = if output.is_empty() { source } else { format!("{source}.{output}") };
                        (param.clone(), link)
                    })
                    .collect(),
            })
            .collect();
        nodes.sort_by(|a, b| (&a.parent, &a.name).cmp(&(&b.parent, &b.name)));
        UniverseSnapshot { nodes }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    Node(Option<String>),
    Nodes(Vec<Option<String>>),
    Value(ParamValue),
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub entry: String,
    pub parent: Option<String>,
    pub params: BTreeMap<String, SnapshotValue>,
    pub user_params: BTreeMap<String, ParamType>,
    pub links: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UniverseSnapshot {
    pub nodes: Vec<NodeSnapshot>,
}
