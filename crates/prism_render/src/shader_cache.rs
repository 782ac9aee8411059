//! Shader Cache
//!
//! Deduplicates native shader graphs by the content hash of their
//! [`ShaderNetwork`].
//!
//! # Overview
//!
//! - [`ShaderCache::get`] returns a shared [`ShaderHandle`]; equal networks
//!   (after `${…}` substitution) share one native graph.
//! - [`ShaderCache::convert_unique`] builds a graph that is never shared,
//!   for lights and light filters whose graphs are edited in place.
//! - [`ShaderCache::update`] edits such a graph in place and refuses when
//!   the root shader type changes, because anything linked to the root would
//!   be left pointing at the wrong kind of node.
//!
//! Native node names are `shader:<hash>` for the root and
//! `shader:<hash>:<handle>` for upstream shaders, unless the cache was made
//! with another namespace.

use std::sync::Arc;

use prism_core::{ContentHash, ContentHasher, Hash128, PrismError, Result};
use prism_scene::{Dictionary, Shader, ShaderNetwork};
use rustc_hash::FxHashMap;

use crate::cache::OnceCache;
use crate::convert::pass_through;
use crate::native::NodeKey;
use crate::scope::{NodeScope, OwnedNode};

/// A converted native shader graph.
#[derive(Debug)]
pub struct ShaderHandle {
    prefix: String,
    root: OwnedNode,
    root_handle: String,
    root_type: String,
    /// Upstream nodes, keyed by shader handle.
    nodes: FxHashMap<String, OwnedNode>,
    hash: Hash128,
}

impl ShaderHandle {
    /// The output node, which is what entities link to.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.root.key()
    }

    /// Native type of the output node.
    #[inline]
    #[must_use]
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> Hash128 {
        self.hash
    }

    /// The node for a shader handle of the source network.
    #[must_use]
    pub fn node(&self, handle: &str) -> Option<NodeKey> {
        if handle == self.root_handle {
            Some(self.root.key())
        } else {
            self.nodes.get(handle).map(OwnedNode::key)
        }
    }

    /// Every node of the graph, root first.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeKey> {
        let mut nodes = vec![self.root.key()];
        let mut upstream: Vec<_> = self.nodes.iter().collect();
        upstream.sort_by(|a, b| a.0.cmp(b.0));
        nodes.extend(upstream.into_iter().map(|(_, n)| n.key()));
        nodes
    }
}

pub struct ShaderCache {
    scope: NodeScope,
    namespace: String,
    cache: OnceCache<ShaderHandle>,
}

impl std::fmt::Debug for ShaderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderCache")
            .field("len", &self.cache.len())
            .field("scope", &self.scope)
            .finish()
    }
}

impl ShaderCache {
    #[must_use]
    pub fn new(scope: NodeScope) -> Self {
        Self::with_namespace(scope, "shader")
    }

    /// A cache whose shared graphs are named `<namespace>:<hash>`, for caches
    /// sharing a scope with another.
    #[must_use]
    pub fn with_namespace(scope: NodeScope, namespace: impl Into<String>) -> Self {
        Self {
            scope,
            namespace: namespace.into(),
            cache: OnceCache::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> &NodeScope {
        &self.scope
    }

    /// Returns the shared graph for `network`. When `attributes` is given,
    /// `${name}` tokens in string parameters are resolved against it first;
    /// `network` itself is never modified.
    pub fn get(&self, network: &ShaderNetwork, attributes: Option<&Dictionary>) -> Result<Arc<ShaderHandle>> {
        let substitute = attributes.filter(|_| network.has_substitutions());

        let mut h = ContentHasher::new();
        h.append(network);
        if let Some(attributes) = substitute {
            h.write_hash(network.substitutions_hash(attributes));
        }
        let hash = h.finish();

        self.cache.get_or_try_insert(hash, || {
            let prefix = format!("{}:{hash}", self.namespace);
            match substitute {
                Some(attributes) => self.convert_named(&network.substituted(attributes), &prefix, hash),
                None => self.convert_named(network, &prefix, hash),
            }
        })
    }

    /// Converts `network` into a graph owned by the caller alone. Nodes are
    /// named after `prefix`.
    pub fn convert_unique(&self, network: &ShaderNetwork, prefix: &str) -> Result<ShaderHandle> {
        self.convert_named(network, prefix, network.content_hash())
    }

    fn convert_named(&self, network: &ShaderNetwork, prefix: &str, hash: Hash128) -> Result<ShaderHandle> {
        let root_handle = network.output().shader.clone();
        let root_shader = network.output_shader().ok_or_else(|| PrismError::MissingData {
            context: prefix.to_string(),
            name: format!("output shader \"{root_handle}\""),
        })?;

        let root = self.create_shader(root_shader, prefix)?;
        let mut nodes = FxHashMap::default();
        for (handle, shader) in network.shaders() {
            if *handle == root_handle {
                continue;
            }
            nodes.insert(handle.clone(), self.create_shader(shader, &format!("{prefix}:{handle}"))?);
        }

        let handle = ShaderHandle {
            prefix: prefix.to_string(),
            root,
            root_handle,
            root_type: root_shader.name.clone(),
            nodes,
            hash,
        };
        self.connect(&handle, network);
        Ok(handle)
    }

    fn create_shader(&self, shader: &Shader, name: &str) -> Result<OwnedNode> {
        let node = self.scope.create(&shader.name, name)?;
        pass_through(&self.scope, node.key(), &shader.parameters);
        Ok(node)
    }

    fn connect(&self, handle: &ShaderHandle, network: &ShaderNetwork) {
        let universe = self.scope.universe();
        for c in network.connections() {
            let (Some(source), Some(destination)) = (handle.node(&c.source.shader), handle.node(&c.destination.shader))
            else {
                self.scope.messages().warning(
                    "prism::ShaderCache",
                    format!(
                        "{} : connection {}.{} -> {}.{} refers to a missing shader",
                        handle.prefix, c.source.shader, c.source.name, c.destination.shader, c.destination.name
                    ),
                );
                continue;
            };
            if let Err(e) = universe.link(source, &c.source.name, destination, &c.destination.name) {
                self.scope.messages().warning(
                    "prism::ShaderCache",
                    format!("{} : unable to connect to \"{}\" : {e}", handle.prefix, c.destination.name),
                );
            }
        }
    }

    /// Updates a graph made by [`convert_unique`](Self::convert_unique) to
    /// match `network`, keeping node identity wherever the shader type is
    /// unchanged.
    ///
    /// Returns `false` without touching the graph if the root shader type
    /// differs or the network names an unknown shader type.
    pub fn update(&self, handle: &mut ShaderHandle, network: &ShaderNetwork) -> bool {
        let Some(root_shader) = network.output_shader() else {
            return false;
        };
        if root_shader.name != handle.root_type {
            return false;
        }
        let root_handle = network.output().shader.clone();

        // Every shader type must exist before anything is touched.
        for (_, shader) in network.shaders() {
            if let Err(e) = self.scope.entry(&shader.name) {
                self.scope
                    .messages()
                    .warning("prism::ShaderCache", format!("{} : {e}", handle.prefix));
                return false;
            }
        }

        // Drop upstream nodes that are gone or changed type.
        let universe = self.scope.universe().clone();
        let stale: Vec<String> = handle
            .nodes
            .iter()
            .filter(|(h, node)| {
                **h == root_handle
                    || network
                        .shader(h)
                        .is_none_or(|s| universe.entry(node.key()).is_none_or(|e| e.name() != s.name))
            })
            .map(|(h, _)| h.clone())
            .collect();
        for h in stale {
            if let Some(node) = handle.nodes.remove(&h) {
                node.destroy();
            }
        }

        // Reset reused nodes, then apply the new parameters.
        self.reset(handle.root.key());
        pass_through(&self.scope, handle.root.key(), &root_shader.parameters);
        for (h, node) in &handle.nodes {
            if let Some(shader) = network.shader(h) {
                self.reset(node.key());
                pass_through(&self.scope, node.key(), &shader.parameters);
            }
        }

        for (h, shader) in network.shaders() {
            if *h == root_handle || handle.nodes.contains_key(h) {
                continue;
            }
            match self.create_shader(shader, &format!("{}:{h}", handle.prefix)) {
                Ok(node) => {
                    handle.nodes.insert(h.clone(), node);
                }
                Err(e) => self
                    .scope
                    .messages()
                    .warning("prism::ShaderCache", format!("{} : {e}", handle.prefix)),
            }
        }
        handle.root_handle = root_handle;
        handle.hash = network.content_hash();

        self.connect(handle, network);
        true
    }

    fn reset(&self, node: NodeKey) {
        let universe = self.scope.universe();
        for param in universe.linked_params(node) {
            universe.unlink(node, &param);
        }
        for param in universe.set_params(node) {
            universe.reset_param(node, &param);
        }
        for param in universe.user_params(node) {
            universe.reset_param(node, &param);
        }
    }

    /// Drops graphs nothing references any more. Returns how many.
    pub fn clear_unused(&self) -> usize {
        self.cache.clear_unused()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{ParamValue, Universe};
    use crate::registry::Registry;
    use crate::settings::NodeLifetime;
    use glam::Vec3;
    use prism_core::{Data, MessageHandler};
    use prism_scene::{Connection, Parameter, Value};

    fn cache(lifetime: NodeLifetime) -> ShaderCache {
        ShaderCache::new(NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            MessageHandler::new(),
            lifetime,
        ))
    }

    fn textured(file: &str) -> ShaderNetwork {
        let mut network = ShaderNetwork::single("surface", Shader::new("standard_surface", "surface"));
        network.add_shader("tex", Shader::new("image", "shader").with_parameter("filename", file));
        network.add_connection(Connection::new(
            Parameter::output("tex"),
            Parameter::new("surface", "base_color"),
        ));
        network
    }

    #[test]
    fn test_identical_networks_share_a_graph() {
        let cache = cache(NodeLifetime::Eager);
        let a = cache.get(&textured("a.tx"), None).unwrap();
        let b = cache.get(&textured("a.tx"), None).unwrap();
        let c = cache.get(&textured("b.tx"), None).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);

        let u = cache.scope().universe();
        let tex = a.node("tex").unwrap();
        assert_eq!(u.link_source(a.root(), "base_color"), Some((tex, String::new())));
        assert_eq!(u.name(a.root()), Some(format!("shader:{}", a.hash())));
    }

    #[test]
    fn test_substitutions_change_key_not_network() {
        let cache = cache(NodeLifetime::Eager);
        let network = textured("${name}.tx");
        let a = cache
            .get(&network, Some(&Dictionary::new().with("name", Value::from("rock"))))
            .unwrap();
        let b = cache
            .get(&network, Some(&Dictionary::new().with("user:name", Value::from("moss"))))
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        let u = cache.scope().universe();
        assert_eq!(u.param(a.node("tex").unwrap(), "filename"), Some(ParamValue::from("rock.tx")));
        assert_eq!(u.param(b.node("tex").unwrap(), "filename"), Some(ParamValue::from("moss.tx")));
        assert_eq!(
            network.shader("tex").and_then(|s| s.parameters.get("filename")),
            Some(&Data::from("${name}.tx"))
        );
    }

    #[test]
    fn test_clear_unused_destroys_eager_graphs() {
        let cache = cache(NodeLifetime::Eager);
        let handle = cache.get(&textured("a.tx"), None).unwrap();
        let root = handle.root();
        assert_eq!(cache.clear_unused(), 0);

        drop(handle);
        assert_eq!(cache.clear_unused(), 1);
        assert!(!cache.scope().universe().contains(root));
    }

    #[test]
    fn test_update_keeps_identity() {
        let cache = cache(NodeLifetime::Eager);
        let mut handle = cache.convert_unique(&textured("a.tx"), "light:key").unwrap();
        let root = handle.root();
        let tex = handle.node("tex").unwrap();

        let mut edited = textured("b.tx");
        edited
            .shader_mut("surface")
            .unwrap()
            .parameters
            .insert("base", 0.5f32);
        assert!(cache.update(&mut handle, &edited));

        let u = cache.scope().universe();
        assert_eq!(handle.root(), root);
        assert_eq!(handle.node("tex"), Some(tex));
        assert_eq!(u.param(tex, "filename"), Some(ParamValue::from("b.tx")));
        assert_eq!(u.param(root, "base"), Some(ParamValue::Float(0.5)));
    }

    #[test]
    fn test_update_replaces_retyped_upstream_and_drops_stale() {
        let cache = cache(NodeLifetime::Eager);
        let mut handle = cache.convert_unique(&textured("a.tx"), "light:key").unwrap();
        let old_tex = handle.node("tex").unwrap();

        let mut edited = ShaderNetwork::single("surface", Shader::new("standard_surface", "surface"));
        edited.add_shader("tex", Shader::new("flat", "shader").with_parameter("color", Vec3::X));
        assert!(cache.update(&mut handle, &edited));

        let u = cache.scope().universe();
        let new_tex = handle.node("tex").unwrap();
        assert_ne!(new_tex, old_tex);
        assert!(!u.contains(old_tex));
        assert_eq!(u.entry(new_tex).unwrap().name(), "flat");
        assert!(u.link_source(handle.root(), "base_color").is_none());
    }

    #[test]
    fn test_update_refuses_root_type_change() {
        let cache = cache(NodeLifetime::Eager);
        let mut handle = cache.convert_unique(&textured("a.tx"), "light:key").unwrap();
        let lambert = ShaderNetwork::single("surface", Shader::new("lambert", "surface"));
        assert!(!cache.update(&mut handle, &lambert));
        assert_eq!(handle.root_type(), "standard_surface");
        assert!(handle.node("tex").is_some());
    }

    #[test]
    fn test_unknown_shader_type() {
        let cache = cache(NodeLifetime::Eager);
        let network = ShaderNetwork::single("s", Shader::new("no_such_shader", "surface"));
        assert!(matches!(cache.get(&network, None), Err(PrismError::UnknownNodeType(_))));
    }
}
