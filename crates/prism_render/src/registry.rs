//! Registry
//!
//! An explicit lookup table, built once and shared by reference with every
//! component that needs it:
//!
//! - native node entries, by name
//! - object converters, by [`ObjectKind`]
//! - the per-light-type [`LightUpdatePolicy`]
//!
//! Hosts extend the renderer by registering entries and converters on a
//! registry before constructing the renderer with it.

use std::sync::Arc;

use prism_scene::ObjectKind;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::convert::{
    CameraConverter, CurvesConverter, ExternalProceduralConverter, MeshConverter, ObjectConverter,
    PointsConverter, VolumeConverter,
};
use crate::native::{NodeEntry, builtin_entries};

/// Light types whose shader must be rebuilt rather than updated in place
/// when the network feeding their `color` input changes.
///
/// The default works around a renderer defect affecting `quad_light`
/// texture updates in interactive sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightUpdatePolicy {
    rebuild_on_color_change: FxHashSet<String>,
}

impl Default for LightUpdatePolicy {
    fn default() -> Self {
        Self::none().with_rebuild_on_color_change("quad_light")
    }
}

impl LightUpdatePolicy {
    /// A policy that updates every light type in place.
    #[must_use]
    pub fn none() -> Self {
        Self {
            rebuild_on_color_change: FxHashSet::default(),
        }
    }

    #[must_use]
    pub fn with_rebuild_on_color_change(mut self, light_type: impl Into<String>) -> Self {
        self.rebuild_on_color_change.insert(light_type.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn rebuilds_on_color_change(&self, light_type: &str) -> bool {
        self.rebuild_on_color_change.contains(light_type)
    }
}

pub struct Registry {
    entries: FxHashMap<String, Arc<NodeEntry>>,
    converters: FxHashMap<ObjectKind, Arc<dyn ObjectConverter>>,
    light_update_policy: LightUpdatePolicy,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut converters: Vec<_> = self.converters.keys().collect();
        converters.sort();
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .field("converters", &converters)
            .field("light_update_policy", &self.light_update_policy)
            .finish()
    }
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            converters: FxHashMap::default(),
            light_update_policy: LightUpdatePolicy::default(),
        }
    }

    /// A registry holding the built-in node entries and converters.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for entry in builtin_entries() {
            registry.register_entry(entry);
        }
        registry.register_converter(ObjectKind::Mesh, MeshConverter);
        registry.register_converter(ObjectKind::Curves, CurvesConverter);
        registry.register_converter(ObjectKind::Points, PointsConverter);
        registry.register_converter(ObjectKind::Volume, VolumeConverter);
        registry.register_converter(ObjectKind::ExternalProcedural, ExternalProceduralConverter);
        registry.register_converter(ObjectKind::Camera, CameraConverter);
        registry
    }

    /// Adds or replaces a node entry.
    pub fn register_entry(&mut self, entry: NodeEntry) {
        self.entries.insert(entry.name().to_string(), Arc::new(entry));
    }

    /// Adds or replaces the converter for `kind`.
    pub fn register_converter(&mut self, kind: ObjectKind, converter: impl ObjectConverter + 'static) {
        self.converters.insert(kind, Arc::new(converter));
    }

    pub fn set_light_update_policy(&mut self, policy: LightUpdatePolicy) {
        self.light_update_policy = policy;
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&Arc<NodeEntry>> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn converter(&self, kind: ObjectKind) -> Option<&Arc<dyn ObjectConverter>> {
        self.converters.get(&kind)
    }

    #[inline]
    #[must_use]
    pub fn light_update_policy(&self) -> &LightUpdatePolicy {
        &self.light_update_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::EntryKind;

    #[test]
    fn test_builtins_are_registered() {
        let registry = Registry::with_builtins();
        assert!(registry.entry("polymesh").is_some());
        assert!(registry.entry("driver_exr").is_some());
        assert!(registry.converter(ObjectKind::Mesh).is_some());
        assert!(registry.converter(ObjectKind::Procedural).is_none());
    }

    #[test]
    fn test_register_entry_replaces() {
        let mut registry = Registry::new();
        registry.register_entry(NodeEntry::builder("custom_shader", EntryKind::Shader).build());
        assert_eq!(
            registry.entry("custom_shader").map(|e| e.kind()),
            Some(EntryKind::Shader)
        );
    }

    #[test]
    fn test_default_light_policy() {
        let policy = LightUpdatePolicy::default();
        assert!(policy.rebuilds_on_color_change("quad_light"));
        assert!(!policy.rebuilds_on_color_change("point_light"));
        assert!(!LightUpdatePolicy::none().rebuilds_on_color_change("quad_light"));
    }
}
