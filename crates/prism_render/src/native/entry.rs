use rustc_hash::FxHashMap;
use serde::Serialize;

use super::value::{ParamType, ParamValue};

/// Geometric node families. Decided once at conversion time and carried
/// alongside the node so nothing has to query node types afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShapeKind {
    Mesh,
    Curves,
    Points,
    Volume,
    Procedural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntryKind {
    Shape(ShapeKind),
    Instance,
    Shader,
    Light,
    LightFilter,
    Camera,
    Driver,
    Filter,
    Options,
    ColorManager,
}

impl EntryKind {
    #[must_use]
    pub fn is_shape(self) -> bool {
        matches!(self, Self::Shape(_) | Self::Instance)
    }
}

/// Declaration of one parameter on a node type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ParamType,
    pub array: bool,
    /// Accepts more than one motion key.
    pub motion: bool,
    pub default: ParamValue,
}

/// Schema of a native node type.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    name: String,
    kind: EntryKind,
    params: FxHashMap<String, ParamDecl>,
}

impl NodeEntry {
    #[must_use]
    pub fn builder(name: impl Into<String>, kind: EntryKind) -> EntryBuilder {
        EntryBuilder {
            entry: Self {
                name: name.into(),
                kind,
                params: FxHashMap::default(),
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamDecl> {
        self.params.get(name)
    }

    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn params(&self) -> impl Iterator<Item = &ParamDecl> {
        self.params.values()
    }
}

/// Builder for [`NodeEntry`].
#[derive(Debug)]
pub struct EntryBuilder {
    entry: NodeEntry,
}

impl EntryBuilder {
    /// Scalar parameter; the type is taken from `default`.
    #[must_use]
    pub fn param(mut self, name: &str, default: impl Into<ParamValue>) -> Self {
        let default = default.into();
        self.insert(ParamDecl {
            name: name.to_string(),
            ty: default.ty(),
            array: false,
            motion: false,
            default,
        });
        self
    }

    #[must_use]
    pub fn node_param(mut self, name: &str) -> Self {
        self.insert(ParamDecl {
            name: name.to_string(),
            ty: ParamType::Node,
            array: false,
            motion: false,
            default: ParamValue::Node(None),
        });
        self
    }

    /// Empty single-key array parameter.
    #[must_use]
    pub fn array(mut self, name: &str, element: ParamType) -> Self {
        self.insert(ParamDecl {
            name: name.to_string(),
            ty: element,
            array: true,
            motion: false,
            default: ParamValue::empty_array(element),
        });
        self
    }

    /// Array parameter accepting motion keys.
    #[must_use]
    pub fn motion_array(mut self, name: &str, element: ParamType) -> Self {
        self.insert(ParamDecl {
            name: name.to_string(),
            ty: element,
            array: true,
            motion: true,
            default: ParamValue::empty_array(element),
        });
        self
    }

    /// Applies a group of declarations shared by several entries.
    #[must_use]
    pub fn with(self, group: impl FnOnce(Self) -> Self) -> Self {
        group(self)
    }

    fn insert(&mut self, decl: ParamDecl) {
        self.entry.params.insert(decl.name.clone(), decl);
    }

    #[must_use]
    pub fn build(self) -> NodeEntry {
        self.entry
    }
}
