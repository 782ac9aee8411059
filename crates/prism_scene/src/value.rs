//! Attribute and option values.
//!
//! Attributes and options may hold either plain [`Data`] or a whole
//! [`ShaderNetwork`]. Networks are reference counted so that the same
//! network can be shared by many attribute dictionaries without copying.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use prism_core::{CompoundData, ContentHash, ContentHasher, Data};

use crate::shader_network::ShaderNetwork;

/// A single attribute or option value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Data(Data),
    ShaderNetwork(Arc<ShaderNetwork>),
}

impl Value {
    #[must_use]
    pub fn as_data(&self) -> Option<&Data> {
        match self {
            Self::Data(d) => Some(d),
            Self::ShaderNetwork(_) => None,
        }
    }

    #[must_use]
    pub fn as_shader_network(&self) -> Option<&Arc<ShaderNetwork>> {
        match self {
            Self::ShaderNetwork(n) => Some(n),
            Self::Data(_) => None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Data(d) => d.type_name(),
            Self::ShaderNetwork(_) => "ShaderNetwork",
        }
    }
}

impl ContentHash for Value {
    fn hash_into(&self, h: &mut ContentHasher) {
        match self {
            Self::Data(d) => d.hash_into(h),
            Self::ShaderNetwork(n) => {
                h.write_str("ShaderNetwork");
                n.hash_into(h);
            }
        }
    }
}

impl From<Data> for Value {
    fn from(d: Data) -> Self {
        Self::Data(d)
    }
}

impl From<ShaderNetwork> for Value {
    fn from(n: ShaderNetwork) -> Self {
        Self::ShaderNetwork(Arc::new(n))
    }
}

impl From<Arc<ShaderNetwork>> for Value {
    fn from(n: Arc<ShaderNetwork>) -> Self {
        Self::ShaderNetwork(n)
    }
}

macro_rules! impl_value_from_data {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Data(Data::from(v))
                }
            }
        )*
    };
}

impl_value_from_data!(bool, i32, u32, f32, &str, String, Vec2, Vec3, Mat4, CompoundData);

// ============================================================================
// Dictionary
// ============================================================================

/// Ordered name → [`Value`] map used for attributes and nested options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(BTreeMap<String, Value>);

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn get_data(&self, name: &str) -> Option<&Data> {
        self.get(name).and_then(Value::as_data)
    }

    #[must_use]
    pub fn get_shader(&self, name: &str) -> Option<&Arc<ShaderNetwork>> {
        self.get(name).and_then(Value::as_shader_network)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get_data(name).and_then(Data::as_bool).unwrap_or(default)
    }

    #[must_use]
    pub fn get_i32(&self, name: &str, default: i32) -> i32 {
        self.get_data(name).and_then(Data::as_i32).unwrap_or(default)
    }

    #[must_use]
    pub fn get_f32(&self, name: &str, default: f32) -> f32 {
        self.get_data(name).and_then(Data::as_f32).unwrap_or(default)
    }

    #[must_use]
    pub fn get_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get_data(name).and_then(Data::as_str).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ContentHash for Dictionary {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_usize(self.0.len());
        for (k, v) in &self.0 {
            h.write_str(k);
            v.hash_into(h);
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
