//! Dynamically-Typed Values
//!
//! [`Data`] is the value type carried by shader parameters, output
//! parameters, primitive variables and most attribute/option values.
//! [`CompoundData`] is an ordered string-keyed dictionary of [`Data`].

use std::collections::BTreeMap;
use std::fmt;

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::hash::{ContentHash, ContentHasher};

/// A dynamically-typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Data {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    String(String),
    V2f(Vec2),
    V3f(Vec3),
    Color3f(Vec3),
    Color4f(Vec4),
    M44f(Mat4),
    BoolVector(Vec<bool>),
    IntVector(Vec<i32>),
    FloatVector(Vec<f32>),
    StringVector(Vec<String>),
    V2fVector(Vec<Vec2>),
    V3fVector(Vec<Vec3>),
    Color3fVector(Vec<Vec3>),
    M44fVector(Vec<Mat4>),
    Compound(CompoundData),
}

impl Data {
    /// Stable type name, used in diagnostics and sample-type checks.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::UInt(_) => "UInt",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::V2f(_) => "V2f",
            Self::V3f(_) => "V3f",
            Self::Color3f(_) => "Color3f",
            Self::Color4f(_) => "Color4f",
            Self::M44f(_) => "M44f",
            Self::BoolVector(_) => "BoolVector",
            Self::IntVector(_) => "IntVector",
            Self::FloatVector(_) => "FloatVector",
            Self::StringVector(_) => "StringVector",
            Self::V2fVector(_) => "V2fVector",
            Self::V3fVector(_) => "V3fVector",
            Self::Color3fVector(_) => "Color3fVector",
            Self::M44fVector(_) => "M44fVector",
            Self::Compound(_) => "Compound",
        }
    }

    /// Number of elements for vector types, `None` for scalars.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::BoolVector(v) => Some(v.len()),
            Self::IntVector(v) => Some(v.len()),
            Self::FloatVector(v) => Some(v.len()),
            Self::StringVector(v) => Some(v.len()),
            Self::V2fVector(v) => Some(v.len()),
            Self::V3fVector(v) | Self::Color3fVector(v) => Some(v.len()),
            Self::M44fVector(v) => Some(v.len()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::UInt(u) => Some(*u != 0),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i32::try_from(*u).ok(),
            Self::Bool(b) => Some(i32::from(*b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f32),
            Self::UInt(u) => Some(*u as f32),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_compound(&self) -> Option<&CompoundData> {
        match self {
            Self::Compound(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, v: &[T]) -> fmt::Result {
            for (i, x) in v.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{x}")?;
            }
            Ok(())
        }

        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::V2f(v) => write!(f, "{} {}", v.x, v.y),
            Self::V3f(v) | Self::Color3f(v) => write!(f, "{} {} {}", v.x, v.y, v.z),
            Self::Color4f(v) => write!(f, "{} {} {} {}", v.x, v.y, v.z, v.w),
            Self::M44f(m) => join(f, &m.to_cols_array()),
            Self::BoolVector(v) => join(f, v),
            Self::IntVector(v) => join(f, v),
            Self::FloatVector(v) => join(f, v),
            Self::StringVector(v) => join(f, v),
            Self::V2fVector(_)
            | Self::V3fVector(_)
            | Self::Color3fVector(_)
            | Self::M44fVector(_)
            | Self::Compound(_) => write!(f, "<{}>", self.type_name()),
        }
    }
}

impl ContentHash for Data {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str(self.type_name());
        match self {
            Self::Bool(v) => v.hash_into(h),
            Self::Int(v) => v.hash_into(h),
            Self::UInt(v) => v.hash_into(h),
            Self::Float(v) => v.hash_into(h),
            Self::String(v) => v.hash_into(h),
            Self::V2f(v) => v.hash_into(h),
            Self::V3f(v) | Self::Color3f(v) => v.hash_into(h),
            Self::Color4f(v) => v.hash_into(h),
            Self::M44f(v) => v.hash_into(h),
            Self::BoolVector(v) => v.hash_into(h),
            Self::IntVector(v) => v.hash_into(h),
            Self::FloatVector(v) => v.hash_into(h),
            Self::StringVector(v) => v.hash_into(h),
            Self::V2fVector(v) => v.hash_into(h),
            Self::V3fVector(v) | Self::Color3fVector(v) => v.hash_into(h),
            Self::M44fVector(v) => v.hash_into(h),
            Self::Compound(v) => v.hash_into(h),
        }
    }
}

macro_rules! impl_data_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Data {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_data_from! {
    bool => Bool,
    i32 => Int,
    u32 => UInt,
    f32 => Float,
    String => String,
    Vec2 => V2f,
    Vec3 => V3f,
    Vec4 => Color4f,
    Mat4 => M44f,
    Vec<bool> => BoolVector,
    Vec<i32> => IntVector,
    Vec<f32> => FloatVector,
    Vec<String> => StringVector,
    Vec<Vec2> => V2fVector,
    Vec<Vec3> => V3fVector,
    Vec<Mat4> => M44fVector,
    CompoundData => Compound,
}

impl From<&str> for Data {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

// ============================================================================
// CompoundData
// ============================================================================

/// Ordered dictionary of [`Data`] values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundData(BTreeMap<String, Data>);

impl CompoundData {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Data>) -> Option<Data> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Data> {
        self.0.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Data> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(Data::as_bool).unwrap_or(default)
    }

    #[must_use]
    pub fn get_i32(&self, name: &str, default: i32) -> i32 {
        self.get(name).and_then(Data::as_i32).unwrap_or(default)
    }

    #[must_use]
    pub fn get_f32(&self, name: &str, default: f32) -> f32 {
        self.get(name).and_then(Data::as_f32).unwrap_or(default)
    }

    #[must_use]
    pub fn get_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).and_then(Data::as_str).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Data)> {
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

impl ContentHash for CompoundData {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_usize(self.0.len());
        for (k, v) in &self.0 {
            h.write_str(k);
            v.hash_into(h);
        }
    }
}

impl<K: Into<String>, V: Into<Data>> FromIterator<(K, V)> for CompoundData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a CompoundData {
    type Item = (&'a String, &'a Data);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Data>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters_fall_back_to_default() {
        let c = CompoundData::new().with("a", 2).with("b", "text");
        assert_eq!(c.get_i32("a", 0), 2);
        assert!((c.get_f32("a", 0.0) - 2.0).abs() < f32::EPSILON);
        assert_eq!(c.get_i32("b", 7), 7);
        assert_eq!(c.get_str("missing", "dflt"), "dflt");
    }

    #[test]
    fn test_hash_depends_on_type() {
        assert_ne!(Data::Int(1).content_hash(), Data::UInt(1).content_hash());
        assert_eq!(Data::from("x").content_hash(), Data::from("x").content_hash());
    }

    #[test]
    fn test_display_vectors() {
        assert_eq!(Data::IntVector(vec![1, 2, 3]).to_string(), "1 2 3");
        assert_eq!(Data::V3f(Vec3::new(1.0, 2.0, 3.0)).to_string(), "1 2 3");
    }
}
