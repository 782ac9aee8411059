use std::fmt;

use glam::{Mat4, Vec2, Vec3, Vec4};
use prism_core::Data;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::NodeKey;

/// Element type of a native parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Bool,
    Byte,
    Int,
    UInt,
    Float,
    Rgb,
    Rgba,
    Vec2,
    Vec3,
    String,
    Matrix,
    Node,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A typed native parameter value.
///
/// Arrays are stored flat: `values.len() == elements * keys`, with all
/// elements of the first motion key first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Byte(u8),
    Int(i32),
    UInt(u32),
    Float(f32),
    Rgb(Vec3),
    Rgba(Vec4),
    Vec2(Vec2),
    Vec3(Vec3),
    String(String),
    Matrix(Mat4),
    Node(Option<NodeKey>),
    Array {
        element: ParamType,
        keys: u32,
        values: Vec<ParamValue>,
    },
}

impl ParamValue {
    /// Element type, or for arrays the array's element type.
    #[must_use]
    pub fn ty(&self) -> ParamType {
        match self {
            Self::Bool(_) => ParamType::Bool,
            Self::Byte(_) => ParamType::Byte,
            Self::Int(_) => ParamType::Int,
            Self::UInt(_) => ParamType::UInt,
            Self::Float(_) => ParamType::Float,
            Self::Rgb(_) => ParamType::Rgb,
            Self::Rgba(_) => ParamType::Rgba,
            Self::Vec2(_) => ParamType::Vec2,
            Self::Vec3(_) => ParamType::Vec3,
            Self::String(_) => ParamType::String,
            Self::Matrix(_) => ParamType::Matrix,
            Self::Node(_) => ParamType::Node,
            Self::Array { element, .. } => *element,
        }
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    /// A single-key array.
    #[must_use]
    pub fn array(element: ParamType, values: Vec<ParamValue>) -> Self {
        Self::Array {
            element,
            keys: 1,
            values,
        }
    }

    /// A motion-keyed array; `values` holds `keys` equally sized blocks.
    #[must_use]
    pub fn motion_array(element: ParamType, keys: u32, values: Vec<ParamValue>) -> Self {
        Self::Array {
            element,
            keys: keys.max(1),
            values,
        }
    }

    #[must_use]
    pub fn empty_array(element: ParamType) -> Self {
        Self::array(element, Vec::new())
    }

    #[must_use]
    pub fn nodes(keys: impl IntoIterator<Item = NodeKey>) -> Self {
        Self::array(
            ParamType::Node,
            keys.into_iter().map(|k| Self::Node(Some(k))).collect(),
        )
    }

    /// Converts `self` to `target`, applying the lossless numeric coercions
    /// the renderer accepts. `None` if the types are incompatible.
    #[must_use]
    pub fn coerce(self, target: ParamType) -> Option<Self> {
        if self.ty() == target {
            return Some(self);
        }
        match (self, target) {
            (Self::Int(i), ParamType::UInt) => u32::try_from(i).ok().map(Self::UInt),
            (Self::Int(i), ParamType::Byte) => u8::try_from(i).ok().map(Self::Byte),
            (Self::Int(i), ParamType::Float) => Some(Self::Float(i as f32)),
            (Self::UInt(u), ParamType::Int) => i32::try_from(u).ok().map(Self::Int),
            (Self::UInt(u), ParamType::Byte) => u8::try_from(u).ok().map(Self::Byte),
            (Self::Byte(b), ParamType::Int) => Some(Self::Int(i32::from(b))),
            (Self::Vec3(v), ParamType::Rgb) => Some(Self::Rgb(v)),
            (Self::Rgb(v), ParamType::Vec3) => Some(Self::Vec3(v)),
            (Self::Array { keys, values, .. }, target) => {
                let values = values
                    .into_iter()
                    .map(|v| v.coerce(target))
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::Array {
                    element: target,
                    keys,
                    values,
                })
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Byte(b) => Some(i32::from(*b)),
            Self::UInt(u) => i32::try_from(*u).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
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
    pub fn as_node(&self) -> Option<NodeKey> {
        match self {
            Self::Node(n) => *n,
            _ => None,
        }
    }

    #[must_use]
    pub fn as_matrix(&self) -> Option<Mat4> {
        match self {
            Self::Matrix(m) => Some(*m),
            Self::Array { values, .. } => values.first().and_then(Self::as_matrix),
            _ => None,
        }
    }

    /// Array elements; a scalar is a one-element slice.
    #[must_use]
    pub fn elements(&self) -> &[ParamValue] {
        match self {
            Self::Array { values, .. } => values,
            other => std::slice::from_ref(other),
        }
    }

    /// Motion key count; `1` for scalars.
    #[must_use]
    pub fn keys(&self) -> u32 {
        match self {
            Self::Array { keys, .. } => *keys,
            _ => 1,
        }
    }

    /// Converts generic [`Data`] into a native value. Compound data has no
    /// native equivalent.
    #[must_use]
    pub fn from_data(data: &Data) -> Option<Self> {
        fn array<T: Clone>(element: ParamType, v: &[T], f: impl Fn(T) -> ParamValue) -> ParamValue {
            ParamValue::array(element, v.iter().cloned().map(f).collect())
        }

        Some(match data {
            Data::Bool(b) => Self::Bool(*b),
            Data::Int(i) => Self::Int(*i),
            Data::UInt(u) => Self::UInt(*u),
            Data::Float(f) => Self::Float(*f),
            Data::String(s) => Self::String(s.clone()),
            Data::V2f(v) => Self::Vec2(*v),
            Data::V3f(v) => Self::Vec3(*v),
            Data::Color3f(v) => Self::Rgb(*v),
            Data::Color4f(v) => Self::Rgba(*v),
            Data::M44f(m) => Self::Matrix(*m),
            Data::BoolVector(v) => array(ParamType::Bool, v, Self::Bool),
            Data::IntVector(v) => array(ParamType::Int, v, Self::Int),
            Data::FloatVector(v) => array(ParamType::Float, v, Self::Float),
            Data::StringVector(v) => array(ParamType::String, v, Self::String),
            Data::V2fVector(v) => array(ParamType::Vec2, v, Self::Vec2),
            Data::V3fVector(v) => array(ParamType::Vec3, v, Self::Vec3),
            Data::Color3fVector(v) => array(ParamType::Rgb, v, Self::Rgb),
            Data::M44fVector(v) => array(ParamType::Matrix, v, Self::Matrix),
            Data::Compound(_) => return None,
        })
    }
}

macro_rules! impl_param_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_param_from! {
    bool => Bool,
    u8 => Byte,
    i32 => Int,
    u32 => UInt,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Rgba,
    String => String,
    Mat4 => Matrix,
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<NodeKey> for ParamValue {
    fn from(k: NodeKey) -> Self {
        Self::Node(Some(k))
    }
}

/// Errors raised by the native scene graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("Node does not exist")]
    UnknownNode,

    #[error("Node type \"{entry}\" has no parameter \"{param}\"")]
    UnknownParam { entry: String, param: String },

    #[error("Parameter \"{param}\" expects {expected} but was given {found}")]
    TypeMismatch {
        param: String,
        expected: String,
        found: String,
    },

    #[error("Parameter \"{param}\" does not accept motion keys")]
    NotMotion { param: String },

    #[error("\"{0}\" clashes with a built-in parameter")]
    BuiltinClash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_coercion() {
        assert_eq!(ParamValue::Int(3).coerce(ParamType::Byte), Some(ParamValue::Byte(3)));
        assert_eq!(ParamValue::Int(-1).coerce(ParamType::UInt), None);
        assert_eq!(ParamValue::Int(300).coerce(ParamType::Byte), None);
        assert_eq!(ParamValue::Int(2).coerce(ParamType::Float), Some(ParamValue::Float(2.0)));
        assert_eq!(ParamValue::Float(2.0).coerce(ParamType::Int), None);
    }

    #[test]
    fn test_array_coercion() {
        let ints = ParamValue::array(ParamType::Int, vec![ParamValue::Int(4), ParamValue::Int(3)]);
        let uints = ints.coerce(ParamType::UInt).unwrap();
        assert_eq!(uints.ty(), ParamType::UInt);
        assert_eq!(uints.elements().len(), 2);
    }

    #[test]
    fn test_from_data() {
        let v = ParamValue::from_data(&Data::FloatVector(vec![1.0, 2.0])).unwrap();
        assert!(v.is_array());
        assert_eq!(v.ty(), ParamType::Float);
        assert!(ParamValue::from_data(&Data::Compound(prism_core::CompoundData::new())).is_none());
    }
}
