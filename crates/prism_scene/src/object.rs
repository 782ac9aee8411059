//! Scene objects.
//!
//! [`Object`] is a tagged variant decided by the caller: the translation
//! layer dispatches on [`ObjectKind`] once per conversion and never inspects
//! types again afterwards.

use std::fmt;
use std::sync::Arc;

use prism_core::{ContentHash, ContentHasher};

use crate::camera::CameraData;
use crate::primitive::{CurvesPrimitive, ExternalProcedural, MeshPrimitive, PointsPrimitive, VolumeObject};
use crate::renderer::Procedural;

#[derive(Clone)]
pub enum Object {
    Mesh(MeshPrimitive),
    Curves(CurvesPrimitive),
    Points(PointsPrimitive),
    Volume(VolumeObject),
    ExternalProcedural(ExternalProcedural),
    /// A nested scene description expanded by the translation layer.
    Procedural(Arc<dyn Procedural>),
    Camera(CameraData),
}

/// Discriminant of [`Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Mesh,
    Curves,
    Points,
    Volume,
    ExternalProcedural,
    Procedural,
    Camera,
}

impl ObjectKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mesh => "Mesh",
            Self::Curves => "Curves",
            Self::Points => "Points",
            Self::Volume => "Volume",
            Self::ExternalProcedural => "ExternalProcedural",
            Self::Procedural => "Procedural",
            Self::Camera => "Camera",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Object {
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Mesh(_) => ObjectKind::Mesh,
            Self::Curves(_) => ObjectKind::Curves,
            Self::Points(_) => ObjectKind::Points,
            Self::Volume(_) => ObjectKind::Volume,
            Self::ExternalProcedural(_) => ObjectKind::ExternalProcedural,
            Self::Procedural(_) => ObjectKind::Procedural,
            Self::Camera(_) => ObjectKind::Camera,
        }
    }

    #[must_use]
    pub fn as_mesh(&self) -> Option<&MeshPrimitive> {
        match self {
            Self::Mesh(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_camera(&self) -> Option<&CameraData> {
        match self {
            Self::Camera(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mesh(m) => f.debug_tuple("Mesh").field(m).finish(),
            Self::Curves(c) => f.debug_tuple("Curves").field(c).finish(),
            Self::Points(p) => f.debug_tuple("Points").field(p).finish(),
            Self::Volume(v) => f.debug_tuple("Volume").field(v).finish(),
            Self::ExternalProcedural(p) => f.debug_tuple("ExternalProcedural").field(p).finish(),
            Self::Procedural(p) => f
                .debug_tuple("Procedural")
                .field(&p.content_hash())
                .finish(),
            Self::Camera(c) => f.debug_tuple("Camera").field(c).finish(),
        }
    }
}

impl ContentHash for Object {
    fn hash_into(&self, h: &mut ContentHasher) {
        match self {
            Self::Mesh(m) => m.hash_into(h),
            Self::Curves(c) => c.hash_into(h),
            Self::Points(p) => p.hash_into(h),
            Self::Volume(v) => v.hash_into(h),
            Self::ExternalProcedural(p) => p.hash_into(h),
            Self::Procedural(p) => {
                h.write_str("Procedural");
                p.hash_into(h);
            }
            Self::Camera(c) => c.hash_into(h),
        }
    }
}

impl From<MeshPrimitive> for Object {
    fn from(m: MeshPrimitive) -> Self {
        Self::Mesh(m)
    }
}

impl From<CurvesPrimitive> for Object {
    fn from(c: CurvesPrimitive) -> Self {
        Self::Curves(c)
    }
}

impl From<PointsPrimitive> for Object {
    fn from(p: PointsPrimitive) -> Self {
        Self::Points(p)
    }
}

impl From<VolumeObject> for Object {
    fn from(v: VolumeObject) -> Self {
        Self::Volume(v)
    }
}

impl From<ExternalProcedural> for Object {
    fn from(p: ExternalProcedural) -> Self {
        Self::ExternalProcedural(p)
    }
}

impl From<CameraData> for Object {
    fn from(c: CameraData) -> Self {
        Self::Camera(c)
    }
}
