//! Geometric Primitives
//!
//! Renderer-agnostic geometry: meshes, curves, points, volumes and file-based
//! procedurals. Every primitive carries a set of named
//! [`PrimitiveVariable`]s; the position variable is always `P`.

use std::collections::BTreeMap;

use glam::Vec3;
use prism_core::{CompoundData, ContentHash, ContentHasher, Data};

/// How a primitive variable maps onto the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Constant,
    Uniform,
    Vertex,
    Varying,
    FaceVarying,
}

impl Interpolation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Uniform => "uniform",
            Self::Vertex => "vertex",
            Self::Varying => "varying",
            Self::FaceVarying => "facevarying",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveVariable {
    pub interpolation: Interpolation,
    pub data: Data,
    /// Optional index buffer (indexed face-varying UVs etc).
    pub indices: Option<Vec<i32>>,
}

impl PrimitiveVariable {
    #[must_use]
    pub fn new(interpolation: Interpolation, data: impl Into<Data>) -> Self {
        Self {
            interpolation,
            data: data.into(),
            indices: None,
        }
    }
}

impl ContentHash for PrimitiveVariable {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str(self.interpolation.as_str());
        self.data.hash_into(h);
        self.indices.hash_into(h);
    }
}

/// Named primitive variables, ordered for stable hashing.
pub type PrimitiveVariables = BTreeMap<String, PrimitiveVariable>;

fn hash_variables(variables: &PrimitiveVariables, h: &mut ContentHasher) {
    h.write_usize(variables.len());
    for (name, var) in variables {
        h.write_str(name);
        var.hash_into(h);
    }
}

fn positions(variables: &PrimitiveVariables) -> Option<&[Vec3]> {
    match &variables.get("P")?.data {
        Data::V3fVector(p) => Some(p),
        _ => None,
    }
}

// ============================================================================
// Mesh
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeshInterpolation {
    #[default]
    Linear,
    CatmullClark,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshPrimitive {
    pub vertices_per_face: Vec<i32>,
    pub vertex_ids: Vec<i32>,
    pub interpolation: MeshInterpolation,
    pub variables: PrimitiveVariables,
}

impl MeshPrimitive {
    #[must_use]
    pub fn new(vertices_per_face: Vec<i32>, vertex_ids: Vec<i32>, points: Vec<Vec3>) -> Self {
        let mut variables = PrimitiveVariables::new();
        variables.insert("P".into(), PrimitiveVariable::new(Interpolation::Vertex, points));
        Self {
            vertices_per_face,
            vertex_ids,
            interpolation: MeshInterpolation::Linear,
            variables,
        }
    }

    /// A unit quad in the XY plane, centred on the origin.
    #[must_use]
    pub fn plane() -> Self {
        Self::new(
            vec![4],
            vec![0, 1, 2, 3],
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
        )
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: MeshInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[must_use]
    pub fn positions(&self) -> Option<&[Vec3]> {
        positions(&self.variables)
    }

    #[must_use]
    pub fn num_faces(&self) -> usize {
        self.vertices_per_face.len()
    }
}

impl ContentHash for MeshPrimitive {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str("MeshPrimitive");
        self.vertices_per_face.hash_into(h);
        self.vertex_ids.hash_into(h);
        h.write_bool(self.interpolation == MeshInterpolation::CatmullClark);
        hash_variables(&self.variables, h);
    }
}

// ============================================================================
// Curves
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurvesBasis {
    #[default]
    Linear,
    Bezier,
    BSpline,
    CatmullRom,
}

impl CurvesBasis {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Bezier => "bezier",
            Self::BSpline => "b-spline",
            Self::CatmullRom => "catmull-rom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurvesPrimitive {
    pub vertices_per_curve: Vec<i32>,
    pub basis: CurvesBasis,
    pub periodic: bool,
    pub variables: PrimitiveVariables,
}

impl CurvesPrimitive {
    #[must_use]
    pub fn new(vertices_per_curve: Vec<i32>, basis: CurvesBasis, points: Vec<Vec3>) -> Self {
        let mut variables = PrimitiveVariables::new();
        variables.insert("P".into(), PrimitiveVariable::new(Interpolation::Vertex, points));
        Self {
            vertices_per_curve,
            basis,
            periodic: false,
            variables,
        }
    }

    #[must_use]
    pub fn positions(&self) -> Option<&[Vec3]> {
        positions(&self.variables)
    }
}

impl ContentHash for CurvesPrimitive {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str("CurvesPrimitive");
        self.vertices_per_curve.hash_into(h);
        h.write_str(self.basis.as_str());
        h.write_bool(self.periodic);
        hash_variables(&self.variables, h);
    }
}

// ============================================================================
// Points
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointsPrimitive {
    pub variables: PrimitiveVariables,
}

impl PointsPrimitive {
    #[must_use]
    pub fn new(points: Vec<Vec3>) -> Self {
        let mut variables = PrimitiveVariables::new();
        variables.insert("P".into(), PrimitiveVariable::new(Interpolation::Vertex, points));
        Self { variables }
    }

    #[must_use]
    pub fn with_width(mut self, width: f32) -> Self {
        self.variables
            .insert("width".into(), PrimitiveVariable::new(Interpolation::Constant, width));
        self
    }

    #[must_use]
    pub fn positions(&self) -> Option<&[Vec3]> {
        positions(&self.variables)
    }
}

impl ContentHash for PointsPrimitive {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str("PointsPrimitive");
        hash_variables(&self.variables, h);
    }
}

// ============================================================================
// Volume / External procedural
// ============================================================================

/// A file-backed volume (e.g. VDB).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VolumeObject {
    pub file_name: String,
    pub grids: Vec<String>,
    pub parameters: CompoundData,
}

impl VolumeObject {
    #[must_use]
    pub fn new(file_name: impl Into<String>, grids: Vec<String>) -> Self {
        Self {
            file_name: file_name.into(),
            grids,
            parameters: CompoundData::new(),
        }
    }
}

impl ContentHash for VolumeObject {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str("VolumeObject");
        h.write_str(&self.file_name);
        self.grids.hash_into(h);
        self.parameters.hash_into(h);
    }
}

/// A procedural loaded by the renderer itself from a file (archives,
/// plugin DSOs). The renderer instances these natively.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExternalProcedural {
    pub file_name: String,
    pub bound_min: Vec3,
    pub bound_max: Vec3,
    pub parameters: CompoundData,
}

impl ExternalProcedural {
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bound_min: Vec3::splat(-1.0),
            bound_max: Vec3::splat(1.0),
            parameters: CompoundData::new(),
        }
    }
}

impl ContentHash for ExternalProcedural {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str("ExternalProcedural");
        h.write_str(&self.file_name);
        self.bound_min.hash_into(h);
        self.bound_max.hash_into(h);
        self.parameters.hash_into(h);
    }
}
