//! # Prism Scene
//!
//! The renderer-agnostic side of the translation layer:
//!
//! - [`ShaderNetwork`]: DAG of shaders with parameter connections
//! - [`Object`]: geometry, volumes, procedurals and cameras
//! - [`CameraData`] / [`Output`]: render camera and render target descriptions
//! - [`Value`] / [`Dictionary`]: attribute and option values
//! - [`SceneRenderer`] and friends: the interface a renderer backend implements
//!
//! Nothing in this crate knows about a specific renderer.

pub mod camera;
pub mod motion;
pub mod object;
pub mod output;
pub mod primitive;
pub mod renderer;
pub mod shader_network;
pub mod value;

pub use camera::{CameraData, Projection};
pub use motion::{SampleTimes, check_sample_count, ensure_uniform_samples};
pub use object::{Object, ObjectKind};
pub use output::Output;
pub use primitive::{
    CurvesBasis, CurvesPrimitive, ExternalProcedural, Interpolation, MeshInterpolation,
    MeshPrimitive, PointsPrimitive, PrimitiveVariable, PrimitiveVariables, VolumeObject,
};
pub use renderer::{
    AttributesHandle, AttributesInterface, ObjectInterface, ObjectInterfacePtr, ObjectSet,
    Procedural, SceneRenderer,
};
pub use shader_network::{Connection, Parameter, Shader, ShaderNetwork};
pub use value::{Dictionary, Value};
