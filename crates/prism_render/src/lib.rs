//! # Prism Render
//!
//! Translates a renderer-agnostic scene description into a native renderer
//! scene graph and keeps the two in sync under incremental edits.
//!
//! ## Layers
//!
//! - [`native`]: the native scene graph ([`Universe`]), node schemas and the
//!   [`RenderDriver`] boundary
//! - [`Registry`]: node entries, object converters and light update policy
//! - [`ShaderCache`] / [`InstanceCache`]: content-addressed sharing of shader
//!   graphs and geometry masters
//! - [`AttributesBundle`]: parsed, immutable attribute state
//! - [`objects`]: the entity handles returned to the host
//! - [`procedural`]: nested expansion of procedurals
//! - [`Globals`] / [`Renderer`]: options, outputs, cameras and render control
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use prism_render::{Renderer, RendererSettings};
//! use prism_scene::{Dictionary, MeshPrimitive, Output, SceneRenderer};
//!
//! let renderer = Renderer::new(RendererSettings::default())?;
//! renderer.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba")))?;
//!
//! let attributes = renderer.attributes(&Dictionary::new());
//! let plane = renderer.object("/plane", &MeshPrimitive::plane().into(), &attributes)?;
//! renderer.render()?;
//! ```

pub mod attributes;
mod cache;
pub mod context;
pub mod convert;
pub mod globals;
pub mod instance_cache;
pub mod native;
pub mod objects;
pub mod output;
pub mod procedural;
pub mod registry;
pub mod renderer;
pub mod scope;
pub mod settings;
pub mod shader_cache;

pub use attributes::{AttributesBundle, Visibility};
pub use context::SceneContext;
pub use convert::ObjectConverter;
pub use globals::{DEFAULT_CAMERA, Globals, LogFlags};
pub use instance_cache::{Instance, InstanceCache};
pub use native::{
    DriverMode, InterruptMode, NodeKey, ParamValue, RecordingDriver, RenderDriver, RenderInvocation,
    RenderStatus, Universe,
};
pub use objects::{CameraHandle, LightFilterHandle, LightHandle, ObjectHandle};
pub use output::{OutputData, OutputNodes};
pub use procedural::{ProceduralRenderer, merge_attributes};
pub use registry::{LightUpdatePolicy, Registry};
pub use renderer::{RenderState, Renderer};
pub use scope::{NodeScope, OwnedNode};
pub use settings::{NodeLifetime, RenderMode, RendererSettings};
pub use shader_cache::{ShaderCache, ShaderHandle};
