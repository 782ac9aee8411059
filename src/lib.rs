//! # Prism
//!
//! A renderer back-end translation layer: it receives a renderer-agnostic
//! scene description through the [`SceneRenderer`] interface and maintains
//! the equivalent native scene graph, sharing identical geometry and shader
//! graphs, applying incremental edits in place where the native renderer
//! allows it, and expanding procedurals into isolated child scopes.
//!
//! The workspace is split into three crates, all re-exported here:
//!
//! - [`core`]: values, content hashing, errors and the message channel
//! - [`scene`]: the renderer-agnostic scene description and interface traits
//! - [`render`]: the translation layer and the [`Renderer`] facade

pub use prism_core as core;
pub use prism_render as render;
pub use prism_scene as scene;

pub use glam;

pub use prism_core::{CompoundData, Data, Message, MessageHandler, PrismError, RenderError, Result, Severity};
pub use prism_render::{
    AttributesBundle, NodeLifetime, RecordingDriver, RenderDriver, RenderMode, RenderState, Renderer,
    RendererSettings, Universe,
};
pub use prism_scene::{
    AttributesHandle, CameraData, Dictionary, Object, ObjectInterface, ObjectInterfacePtr, Output, Procedural,
    SceneRenderer, ShaderNetwork, Value,
};
