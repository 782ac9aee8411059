//! Native Scene Graph
//!
//! An in-memory model of the target renderer's scene graph.
//!
//! # Overview
//!
//! - [`Universe`]: the thread-safe node arena every translated entity lives in
//! - [`NodeEntry`]: the schema of a node type (its kind and declared parameters)
//! - [`ParamValue`]: typed parameter values, including motion-keyed arrays
//! - [`RenderDriver`]: the small command surface that executes a render
//!
//! The translation layer only ever talks to the renderer through these types,
//! so everything above this module can be exercised without a real renderer.

mod builtin;
mod driver;
mod entry;
mod universe;
mod value;

pub use builtin::{REGION_UNSET, builtin_entries};
pub use driver::{
    DriverMode, InterruptMode, RecordingDriver, RenderDriver, RenderInvocation, RenderStatus,
    write_json_snapshot,
};
pub use entry::{EntryBuilder, EntryKind, NodeEntry, ParamDecl, ShapeKind};
pub use universe::{NodeSnapshot, ProceduralNodes, SnapshotValue, Universe, UniverseSnapshot};
pub use value::{ParamError, ParamType, ParamValue};

use slotmap::new_key_type;

new_key_type! {
    /// Identity of a node inside a [`Universe`].
    pub struct NodeKey;
}
