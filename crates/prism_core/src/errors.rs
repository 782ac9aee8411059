//! Error Types
//!
//! This module defines the error types used throughout Prism.
//!
//! # Overview
//!
//! The main error type [`PrismError`] follows the translation layer's failure
//! taxonomy:
//! - **Data errors** abort the conversion of a single entity
//! - **Configuration errors** that cannot be skipped (bad output drivers)
//! - **Renderer errors** surfaced at the render-invocation boundary as [`RenderError`]
//!
//! Incompatible edits are *not* errors: mutating calls return `false` so the
//! caller can rebuild the entity. Recoverable configuration problems are
//! reported as warnings through the message channel instead.
//!
//! ```rust,ignore
//! use prism_core::errors::{PrismError, Result};
//!
//! fn convert() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for Prism.
#[derive(Error, Debug)]
pub enum PrismError {
    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Required geometric data is absent (e.g. no `P` primitive variable).
    #[error("{context}: missing required data \"{name}\"")]
    MissingData {
        /// The entity or object being converted
        context: String,
        /// Name of the missing item
        name: String,
    },

    /// Motion sample times are not uniformly spaced.
    #[error("Motion sample times {times:?} are not uniformly spaced")]
    NonUniformSamples {
        /// The offending sample times
        times: Vec<f32>,
    },

    /// Time samples disagree in type or topology.
    #[error("Mismatched motion samples: {0}")]
    SampleMismatch(String),

    /// The number of samples does not match the number of sample times.
    #[error("Expected {times} samples but got {samples}")]
    SampleCountMismatch {
        /// Number of samples supplied
        samples: usize,
        /// Number of sample times supplied
        times: usize,
    },

    /// No converter is registered for this object type.
    #[error("Unsupported object type: {0}")]
    UnsupportedObject(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Output refers to a driver type with no native node entry.
    #[error("Output \"{output}\": unknown driver type \"{driver}\"")]
    UnknownDriver {
        /// Output name
        output: String,
        /// Requested driver type
        driver: String,
    },

    /// Output refers to a pixel filter with no native node entry.
    #[error("Output \"{output}\": unknown filter type \"{filter}\"")]
    UnknownFilter {
        /// Output name
        output: String,
        /// Requested filter type
        filter: String,
    },

    /// Output `data` is not one of the recognized channel forms.
    #[error("Output \"{output}\": unable to parse data \"{data}\"")]
    InvalidOutputData {
        /// Output name
        output: String,
        /// The unparsed data string
        data: String,
    },

    /// A native node type is not registered.
    #[error("Unknown node type \"{0}\"")]
    UnknownNodeType(String),

    // ========================================================================
    // Renderer Errors
    // ========================================================================
    /// Fatal error reported by the native renderer.
    #[error(transparent)]
    Render(#[from] RenderError),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Closed set of fatal renderer outcomes mapped at the `render()` boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The selected camera does not exist.
    #[error("Camera \"{0}\" does not exist")]
    NoCamera(String),

    /// Nothing to render into.
    #[error("No outputs defined")]
    NoOutputs,

    /// The render was aborted by the renderer.
    #[error("Render aborted")]
    Aborted,

    /// The render was interrupted by the user.
    #[error("Render interrupted")]
    Interrupted,

    /// Any other renderer-reported failure.
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;
