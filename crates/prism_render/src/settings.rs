//! Renderer Settings
//!
//! Construction-time configuration of a [`Renderer`](crate::Renderer).
//! Everything that can change while a scene is being described arrives later
//! through `option()` instead.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use prism_render::{RenderMode, Renderer, RendererSettings};
//!
//! // Batch rendering with the default recording driver
//! let renderer = Renderer::new(RendererSettings::default());
//!
//! // Live editing session
//! let renderer = Renderer::new(RendererSettings {
//!     mode: RenderMode::Interactive,
//!     ..Default::default()
//! });
//! ```

use std::path::PathBuf;

use prism_core::MessageHandler;

/// How `render()` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// One blocking render per distinct output camera.
    #[default]
    Batch,
    /// Write the scene graph to [`RendererSettings::file_name`] instead of
    /// rendering.
    SceneDescription,
    /// A persistent progressive session that is interrupted and restarted
    /// around edits.
    Interactive,
}

impl RenderMode {
    /// The node ownership policy this mode uses unless overridden.
    #[inline]
    #[must_use]
    pub fn default_lifetime(self) -> NodeLifetime {
        match self {
            Self::Batch | Self::SceneDescription => NodeLifetime::Arena,
            Self::Interactive => NodeLifetime::Eager,
        }
    }
}

/// Ownership policy for native nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLifetime {
    /// Nodes live until the renderer is dropped. Releasing a handle is free.
    Arena,
    /// Nodes are destroyed as soon as their last owner is released.
    Eager,
}

#[derive(Debug, Clone, Default)]
pub struct RendererSettings {
    pub mode: RenderMode,
    /// Destination of the scene description in
    /// [`RenderMode::SceneDescription`].
    pub file_name: Option<PathBuf>,
    /// Where warnings and diagnostics are delivered.
    pub messages: MessageHandler,
    /// Overrides [`RenderMode::default_lifetime`].
    pub lifetime: Option<NodeLifetime>,
}

impl RendererSettings {
    #[must_use]
    pub fn lifetime(&self) -> NodeLifetime {
        self.lifetime.unwrap_or_else(|| self.mode.default_lifetime())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetime_follows_mode() {
        assert_eq!(RendererSettings::default().lifetime(), NodeLifetime::Arena);
        let interactive = RendererSettings {
            mode: RenderMode::Interactive,
            ..Default::default()
        };
        assert_eq!(interactive.lifetime(), NodeLifetime::Eager);
        let overridden = RendererSettings {
            lifetime: Some(NodeLifetime::Eager),
            ..Default::default()
        };
        assert_eq!(overridden.lifetime(), NodeLifetime::Eager);
    }
}
