//! Render Driver
//!
//! The small command surface through which the translation layer hands the
//! finished scene graph to the renderer's execution engine: render, interrupt
//! and scene-description export. The execution engine itself is a black box.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use prism_core::Result;

use super::builtin::REGION_UNSET;
use super::universe::Universe;
use super::value::ParamValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverMode {
    /// Render to completion before returning.
    Batch,
    /// Start (or restart) a persistent progressive session and return.
    Interactive {
        /// Keep accumulated samples from the previous session.
        preserve_samples: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    /// Returns once the renderer has stopped.
    Blocking,
    /// Requests a stop and returns immediately.
    Async,
}

/// Outcome reported by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    Succeeded,
    Interrupted,
    Aborted,
    NoCamera,
    NoOutputs,
    Failed(String),
}

pub trait RenderDriver: Send + Sync {
    fn render(&self, universe: &Universe, mode: DriverMode) -> RenderStatus;

    fn interrupt(&self, mode: InterruptMode);

    fn is_rendering(&self) -> bool;

    /// Writes a scene description to `path`.
    fn write_scene(&self, universe: &Universe, path: &Path) -> Result<()> {
        write_json_snapshot(universe, path)
    }
}

/// Writes [`Universe::snapshot`] as pretty-printed JSON.
pub fn write_json_snapshot(universe: &Universe, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &universe.snapshot())?;
    Ok(())
}

// ============================================================================
// RecordingDriver
// ============================================================================

/// One recorded `render` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInvocation {
    pub mode: DriverMode,
    pub camera: Option<String>,
    /// Entries of the options `outputs` array.
    pub outputs: Vec<String>,
    pub resolution: (i32, i32),
    /// `(min_x, min_y, max_x, max_y)` when a region is set.
    pub region: Option<[i32; 4]>,
}

#[derive(Debug, Default)]
struct Recording {
    invocations: Vec<RenderInvocation>,
    interrupts: Vec<InterruptMode>,
    scenes: Vec<PathBuf>,
    rendering: bool,
    next_status: Option<RenderStatus>,
}

/// A driver that renders nothing and records everything.
///
/// It validates the options node the way a real renderer would (camera and
/// outputs must be present) and keeps an interactive session flag so render
/// control can be observed end to end.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    state: Mutex<Recording>,
}

impl RecordingDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next render report `status` instead of rendering.
    pub fn fail_next(&self, status: RenderStatus) {
        self.state.lock().next_status = Some(status);
    }

    #[must_use]
    pub fn invocations(&self) -> Vec<RenderInvocation> {
        self.state.lock().invocations.clone()
    }

    #[must_use]
    pub fn interrupts(&self) -> Vec<InterruptMode> {
        self.state.lock().interrupts.clone()
    }

    #[must_use]
    pub fn scenes(&self) -> Vec<PathBuf> {
        self.state.lock().scenes.clone()
    }

    fn record(universe: &Universe, mode: DriverMode) -> std::result::Result<RenderInvocation, RenderStatus> {
        let options = universe
            .lookup("options", None)
            .ok_or_else(|| RenderStatus::Failed("no options node".into()))?;

        let int = |name: &str| universe.param(options, name).and_then(|v| v.as_int()).unwrap_or(0);

        let camera = universe
            .param(options, "camera")
            .and_then(|v| v.as_node())
            .and_then(|key| universe.name(key))
            .ok_or(RenderStatus::NoCamera)?;

        let outputs: Vec<String> = universe
            .param(options, "outputs")
            .map(|v| {
                v.elements()
                    .iter()
                    .filter_map(ParamValue::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if outputs.is_empty() {
            return Err(RenderStatus::NoOutputs);
        }

        let region = [
            int("region_min_x"),
            int("region_min_y"),
            int("region_max_x"),
            int("region_max_y"),
        ];

        Ok(RenderInvocation {
            mode,
            camera: Some(camera),
            outputs,
            resolution: (int("xres"), int("yres")),
            region: region.iter().all(|&r| r != REGION_UNSET).then_some(region),
        })
    }
}

impl RenderDriver for RecordingDriver {
    fn render(&self, universe: &Universe, mode: DriverMode) -> RenderStatus {
        if let Some(status) = self.state.lock().next_status.take() {
            return status;
        }

        let invocation = match Self::record(universe, mode) {
            Ok(invocation) => invocation,
            Err(status) => return status,
        };
        log::trace!(
            "RecordingDriver: {:?} render of camera {:?} into {} output(s)",
            invocation.mode,
            invocation.camera,
            invocation.outputs.len()
        );

        let mut state = self.state.lock();
        state.rendering = matches!(mode, DriverMode::Interactive { .. });
        state.invocations.push(invocation);
        RenderStatus::Succeeded
    }

    fn interrupt(&self, mode: InterruptMode) {
        let mut state = self.state.lock();
        state.interrupts.push(mode);
        state.rendering = false;
    }

    fn is_rendering(&self) -> bool {
        self.state.lock().rendering
    }

    fn write_scene(&self, universe: &Universe, path: &Path) -> Result<()> {
        write_json_snapshot(universe, path)?;
        self.state.lock().scenes.push(path.to_path_buf());
        Ok(())
    }
}
