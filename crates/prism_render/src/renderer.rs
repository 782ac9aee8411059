//! Renderer
//!
//! The [`SceneRenderer`] the host talks to. It owns the native universe, the
//! top-level [`SceneContext`], the [`Globals`] and the [`RenderDriver`], and
//! drives the render state machine:
//!
//! ```text
//! Configuring ──render()──▶ Rendering ──(batch done)──▶ Finished
//!                              ▲   │
//!                     render() │   │ pause()        (interactive only)
//!                              │   ▼
//!                             Paused
//! ```
//!
//! # Render modes
//!
//! - [`RenderMode::Batch`]: one blocking render per distinct output camera.
//! - [`RenderMode::SceneDescription`]: the universe is written to the
//!   configured file instead.
//! - [`RenderMode::Interactive`]: the first `render()` starts a progressive
//!   session; later calls interrupt it (blocking) if it is running and
//!   resume it with the accumulated samples preserved, including after
//!   `pause()`.

use std::sync::Arc;

use parking_lot::Mutex;
use prism_core::{CompoundData, Data, RenderError, Result};
use prism_scene::{
    AttributesHandle, CameraData, Dictionary, Object, ObjectInterfacePtr, Output, SceneRenderer, Value,
};

use crate::context::SceneContext;
use crate::globals::{Globals, RenderPass};
use crate::native::{DriverMode, InterruptMode, RecordingDriver, RenderDriver, RenderStatus, Universe};
use crate::registry::Registry;
use crate::scope::NodeScope;
use crate::settings::{RenderMode, RendererSettings};

const CONTEXT: &str = "prism::Renderer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Configuring,
    Rendering,
    Paused,
    Finished,
}

pub struct Renderer {
    settings: RendererSettings,
    context: Arc<SceneContext>,
    globals: Globals,
    driver: Arc<dyn RenderDriver>,
    state: Mutex<RenderState>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("mode", &self.settings.mode)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// A renderer over the built-in registry, rendering through a
    /// [`RecordingDriver`].
    pub fn new(settings: RendererSettings) -> Result<Self> {
        Self::with_registry(settings, Registry::with_builtins())
    }

    pub fn with_registry(settings: RendererSettings, registry: Registry) -> Result<Self> {
        Self::with_driver(settings, registry, Arc::new(RecordingDriver::new()))
    }

    pub fn with_driver(settings: RendererSettings, registry: Registry, driver: Arc<dyn RenderDriver>) -> Result<Self> {
        let scope = NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(registry),
            settings.messages.clone(),
            settings.lifetime(),
        );
        let context = SceneContext::new(scope);
        let globals = Globals::new(context.clone())?;
        log::debug!(
            "Created {:?} renderer with {:?} node lifetime",
            settings.mode,
            settings.lifetime()
        );

        Ok(Self {
            settings,
            context,
            globals,
            driver,
            state: Mutex::new(RenderState::Configuring),
        })
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn universe(&self) -> &Arc<Universe> {
        self.context.scope().universe()
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Arc<SceneContext> {
        &self.context
    }

    #[inline]
    #[must_use]
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    #[inline]
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn RenderDriver> {
        &self.driver
    }

    #[must_use]
    pub fn render_state(&self) -> RenderState {
        *self.state.lock()
    }

    // ========================================================================
    // Render control
    // ========================================================================

    fn render_batch(&self) -> Result<()> {
        let passes = self.globals.passes(true)?;
        *self.state.lock() = RenderState::Rendering;

        let result = passes.iter().try_for_each(|pass| {
            log::info!(
                "Rendering camera \"{}\" into {} output(s)",
                pass.camera.name(),
                pass.outputs.len()
            );
            self.globals.prepare(pass);
            check(self.driver.render(self.universe(), DriverMode::Batch), pass)
        });

        *self.state.lock() = if result.is_ok() {
            RenderState::Finished
        } else {
            RenderState::Configuring
        };
        result
    }

    fn render_interactive(&self) -> Result<()> {
        // A paused session resumes from its samples just like a running one.
        let resuming = matches!(*self.state.lock(), RenderState::Rendering | RenderState::Paused);
        if self.driver.is_rendering() {
            self.driver.interrupt(InterruptMode::Blocking);
        }

        let passes = self.globals.passes(false)?;
        let Some(pass) = passes.first() else {
            return Err(RenderError::NoOutputs.into());
        };
        self.globals.prepare(pass);
        let status = self.driver.render(
            self.universe(),
            DriverMode::Interactive {
                preserve_samples: resuming,
            },
        );
        check(status, pass)?;

        *self.state.lock() = RenderState::Rendering;
        Ok(())
    }

    fn write_scene(&self) -> Result<()> {
        let Some(path) = &self.settings.file_name else {
            return Err(RenderError::Failed("no file name set for the scene description".into()).into());
        };

        let passes = self.globals.passes(false)?;
        if let Some(pass) = passes.first() {
            self.globals.prepare(pass);
        }
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        self.driver.write_scene(self.universe(), path)?;
        log::info!("Wrote scene description to {}", path.display());

        *self.state.lock() = RenderState::Finished;
        Ok(())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn cache_stats(&self) -> Data {
        CompoundData::new()
            .with("shaders", self.context.shaders().len() as i32)
            .with("instances", self.context.instances().len() as i32)
            .with("nodes", self.universe().node_count() as i32)
            .into()
    }

    fn clear_unused(&self) -> Option<Data> {
        if self.driver.is_rendering() {
            self.settings
                .messages
                .warning(CONTEXT, "prism:clearUnused cannot run while rendering");
            return None;
        }
        let (shaders, instances) = self.context.clear_unused();
        let options = self.globals.clear_unused();
        log::debug!("Cleared {shaders} shader(s), {instances} instance(s) and {options} option shader(s)");
        Some(
            CompoundData::new()
                .with("shaders", (shaders + options) as i32)
                .with("instances", instances as i32)
                .into(),
        )
    }
}

/// Maps a driver status onto the render error taxonomy.
fn check(status: RenderStatus, pass: &RenderPass) -> Result<()> {
    let error = match status {
        RenderStatus::Succeeded => return Ok(()),
        RenderStatus::Interrupted => RenderError::Interrupted,
        RenderStatus::Aborted => RenderError::Aborted,
        RenderStatus::NoCamera => RenderError::NoCamera(pass.camera.name().to_string()),
        RenderStatus::NoOutputs => RenderError::NoOutputs,
        RenderStatus::Failed(text) => RenderError::Failed(text),
    };
    Err(error.into())
}

impl SceneRenderer for Renderer {
    fn name(&self) -> &str {
        "prism"
    }

    fn option(&self, name: &str, value: Option<&Value>) {
        self.globals.option(name, value);
    }

    fn output(&self, name: &str, output: Option<&Output>) -> Result<()> {
        self.globals.output(name, output)
    }

    fn attributes(&self, attributes: &Dictionary) -> AttributesHandle {
        self.context.attributes(attributes)
    }

    fn camera(&self, name: &str, camera: &CameraData, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        let camera = self.context.camera(name, camera, attributes)?;
        self.globals.register_camera(&camera);
        Ok(camera)
    }

    fn light(&self, name: &str, object: Option<&Object>, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        self.context.light(name, object, attributes)
    }

    fn light_filter(&self, name: &str, object: Option<&Object>, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        self.context.light_filter(name, object, attributes)
    }

    fn object(&self, name: &str, object: &Object, attributes: &AttributesHandle) -> Result<ObjectInterfacePtr> {
        self.context.object(name, object, attributes)
    }

    fn object_samples(
        &self,
        name: &str,
        samples: &[Object],
        times: &[f32],
        attributes: &AttributesHandle,
    ) -> Result<ObjectInterfacePtr> {
        self.context.object_samples(name, samples, times, attributes)
    }

    fn render(&self) -> Result<()> {
        match self.settings.mode {
            RenderMode::Batch => self.render_batch(),
            RenderMode::SceneDescription => self.write_scene(),
            RenderMode::Interactive => self.render_interactive(),
        }
    }

    fn pause(&self) {
        if self.driver.is_rendering() {
            self.driver.interrupt(InterruptMode::Blocking);
        }
        let mut state = self.state.lock();
        if *state == RenderState::Rendering {
            *state = RenderState::Paused;
        }
    }

    fn command(&self, name: &str, _parameters: &CompoundData) -> Option<Data> {
        match name {
            "prism:cacheStats" => Some(self.cache_stats()),
            "prism:nodeCount" => Some(Data::Int(self.universe().node_count() as i32)),
            "prism:clearUnused" => self.clear_unused(),
            _ => {
                self.settings
                    .messages
                    .warning(CONTEXT, format!("Unknown command \"{name}\""));
                None
            }
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if self.driver.is_rendering() {
            self.driver.interrupt(InterruptMode::Blocking);
        }
        self.globals.clear();
        self.context.clear();
        self.universe().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::NodeLifetime;

    fn renderer(mode: RenderMode) -> (Renderer, Arc<RecordingDriver>) {
        let driver = Arc::new(RecordingDriver::new());
        let settings = RendererSettings {
            mode,
            ..Default::default()
        };
        let renderer = Renderer::with_driver(settings, Registry::with_builtins(), driver.clone()).unwrap();
        (renderer, driver)
    }

    #[test]
    fn test_interactive_lifetime_is_eager() {
        let (r, _) = renderer(RenderMode::Interactive);
        assert_eq!(r.context().scope().lifetime(), NodeLifetime::Eager);
    }

    #[test]
    fn test_batch_renders_default_camera() {
        let (r, driver) = renderer(RenderMode::Batch);
        r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
        r.render().unwrap();

        let invocations = driver.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].camera.as_deref(), Some(crate::globals::DEFAULT_CAMERA));
        assert_eq!(invocations[0].resolution, (640, 480));
        assert_eq!(r.render_state(), RenderState::Finished);
    }

    #[test]
    fn test_status_mapping() {
        let (r, driver) = renderer(RenderMode::Batch);
        r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
        driver.fail_next(RenderStatus::Aborted);
        assert!(matches!(
            r.render(),
            Err(prism_core::PrismError::Render(RenderError::Aborted))
        ));
        assert_eq!(r.render_state(), RenderState::Configuring);
    }

    #[test]
    fn test_no_outputs() {
        let (r, _) = renderer(RenderMode::Batch);
        assert!(matches!(
            r.render(),
            Err(prism_core::PrismError::Render(RenderError::NoOutputs))
        ));
    }

    #[test]
    fn test_commands() {
        let (r, _) = renderer(RenderMode::Batch);
        let stats = r.command("prism:cacheStats", &CompoundData::new()).unwrap();
        let stats = stats.as_compound().unwrap();
        assert_eq!(stats.get_i32("shaders", -1), 0);
        // The options node.
        assert_eq!(stats.get_i32("nodes", -1), 1);

        assert_eq!(r.command("prism:nodeCount", &CompoundData::new()), Some(Data::Int(1)));
        assert!(r.command("prism:clearUnused", &CompoundData::new()).is_some());
        assert_eq!(r.command("teapot", &CompoundData::new()), None);
    }
}
