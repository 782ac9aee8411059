//! Global Render State
//!
//! Everything render-wide: the native `options` node, the outputs, the
//! camera registry and the frame/camera selection.
//!
//! # Overview
//!
//! - `option()` calls are mapped onto the options node. Option shaders
//!   (color manager, atmosphere, background, imagers, AOV shaders) go
//!   through a private [`ShaderCache`] and are held here for as long as the
//!   option is set.
//! - Resolution, pixel aspect, crop region and shutter are camera data on
//!   the scene side but render-wide on the native side. [`Globals::passes`]
//!   resolves which camera each output renders from and
//!   [`Globals::prepare`] pushes that camera's data into the options node
//!   right before a render invocation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use bitflags::bitflags;
use parking_lot::Mutex;
use prism_core::{Data, PrismError, RenderError, Result};
use prism_scene::{CameraData, Dictionary, Output, ShaderNetwork, Value};
use rustc_hash::FxHashMap;

use crate::context::SceneContext;
use crate::convert::declare_and_set;
use crate::native::{NodeKey, ParamType, ParamValue, REGION_UNSET};
use crate::objects::CameraHandle;
use crate::output::OutputNodes;
use crate::scope::{NodeScope, OwnedNode};
use crate::shader_cache::{ShaderCache, ShaderHandle};

const CONTEXT: &str = "prism::Renderer::option";

/// Name of the camera rendered through when none is selected.
pub const DEFAULT_CAMERA: &str = "prism:defaultCamera";

bitflags! {
    /// Message categories written to the log file and the console.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LogFlags: u32 {
        const INFO     = 1 << 0;
        const WARNINGS = 1 << 1;
        const ERRORS   = 1 << 2;
        const DEBUG    = 1 << 3;
        const STATS    = 1 << 4;
        const PROGRESS = 1 << 5;
    }
}

impl Default for LogFlags {
    fn default() -> Self {
        Self::WARNINGS | Self::ERRORS | Self::PROGRESS
    }
}

impl LogFlags {
    #[must_use]
    pub fn from_option_flag(name: &str) -> Option<Self> {
        Some(match name {
            "info" => Self::INFO,
            "warnings" => Self::WARNINGS,
            "errors" => Self::ERRORS,
            "debug" => Self::DEBUG,
            "stats" => Self::STATS,
            "progress" => Self::PROGRESS,
            _ => return None,
        })
    }
}

/// One render invocation: a camera and the outputs rendered through it.
#[derive(Debug)]
pub struct RenderPass {
    pub camera: Arc<CameraHandle>,
    pub outputs: Vec<String>,
    light_path_expressions: Vec<String>,
}

/// A typed option value, or a request to restore the default.
enum Setting<T> {
    Reset,
    Set(T),
}

#[derive(Default)]
struct GlobalsState {
    frame: i32,
    seed: Option<i32>,
    camera: Option<String>,
    log_flags: LogFlags,
    console_flags: LogFlags,
    /// Option shaders, keyed by options parameter.
    shaders: FxHashMap<&'static str, Arc<ShaderHandle>>,
    aov_shaders: BTreeMap<String, Arc<ShaderHandle>>,
    outputs: BTreeMap<String, OutputNodes>,
    cameras: FxHashMap<String, Weak<CameraHandle>>,
    default_camera: Option<Arc<CameraHandle>>,
}

pub struct Globals {
    context: Arc<SceneContext>,
    options: OwnedNode,
    shaders: ShaderCache,
    state: Mutex<GlobalsState>,
}

impl std::fmt::Debug for Globals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Globals")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Globals {
    pub fn new(context: Arc<SceneContext>) -> Result<Self> {
        let scope = context.scope();
        let options = scope.create("options", "options")?;
        let globals = Self {
            shaders: ShaderCache::with_namespace(scope.clone(), "option"),
            options,
            context,
            state: Mutex::new(GlobalsState::default()),
        };

        globals.set("log_flags", LogFlags::default().bits() as i32);
        globals.set("console_flags", LogFlags::default().bits() as i32);
        Ok(globals)
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> NodeKey {
        self.options.key()
    }

    #[inline]
    fn scope(&self) -> &NodeScope {
        self.context.scope()
    }

    fn set(&self, param: &str, value: impl Into<ParamValue>) {
        self.scope().set(self.options.key(), param, value);
    }

    fn reset(&self, param: &str) {
        self.scope().universe().reset_param(self.options.key(), param);
    }

    fn warn(&self, text: impl Into<String>) {
        self.scope().messages().warning(CONTEXT, text);
    }

    // ========================================================================
    // Options
    // ========================================================================

    pub fn option(&self, name: &str, value: Option<&Value>) {
        let mut state = self.state.lock();
        match name {
            "frame" => {
                let Some(frame) = self.read(name, value, "Int", Data::as_i32) else {
                    return;
                };
                state.frame = match frame {
                    Setting::Set(frame) => frame,
                    Setting::Reset => 0,
                };
                self.set("frame", state.frame as f32);
                if state.seed.is_none() {
                    self.set("AA_seed", state.frame);
                }
            }
            "camera" => {
                let Some(camera) = self.read(name, value, "String", Data::as_str) else {
                    return;
                };
                state.camera = match camera {
                    Setting::Set(camera) if !camera.is_empty() => Some(camera.to_string()),
                    _ => None,
                };
            }
            "sampleMotion" => match self.read(name, value, "Bool", Data::as_bool) {
                Some(Setting::Set(sample)) => self.set("ignore_motion_blur", !sample),
                Some(Setting::Reset) => self.reset("ignore_motion_blur"),
                None => {}
            },
            _ => {
                if let Some(option) = name.strip_prefix("prism:") {
                    self.prism_option(&mut state, name, option, value);
                } else if name.starts_with("user:") {
                    self.declared_option(name, value);
                } else if name.contains(':') {
                    self.scope()
                        .messages()
                        .debug(CONTEXT, format!("Ignoring option \"{name}\" for another renderer"));
                } else {
                    self.warn(format!("Unknown option \"{name}\""));
                }
            }
        }
    }

    fn prism_option(&self, state: &mut GlobalsState, name: &str, option: &str, value: Option<&Value>) {
        match option {
            "AA_seed" => {
                let Some(seed) = self.read(name, value, "Int", Data::as_i32) else {
                    return;
                };
                state.seed = match seed {
                    Setting::Set(seed) => Some(seed),
                    Setting::Reset => None,
                };
                self.set("AA_seed", state.seed.unwrap_or(state.frame));
            }
            "progressive" => self.bool_option(name, value, "enable_progressive_render"),
            "progressive_min_AA_samples" => match self.read(name, value, "Int", Data::as_i32) {
                Some(Setting::Set(samples)) => self.set("progressive_min_AA_samples", samples),
                Some(Setting::Reset) => self.reset("progressive_min_AA_samples"),
                None => {}
            },
            "log:file" => self.file_option(name, value, "log_file"),
            "statisticsFile" => self.file_option(name, value, "stats_file"),
            "profileFileName" => self.file_option(name, value, "profile_file"),
            "color_manager" => self.shader_option(state, name, value, "color_manager"),
            "atmosphere" => self.shader_option(state, name, value, "atmosphere"),
            "background" => self.shader_option(state, name, value, "background"),
            "imager" => self.shader_option(state, name, value, "imagers"),
            _ => {
                if let Some(flag) = option.strip_prefix("log:") {
                    self.flag_option(name, value, flag, &mut state.log_flags, "log_flags");
                } else if let Some(flag) = option.strip_prefix("console:") {
                    self.flag_option(name, value, flag, &mut state.console_flags, "console_flags");
                } else if let Some(aov) = option.strip_prefix("aov_shader:") {
                    self.aov_shader_option(state, name, aov, value);
                } else if let Some(param) = option.strip_prefix("declare:") {
                    self.declared_option(param, value);
                } else if self.options_declares(option) {
                    self.native_option(name, option, value);
                } else {
                    self.warn(format!("Unknown option \"{name}\""));
                }
            }
        }
    }

    /// Reads an option value, warning when it has the wrong type.
    fn read<'a, T>(
        &self,
        name: &str,
        value: Option<&'a Value>,
        expected: &str,
        extract: impl FnOnce(&'a Data) -> Option<T>,
    ) -> Option<Setting<T>> {
        let Some(value) = value else {
            return Some(Setting::Reset);
        };
        let extracted = value.as_data().and_then(extract);
        if extracted.is_none() {
            self.warn(format!(
                "Option \"{name}\" expects {expected}, not {}",
                value.type_name()
            ));
        }
        extracted.map(Setting::Set)
    }

    fn bool_option(&self, name: &str, value: Option<&Value>, param: &str) {
        match self.read(name, value, "Bool", Data::as_bool) {
            Some(Setting::Set(b)) => self.set(param, b),
            Some(Setting::Reset) => self.reset(param),
            None => {}
        }
    }

    fn file_option(&self, name: &str, value: Option<&Value>, param: &str) {
        match self.read(name, value, "String", Data::as_str) {
            Some(Setting::Set(path)) => {
                if let Some(dir) = Path::new(path).parent()
                    && !dir.as_os_str().is_empty()
                    && let Err(e) = std::fs::create_dir_all(dir)
                {
                    self.warn(format!("Unable to create directory \"{}\" : {e}", dir.display()));
                }
                self.set(param, path);
            }
            Some(Setting::Reset) => self.reset(param),
            None => {}
        }
    }

    fn flag_option(&self, name: &str, value: Option<&Value>, flag: &str, flags: &mut LogFlags, param: &str) {
        let Some(bit) = LogFlags::from_option_flag(flag) else {
            self.warn(format!("Unknown option \"{name}\""));
            return;
        };
        let enabled = match self.read(name, value, "Bool", Data::as_bool) {
            Some(Setting::Set(enabled)) => enabled,
            Some(Setting::Reset) => LogFlags::default().contains(bit),
            None => return,
        };
        flags.set(bit, enabled);
        self.set(param, flags.bits() as i32);
    }

    fn network<'a>(&self, name: &str, value: Option<&'a Value>) -> Option<Setting<&'a ShaderNetwork>> {
        match value {
            None => Some(Setting::Reset),
            Some(Value::ShaderNetwork(network)) => Some(Setting::Set(network.as_ref())),
            Some(other) => {
                self.warn(format!(
                    "Option \"{name}\" expects a ShaderNetwork, not {}",
                    other.type_name()
                ));
                None
            }
        }
    }

    fn shader_option(&self, state: &mut GlobalsState, name: &str, value: Option<&Value>, param: &'static str) {
        let network = match self.network(name, value) {
            Some(Setting::Set(network)) => network,
            Some(Setting::Reset) => {
                state.shaders.remove(param);
                self.reset(param);
                return;
            }
            None => return,
        };
        match self.shaders.get(network, None) {
            Ok(shader) => {
                self.set(param, shader.root());
                state.shaders.insert(param, shader);
            }
            Err(e) => self.warn(format!("Unable to convert \"{name}\" : {e}")),
        }
    }

    fn aov_shader_option(&self, state: &mut GlobalsState, name: &str, aov: &str, value: Option<&Value>) {
        let Some(network) = self.network(name, value) else {
            return;
        };
        match network {
            Setting::Set(network) => match self.shaders.get(network, None) {
                Ok(shader) => {
                    state.aov_shaders.insert(aov.to_string(), shader);
                }
                Err(e) => {
                    self.warn(format!("Unable to convert \"{name}\" : {e}"));
                    return;
                }
            },
            Setting::Reset => {
                state.aov_shaders.remove(aov);
            }
        }
        self.set(
            "aov_shaders",
            ParamValue::nodes(state.aov_shaders.values().map(|s| s.root())),
        );
    }

    fn options_declares(&self, param: &str) -> bool {
        self.scope()
            .universe()
            .entry(self.options.key())
            .is_some_and(|e| e.has_param(param))
    }

    /// `prism:<param>`: a built-in options parameter set directly.
    fn native_option(&self, name: &str, param: &str, value: Option<&Value>) {
        match value {
            None => self.reset(param),
            Some(value) => match value.as_data().and_then(ParamValue::from_data) {
                Some(v) => self.set(param, v),
                None => self.warn(format!("Option \"{name}\" has unsupported type {}", value.type_name())),
            },
        }
    }

    /// `user:<name>` and `prism:declare:<name>`: user parameters on the
    /// options node.
    fn declared_option(&self, param: &str, value: Option<&Value>) {
        let Some(value) = value else {
            self.scope().universe().reset_param(self.options.key(), param);
            return;
        };
        match value.as_data().and_then(ParamValue::from_data) {
            Some(v) => {
                let array = v.is_array();
                declare_and_set(self.scope(), self.options.key(), param, v, array);
            }
            None => self.warn(format!("Option \"{param}\" has unsupported type {}", value.type_name())),
        }
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// Adds, replaces or (with `None`) removes an output. A rejected
    /// replacement leaves the existing output in place.
    pub fn output(&self, name: &str, output: Option<&Output>) -> Result<()> {
        if let Some(output) = output {
            OutputNodes::validate(self.scope(), name, output)?;
        }
        let mut state = self.state.lock();
        if let Some(previous) = state.outputs.remove(name) {
            previous.destroy();
        }
        if let Some(output) = output {
            let nodes = OutputNodes::new(self.scope(), name, output)?;
            state.outputs.insert(name.to_string(), nodes);
        }
        Ok(())
    }

    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.state.lock().outputs.keys().cloned().collect()
    }

    // ========================================================================
    // Cameras
    // ========================================================================

    /// Makes `camera` available for selection by name. The registry does not
    /// keep the camera alive.
    pub fn register_camera(&self, camera: &Arc<CameraHandle>) {
        self.state
            .lock()
            .cameras
            .insert(camera.name().to_string(), Arc::downgrade(camera));
    }

    fn resolve_camera(&self, state: &mut GlobalsState, name: &str) -> Result<Arc<CameraHandle>> {
        if let Some(camera) = state.cameras.get(name).and_then(Weak::upgrade) {
            return Ok(camera);
        }
        if name != DEFAULT_CAMERA {
            return Err(PrismError::Render(RenderError::NoCamera(name.to_string())));
        }
        if let Some(camera) = &state.default_camera {
            return Ok(camera.clone());
        }

        let attributes = self.context.attributes(&Dictionary::new());
        let camera = self.context.camera(DEFAULT_CAMERA, &CameraData::default(), &attributes)?;
        state.default_camera = Some(camera.clone());
        Ok(camera)
    }

    // ========================================================================
    // Render preparation
    // ========================================================================

    /// The render invocations needed for the current outputs.
    ///
    /// With `per_camera` set every distinct output camera gets its own pass;
    /// otherwise only the selected camera is rendered and outputs attached
    /// to other cameras are skipped.
    pub fn passes(&self, per_camera: bool) -> Result<Vec<RenderPass>> {
        let mut state = self.state.lock();
        let selected = state.camera.clone().unwrap_or_else(|| DEFAULT_CAMERA.to_string());

        let mut groups: BTreeMap<String, Vec<&OutputNodes>> = BTreeMap::new();
        for output in state.outputs.values() {
            let camera = output.camera().unwrap_or(selected.as_str());
            if per_camera || camera == selected {
                groups.entry(camera.to_string()).or_default().push(output);
            } else {
                self.scope().messages().debug(
                    CONTEXT,
                    format!("Skipping output \"{}\" of camera \"{camera}\"", output.name()),
                );
            }
        }

        let groups: Vec<(String, Vec<String>, Vec<String>)> = groups
            .into_iter()
            .map(|(camera, outputs)| {
                let strings = outputs.iter().map(|o| o.output_string(self.scope())).collect();
                let lpes = outputs.iter().filter_map(|o| o.data().lpe.clone()).collect();
                (camera, strings, lpes)
            })
            .collect();
        let groups = if groups.is_empty() {
            vec![(selected, Vec::new(), Vec::new())]
        } else {
            groups
        };

        groups
            .into_iter()
            .map(|(camera, outputs, light_path_expressions)| {
                Ok(RenderPass {
                    camera: self.resolve_camera(&mut state, &camera)?,
                    outputs,
                    light_path_expressions,
                })
            })
            .collect()
    }

    /// Pushes the pass camera and outputs into the options node.
    pub fn prepare(&self, pass: &RenderPass) {
        let data = pass.camera.data();
        self.set("camera", pass.camera.node());
        self.set("xres", data.resolution.x as i32);
        self.set("yres", data.resolution.y as i32);
        self.set("pixel_aspect_ratio", data.pixel_aspect_ratio);

        let region = data.render_region().unwrap_or([REGION_UNSET; 4]);
        for (param, value) in ["region_min_x", "region_min_y", "region_max_x", "region_max_y"]
            .into_iter()
            .zip(region)
        {
            self.set(param, value);
        }
        self.set("shutter_start", data.shutter.x);
        self.set("shutter_end", data.shutter.y);

        let strings = |values: &[String]| {
            ParamValue::array(
                ParamType::String,
                values.iter().map(|s| ParamValue::from(s.as_str())).collect(),
            )
        };
        self.set("outputs", strings(&pass.outputs));
        self.set("light_path_expressions", strings(&pass.light_path_expressions));
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    pub fn clear_unused(&self) -> usize {
        self.shaders.clear_unused()
    }

    /// Releases everything held for the options: outputs, option shaders and
    /// the default camera.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        for (_, output) in std::mem::take(&mut state.outputs) {
            output.destroy();
        }
        state.shaders.clear();
        state.aov_shaders.clear();
        state.cameras.clear();
        state.default_camera = None;
        drop(state);
        self.shaders.clear();
    }
}

#[cfg(test)]
mod tests {
    use prism_core::{MessageHandler, Severity};
    use prism_scene::Shader;

    use super::*;
    use crate::native::Universe;
    use crate::registry::Registry;
    use crate::settings::NodeLifetime;

    fn globals(messages: MessageHandler) -> Globals {
        let context = SceneContext::new(NodeScope::new(
            Arc::new(Universe::new()),
            Arc::new(Registry::with_builtins()),
            messages,
            NodeLifetime::Arena,
        ));
        Globals::new(context).unwrap()
    }

    fn param(globals: &Globals, name: &str) -> Option<ParamValue> {
        globals.scope().universe().param(globals.options(), name)
    }

    #[test]
    fn test_frame_seeds_sampling() {
        let g = globals(MessageHandler::new());
        g.option("frame", Some(&Value::from(12)));
        assert_eq!(param(&g, "AA_seed"), Some(ParamValue::Int(12)));
        assert_eq!(param(&g, "frame"), Some(ParamValue::Float(12.0)));

        g.option("prism:AA_seed", Some(&Value::from(3)));
        g.option("frame", Some(&Value::from(13)));
        assert_eq!(param(&g, "AA_seed"), Some(ParamValue::Int(3)));

        g.option("prism:AA_seed", None);
        assert_eq!(param(&g, "AA_seed"), Some(ParamValue::Int(13)));
    }

    #[test]
    fn test_sample_motion_and_native_options() {
        let g = globals(MessageHandler::new());
        g.option("sampleMotion", Some(&Value::from(false)));
        assert_eq!(param(&g, "ignore_motion_blur"), Some(ParamValue::Bool(true)));
        g.option("sampleMotion", None);
        assert_eq!(param(&g, "ignore_motion_blur"), Some(ParamValue::Bool(false)));

        g.option("prism:AA_samples", Some(&Value::from(8)));
        assert_eq!(param(&g, "AA_samples"), Some(ParamValue::Int(8)));
        g.option("prism:progressive", Some(&Value::from(true)));
        assert_eq!(param(&g, "enable_progressive_render"), Some(ParamValue::Bool(true)));
    }

    #[test]
    fn test_log_flags() {
        let g = globals(MessageHandler::new());
        g.option("prism:console:debug", Some(&Value::from(true)));
        g.option("prism:console:progress", Some(&Value::from(false)));
        let expected = LogFlags::WARNINGS | LogFlags::ERRORS | LogFlags::DEBUG;
        assert_eq!(param(&g, "console_flags"), Some(ParamValue::Int(expected.bits() as i32)));
    }

    #[test]
    fn test_user_and_declared_options() {
        let g = globals(MessageHandler::new());
        g.option("user:shot", Some(&Value::from("sh010")));
        g.option("prism:declare:texture_max_memory", Some(&Value::from(2048)));

        let u = g.scope().universe();
        assert_eq!(u.user_param(g.options(), "user:shot"), Some(ParamValue::from("sh010")));
        assert_eq!(u.user_param(g.options(), "texture_max_memory"), Some(ParamValue::Int(2048)));

        g.option("user:shot", None);
        assert_eq!(u.user_param(g.options(), "user:shot"), None);
    }

    #[test]
    fn test_option_shaders() {
        let g = globals(MessageHandler::new());
        let network = ShaderNetwork::single("fog", Shader::new("atmosphere_volume", "shader").with_parameter("density", 0.1f32));
        g.option("prism:atmosphere", Some(&Value::from(network)));
        let node = param(&g, "atmosphere").and_then(|v| v.as_node()).unwrap();
        assert_eq!(g.scope().universe().entry(node).unwrap().name(), "atmosphere_volume");

        let imager = ShaderNetwork::single("exposure", Shader::new("imager_exposure", "shader"));
        g.option("prism:imager", Some(&Value::from(imager)));
        assert_eq!(param(&g, "imagers").map(|v| v.elements().len()), Some(1));

        g.option("prism:atmosphere", None);
        assert!(!g.scope().universe().is_set(g.options(), "atmosphere"));
        assert_eq!(g.clear_unused(), 1);
    }

    #[test]
    fn test_unknown_options() {
        let (messages, rx) = MessageHandler::with_channel();
        let g = globals(messages);
        g.option("prism:nonsense", Some(&Value::from(1)));
        g.option("cycles:samples", Some(&Value::from(1)));
        g.option("frame", Some(&Value::from("ten")));

        let received: Vec<_> = rx.try_iter().collect();
        let warnings: Vec<_> = received.iter().filter(|m| m.severity == Severity::Warning).collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].text.contains("prism:nonsense"));
        assert!(received.iter().any(|m| m.severity == Severity::Debug && m.text.contains("cycles:samples")));
    }

    #[test]
    fn test_passes_partition_outputs_by_camera() {
        let g = globals(MessageHandler::new());
        let context = g.context.clone();
        let attrs = context.attributes(&Dictionary::new());
        let a = context.camera("camA", &CameraData::default().with_resolution(320, 240), &attrs).unwrap();
        let b = context.camera("camB", &CameraData::default(), &attrs).unwrap();
        g.register_camera(&a);
        g.register_camera(&b);

        g.option("camera", Some(&Value::from("camA")));
        g.output("main", Some(&Output::new("main.exr", "exr", "rgba"))).unwrap();
        g.output("side", Some(&Output::new("side.exr", "exr", "rgba").with_parameter("camera", "camB")))
            .unwrap();

        let passes = g.passes(true).unwrap();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].camera.name(), "camA");
        assert_eq!(passes[0].outputs, vec!["RGBA RGBA prism:filter:main prism:driver:main"]);
        assert_eq!(passes[1].camera.name(), "camB");

        g.prepare(&passes[0]);
        assert_eq!(param(&g, "xres"), Some(ParamValue::Int(320)));
        assert_eq!(param(&g, "camera"), Some(ParamValue::Node(Some(a.node()))));

        assert_eq!(g.passes(false).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_camera() {
        let g = globals(MessageHandler::new());
        g.option("camera", Some(&Value::from("nowhere")));
        assert!(matches!(
            g.passes(true),
            Err(PrismError::Render(RenderError::NoCamera(name))) if name == "nowhere"
        ));

        g.option("camera", None);
        let passes = g.passes(true).unwrap();
        assert_eq!(passes[0].camera.name(), DEFAULT_CAMERA);
        assert!(passes[0].outputs.is_empty());
    }

    #[test]
    fn test_replacing_an_output_reuses_its_names() {
        let g = globals(MessageHandler::new());
        g.output("beauty", Some(&Output::new("a.exr", "exr", "rgba"))).unwrap();
        g.output("beauty", Some(&Output::new("b.png", "png", "rgb"))).unwrap();
        let u = g.scope().universe();
        let driver = u.lookup("prism:driver:beauty", None).unwrap();
        assert_eq!(u.entry(driver).unwrap().name(), "driver_png");
        assert_eq!(u.nodes_of_type("driver_exr").len(), 0);

        g.output("beauty", None).unwrap();
        assert!(g.output_names().is_empty());
    }

    #[test]
    fn test_rejected_replacement_keeps_the_output() {
        let g = globals(MessageHandler::new());
        g.output("beauty", Some(&Output::new("a.exr", "exr", "rgba"))).unwrap();

        assert!(matches!(
            g.output("beauty", Some(&Output::new("b.xyz", "xyz", "rgba"))),
            Err(PrismError::UnknownDriver { .. })
        ));
        let unknown_filter = Output::new("b.exr", "exr", "rgba").with_parameter("filter", "mystery");
        assert!(matches!(
            g.output("beauty", Some(&unknown_filter)),
            Err(PrismError::UnknownFilter { .. })
        ));

        assert_eq!(g.output_names(), vec!["beauty".to_string()]);
        let u = g.scope().universe();
        let driver = u.lookup("prism:driver:beauty", None).unwrap();
        assert_eq!(u.param(driver, "filename"), Some(ParamValue::from("a.exr")));
        assert!(u.lookup("prism:filter:beauty", None).is_some());
    }
}
