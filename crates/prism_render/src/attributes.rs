//! Attributes Bundle
//!
//! The processed, renderer-ready form of an attribute [`Dictionary`].
//!
//! # Overview
//!
//! Attributes fall into two groups:
//!
//! - **Non-geometric**: visibility, sidedness, shading flags, the surface
//!   shader and custom attributes. These can be edited in place on any node
//!   with [`AttributesBundle::apply_non_geometric`].
//! - **Geometric**: tessellation, displacement, curve and point widths,
//!   volume stepping. These are baked into shared instance masters by
//!   [`AttributesBundle::apply_geometric`] and summarised per shape kind by
//!   [`AttributesBundle::geometry_hash`]. An in-place edit that changes them
//!   is refused so the caller rebuilds the entity.
//!
//! Custom attributes come from `user:<name>` and `render:<name>` keys and
//! both resolve to the user parameter `<name>`; `render:` wins when both
//! are present.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use bitflags::bitflags;
use prism_core::{ContentHash, ContentHasher, Data, Hash128, MessageHandler};
use prism_scene::{
    AttributesHandle, AttributesInterface, Dictionary, MeshInterpolation, Object, ShaderNetwork, Value,
};
use rustc_hash::FxHashSet;

use crate::native::{NodeKey, ParamError, ParamValue, ShapeKind};
use crate::scope::NodeScope;
use crate::shader_cache::{ShaderCache, ShaderHandle};

const CONTEXT: &str = "prism::AttributesBundle";

bitflags! {
    /// Ray types a shape is visible to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Visibility: u8 {
        const CAMERA            = 1 << 0;
        const SHADOW            = 1 << 1;
        const DIFFUSE_TRANSMIT  = 1 << 2;
        const SPECULAR_TRANSMIT = 1 << 3;
        const VOLUME            = 1 << 4;
        const DIFFUSE_REFLECT   = 1 << 5;
        const SPECULAR_REFLECT  = 1 << 6;
        const SUBSURFACE        = 1 << 7;
    }
}

const VISIBILITY_ATTRIBUTES: [(&str, Visibility); 8] = [
    ("camera", Visibility::CAMERA),
    ("shadow", Visibility::SHADOW),
    ("diffuse_transmit", Visibility::DIFFUSE_TRANSMIT),
    ("specular_transmit", Visibility::SPECULAR_TRANSMIT),
    ("volume", Visibility::VOLUME),
    ("diffuse_reflect", Visibility::DIFFUSE_REFLECT),
    ("specular_reflect", Visibility::SPECULAR_REFLECT),
    ("subsurface", Visibility::SUBSURFACE),
];

// ============================================================================
// Geometric attribute groups
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct PolymeshAttributes {
    subdiv_iterations: i32,
    subdiv_adaptive_error: f32,
    subdiv_adaptive_metric: String,
    subdiv_adaptive_space: String,
    subdiv_uv_smoothing: String,
    subdiv_smooth_derivs: bool,
    subdiv_frustum_ignore: bool,
    subdivide_polygons: bool,
}

impl Default for PolymeshAttributes {
    fn default() -> Self {
        Self {
            subdiv_iterations: 1,
            subdiv_adaptive_error: 0.0,
            subdiv_adaptive_metric: "auto".into(),
            subdiv_adaptive_space: "raster".into(),
            subdiv_uv_smoothing: "pin_corners".into(),
            subdiv_smooth_derivs: false,
            subdiv_frustum_ignore: false,
            subdivide_polygons: false,
        }
    }
}

impl ContentHash for PolymeshAttributes {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_i32(self.subdiv_iterations);
        h.write_f32(self.subdiv_adaptive_error);
        h.write_str(&self.subdiv_adaptive_metric);
        h.write_str(&self.subdiv_adaptive_space);
        h.write_str(&self.subdiv_uv_smoothing);
        h.write_bool(self.subdiv_smooth_derivs);
        h.write_bool(self.subdiv_frustum_ignore);
        h.write_bool(self.subdivide_polygons);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DisplacementAttributes {
    height: f32,
    padding: f32,
    zero_value: f32,
    autobump: bool,
}

impl Default for DisplacementAttributes {
    fn default() -> Self {
        Self {
            height: 1.0,
            padding: 0.0,
            zero_value: 0.0,
            autobump: false,
        }
    }
}

impl ContentHash for DisplacementAttributes {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_f32(self.height);
        h.write_f32(self.padding);
        h.write_f32(self.zero_value);
        h.write_bool(self.autobump);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CurvesAttributes {
    /// `None` keeps the mode chosen by the converter.
    mode: Option<String>,
    min_pixel_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct VolumeAttributes {
    step_size: f32,
    step_scale: f32,
    shape_step_size: f32,
    volume_padding: f32,
}

impl Default for VolumeAttributes {
    fn default() -> Self {
        Self {
            step_size: 0.0,
            step_scale: 1.0,
            shape_step_size: 0.0,
            volume_padding: 0.0,
        }
    }
}

// ============================================================================
// AttributesBundle
// ============================================================================

/// Immutable, parsed attributes for one entity.
#[derive(Debug)]
pub struct AttributesBundle {
    source: Dictionary,

    visibility: Visibility,
    sidedness: u8,
    receive_shadows: bool,
    self_shadows: bool,
    opaque: bool,
    matte: bool,

    surface: Option<Arc<ShaderHandle>>,
    displacement: Option<Arc<ShaderHandle>>,
    light: Option<Arc<ShaderNetwork>>,
    light_filter: Option<(String, Arc<ShaderNetwork>)>,

    polymesh: PolymeshAttributes,
    displacement_attributes: DisplacementAttributes,
    curves: CurvesAttributes,
    points_min_pixel_width: f32,
    volume: VolumeAttributes,
    procedural_hash: Hash128,

    automatic_instancing: bool,
    custom: BTreeMap<String, Data>,
}

impl AttributesInterface for AttributesBundle {}

impl AttributesBundle {
    /// Parses `attributes`. Surface and displacement networks are converted
    /// through `shaders` with `attributes` as the substitution context.
    /// Problems are reported as warnings and the affected attribute keeps
    /// its default.
    #[must_use]
    pub fn new(attributes: &Dictionary, shaders: &ShaderCache, messages: &MessageHandler) -> Self {
        let reader = Reader { messages };
        let mut b = Self::defaults(attributes.clone());
        let mut from_render = FxHashSet::default();

        for (key, value) in attributes {
            if let Some(name) = key.strip_prefix("user:") {
                b.add_custom(&reader, key, name, value, false, &mut from_render);
                continue;
            }
            if let Some(name) = key.strip_prefix("render:") {
                b.add_custom(&reader, key, name, value, true, &mut from_render);
                continue;
            }
            if key == "doubleSided" {
                if let Some(double_sided) = reader.bool(key, value) {
                    b.sidedness = if double_sided { u8::MAX } else { 0 };
                }
                continue;
            }
            let Some(rest) = key.strip_prefix("prism:") else {
                continue;
            };

            if let Some(ray) = rest.strip_prefix("visibility:") {
                match VISIBILITY_ATTRIBUTES.iter().find(|(name, _)| *name == ray) {
                    Some(&(_, flag)) => {
                        if let Some(visible) = reader.bool(key, value) {
                            b.visibility.set(flag, visible);
                        }
                    }
                    None => reader.unknown(key),
                }
                continue;
            }
            if let Some(filter) = rest.strip_prefix("lightFilter:") {
                if let Some(network) = reader.network(key, value)
                    && b.light_filter.is_none()
                {
                    b.light_filter = Some((filter.to_string(), network.clone()));
                }
                continue;
            }

            match rest {
                "receive_shadows" => set(&mut b.receive_shadows, reader.bool(key, value)),
                "self_shadows" => set(&mut b.self_shadows, reader.bool(key, value)),
                "opaque" => set(&mut b.opaque, reader.bool(key, value)),
                "matte" => set(&mut b.matte, reader.bool(key, value)),
                "automaticInstancing" => set(&mut b.automatic_instancing, reader.bool(key, value)),

                "polymesh:subdiv_iterations" => set(&mut b.polymesh.subdiv_iterations, reader.int(key, value)),
                "polymesh:subdiv_adaptive_error" => {
                    set(&mut b.polymesh.subdiv_adaptive_error, reader.float(key, value));
                }
                "polymesh:subdiv_adaptive_metric" => {
                    set(&mut b.polymesh.subdiv_adaptive_metric, reader.string(key, value));
                }
                "polymesh:subdiv_adaptive_space" => {
                    set(&mut b.polymesh.subdiv_adaptive_space, reader.string(key, value));
                }
                "polymesh:subdiv_uv_smoothing" => {
                    set(&mut b.polymesh.subdiv_uv_smoothing, reader.string(key, value));
                }
                "polymesh:subdiv_smooth_derivs" => {
                    set(&mut b.polymesh.subdiv_smooth_derivs, reader.bool(key, value));
                }
                "polymesh:subdiv_frustum_ignore" => {
                    set(&mut b.polymesh.subdiv_frustum_ignore, reader.bool(key, value));
                }
                "polymesh:subdivide_polygons" => {
                    set(&mut b.polymesh.subdivide_polygons, reader.bool(key, value));
                }

                "disp_height" => set(&mut b.displacement_attributes.height, reader.float(key, value)),
                "disp_padding" => set(&mut b.displacement_attributes.padding, reader.float(key, value)),
                "disp_zero_value" => set(&mut b.displacement_attributes.zero_value, reader.float(key, value)),
                "disp_autobump" => set(&mut b.displacement_attributes.autobump, reader.bool(key, value)),

                "curves:mode" => b.curves.mode = reader.string(key, value),
                "curves:min_pixel_width" => set(&mut b.curves.min_pixel_width, reader.float(key, value)),
                "points:min_pixel_width" => set(&mut b.points_min_pixel_width, reader.float(key, value)),

                "volume:step_size" => set(&mut b.volume.step_size, reader.float(key, value)),
                "volume:step_scale" => set(&mut b.volume.step_scale, reader.float(key, value)),
                "shape:step_size" => set(&mut b.volume.shape_step_size, reader.float(key, value)),
                "shape:volume_padding" => set(&mut b.volume.volume_padding, reader.float(key, value)),

                // Resolved below, with their un-namespaced fallbacks.
                "surface" | "displacement" | "light" => {}

                _ => reader.unknown(key),
            }
        }

        let network = |name: &str| {
            attributes
                .get(&format!("prism:{name}"))
                .or_else(|| attributes.get(name))
                .and_then(|value| reader.network(name, value))
        };
        let convert = |name: &str, network: &ShaderNetwork| match shaders.get(network, Some(attributes)) {
            Ok(handle) => Some(handle),
            Err(e) => {
                messages.warning(CONTEXT, format!("Unable to convert {name} shader : {e}"));
                None
            }
        };

        b.surface = network("surface").and_then(|n| convert("surface", n));
        b.displacement = network("displacement").and_then(|n| convert("displacement", n));
        b.light = network("light").cloned();
        b.procedural_hash = procedural_hash(attributes);
        b
    }

    fn defaults(source: Dictionary) -> Self {
        Self {
            source,
            visibility: Visibility::all(),
            sidedness: u8::MAX,
            receive_shadows: true,
            self_shadows: true,
            opaque: true,
            matte: false,
            surface: None,
            displacement: None,
            light: None,
            light_filter: None,
            polymesh: PolymeshAttributes::default(),
            displacement_attributes: DisplacementAttributes::default(),
            curves: CurvesAttributes::default(),
            points_min_pixel_width: 0.0,
            volume: VolumeAttributes::default(),
            procedural_hash: Hash128::default(),
            automatic_instancing: true,
            custom: BTreeMap::new(),
        }
    }

    fn add_custom(
        &mut self,
        reader: &Reader<'_>,
        key: &str,
        name: &str,
        value: &Value,
        render: bool,
        from_render: &mut FxHashSet<String>,
    ) {
        let Some(data) = value.as_data() else {
            reader.wrong_type(key, "data", value);
            return;
        };
        let replace = match self.custom.contains_key(name) {
            false => true,
            true => render && !from_render.contains(name),
        };
        if replace {
            self.custom.insert(name.to_string(), data.clone());
            if render {
                from_render.insert(name.to_string());
            }
        }
    }

    /// The bundle behind an attributes handle, if this renderer made it.
    #[must_use]
    pub fn from_handle(handle: &AttributesHandle) -> Option<&Self> {
        let any: &dyn Any = &**handle;
        any.downcast_ref::<Self>()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The dictionary this bundle was parsed from.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Dictionary {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    #[must_use]
    pub fn surface(&self) -> Option<&Arc<ShaderHandle>> {
        self.surface.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn displacement(&self) -> Option<&Arc<ShaderHandle>> {
        self.displacement.as_ref()
    }

    /// The network for a light entity.
    #[inline]
    #[must_use]
    pub fn light_shader(&self) -> Option<&Arc<ShaderNetwork>> {
        self.light.as_ref()
    }

    /// The network for a light filter entity, with the filter name taken
    /// from its `prism:lightFilter:<name>` key.
    #[must_use]
    pub fn light_filter_shader(&self) -> Option<(&str, &Arc<ShaderNetwork>)> {
        self.light_filter.as_ref().map(|(name, n)| (name.as_str(), n))
    }

    /// Resolved custom attributes.
    #[inline]
    #[must_use]
    pub fn custom(&self) -> &BTreeMap<String, Data> {
        &self.custom
    }

    #[inline]
    #[must_use]
    pub fn automatic_instancing(&self) -> bool {
        self.automatic_instancing
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Hash of the attributes baked into a shape of kind `shape`.
    #[must_use]
    pub fn geometry_hash(&self, shape: ShapeKind) -> Hash128 {
        let mut h = ContentHasher::new();
        match shape {
            ShapeKind::Mesh => {
                h.write_str("polymesh");
                self.polymesh.hash_into(&mut h);
                h.append(&self.displacement.as_ref().map(|d| d.hash()));
                self.displacement_attributes.hash_into(&mut h);
                h.write_f32(self.volume.shape_step_size);
                h.write_f32(self.volume.volume_padding);
            }
            ShapeKind::Curves => {
                h.write_str("curves");
                h.append(&self.curves.mode);
                h.write_f32(self.curves.min_pixel_width);
            }
            ShapeKind::Points => {
                h.write_str("points");
                h.write_f32(self.points_min_pixel_width);
            }
            ShapeKind::Volume => {
                h.write_str("volume");
                h.write_f32(self.volume.step_size);
                h.write_f32(self.volume.step_scale);
                h.write_f32(self.volume.shape_step_size);
                h.write_f32(self.volume.volume_padding);
            }
            ShapeKind::Procedural => {
                h.write_str("procedural");
                h.write_hash(self.procedural_hash);
            }
        }
        h.finish()
    }

    /// `false` when `object` must be converted without sharing.
    #[must_use]
    pub fn can_instance(&self, object: &Object) -> bool {
        if !self.automatic_instancing {
            return false;
        }
        match object {
            Object::Mesh(mesh) => {
                let p = &self.polymesh;
                let view_dependent = mesh.interpolation == MeshInterpolation::CatmullClark
                    && p.subdiv_iterations > 0
                    && p.subdiv_adaptive_error > 0.0
                    && p.subdiv_adaptive_space == "raster";
                !view_dependent
            }
            Object::Curves(_) => self.curves.min_pixel_width == 0.0,
            Object::Points(_) => self.points_min_pixel_width == 0.0,
            Object::Volume(_) | Object::Procedural(_) => true,
            Object::ExternalProcedural(_) | Object::Camera(_) => false,
        }
    }

    /// Bakes the geometric attributes for `shape` into `node`. Only ever
    /// applied when a node is created.
    pub fn apply_geometric(&self, scope: &NodeScope, node: NodeKey, shape: ShapeKind) {
        match shape {
            ShapeKind::Mesh => {
                let p = &self.polymesh;
                scope.set(node, "subdiv_iterations", p.subdiv_iterations.clamp(0, 255) as u8);
                scope.set(node, "subdiv_adaptive_error", p.subdiv_adaptive_error);
                scope.set(node, "subdiv_adaptive_metric", p.subdiv_adaptive_metric.as_str());
                scope.set(node, "subdiv_adaptive_space", p.subdiv_adaptive_space.as_str());
                scope.set(node, "subdiv_uv_smoothing", p.subdiv_uv_smoothing.as_str());
                scope.set(node, "subdiv_smooth_derivs", p.subdiv_smooth_derivs);
                scope.set(node, "subdiv_frustum_ignore", p.subdiv_frustum_ignore);
                scope.set(node, "subdivide_polygons", p.subdivide_polygons);

                if let Some(displacement) = &self.displacement {
                    scope.set(node, "disp_map", ParamValue::nodes([displacement.root()]));
                }
                let d = &self.displacement_attributes;
                scope.set(node, "disp_height", d.height);
                scope.set(node, "disp_padding", d.padding);
                scope.set(node, "disp_zero_value", d.zero_value);
                scope.set(node, "disp_autobump", d.autobump);

                scope.set(node, "step_size", self.volume.shape_step_size);
                scope.set(node, "volume_padding", self.volume.volume_padding);
            }
            ShapeKind::Curves => {
                if let Some(mode) = &self.curves.mode {
                    scope.set(node, "mode", mode.as_str());
                }
                scope.set(node, "min_pixel_width", self.curves.min_pixel_width);
            }
            ShapeKind::Points => {
                scope.set(node, "min_pixel_width", self.points_min_pixel_width);
            }
            ShapeKind::Volume => {
                let step_size = if self.volume.step_size > 0.0 {
                    self.volume.step_size
                } else {
                    self.volume.shape_step_size
                };
                scope.set(node, "step_size", step_size);
                scope.set(node, "step_scale", self.volume.step_scale);
                scope.set(node, "volume_padding", self.volume.volume_padding);
            }
            // Nested entities resolve user parameters through their
            // parents, and a shared master is the parent they see.
            ShapeKind::Procedural => self.declare_custom(scope, node, false),
        }
    }

    // ========================================================================
    // Non-geometric
    // ========================================================================

    /// Applies visibility, shading flags, the surface shader and custom
    /// attributes to `node`.
    ///
    /// Returns `false`, leaving `node` untouched, when `previous` was baked
    /// with different geometric attributes for `shape`.
    pub fn apply_non_geometric(
        &self,
        scope: &NodeScope,
        node: NodeKey,
        shape: ShapeKind,
        previous: Option<&AttributesBundle>,
    ) -> bool {
        if let Some(previous) = previous
            && previous.geometry_hash(shape) != self.geometry_hash(shape)
        {
            return false;
        }

        scope.set(node, "visibility", self.visibility.bits());
        scope.set(node, "sidedness", self.sidedness);
        scope.set(node, "receive_shadows", self.receive_shadows);
        scope.set(node, "self_shadows", self.self_shadows);
        scope.set(node, "opaque", self.opaque);
        scope.set(node, "matte", self.matte);

        match &self.surface {
            Some(surface) => {
                scope.set(node, "shader", ParamValue::nodes([surface.root()]));
            }
            None => scope.universe().reset_param(node, "shader"),
        }

        self.apply_custom(scope, node, previous);
        true
    }

    /// Declares and sets the custom attributes on `node`, removing those
    /// `previous` had and this bundle lacks.
    pub fn apply_custom(&self, scope: &NodeScope, node: NodeKey, previous: Option<&AttributesBundle>) {
        let universe = scope.universe();
        if let Some(previous) = previous {
            let entry = universe.entry(node);
            for name in previous.custom.keys() {
                let builtin = entry.as_ref().is_some_and(|e| e.has_param(name));
                if !self.custom.contains_key(name) && !builtin {
                    universe.reset_param(node, name);
                }
            }
        }
        self.declare_custom(scope, node, true);
    }

    fn declare_custom(&self, scope: &NodeScope, node: NodeKey, report: bool) {
        let universe = scope.universe();
        let entry = universe.entry(node);

        for (name, data) in &self.custom {
            let Some(value) = ParamValue::from_data(data) else {
                if report {
                    scope.messages().warning(
                        CONTEXT,
                        format!("Custom attribute \"{name}\" has unsupported type {}", data.type_name()),
                    );
                }
                continue;
            };
            match universe.declare_user_param(node, name, value.ty(), value.is_array()) {
                Ok(()) => {
                    scope.set(node, name, value);
                }
                Err(_) if !report => {}
                Err(ParamError::BuiltinClash(_)) => scope.messages().warning(
                    CONTEXT,
                    format!(
                        "Custom attribute \"{name}\" clashes with a built-in parameter of \"{}\" and will be ignored",
                        entry.as_ref().map(|e| e.name()).unwrap_or_default()
                    ),
                ),
                Err(e) => scope
                    .messages()
                    .warning(CONTEXT, format!("Unable to apply custom attribute \"{name}\" : {e}")),
            }
        }
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// Hash of every attribute, custom ones included. Procedurals see all of
/// them, and their master carries the custom ones.
fn procedural_hash(attributes: &Dictionary) -> Hash128 {
    let mut h = ContentHasher::new();
    for (key, value) in attributes {
        h.write_str(key);
        value.hash_into(&mut h);
    }
    h.finish()
}

/// Typed attribute reads that warn on type mismatches.
struct Reader<'a> {
    messages: &'a MessageHandler,
}

impl Reader<'_> {
    fn typed<T>(&self, key: &str, value: &Value, expected: &str, cast: impl Fn(&Data) -> Option<T>) -> Option<T> {
        let result = value.as_data().and_then(cast);
        if result.is_none() {
            self.wrong_type(key, expected, value);
        }
        result
    }

    fn bool(&self, key: &str, value: &Value) -> Option<bool> {
        self.typed(key, value, "Bool", Data::as_bool)
    }

    fn int(&self, key: &str, value: &Value) -> Option<i32> {
        self.typed(key, value, "Int", Data::as_i32)
    }

    fn float(&self, key: &str, value: &Value) -> Option<f32> {
        self.typed(key, value, "Float", Data::as_f32)
    }

    fn string(&self, key: &str, value: &Value) -> Option<String> {
        self.typed(key, value, "String", |d| d.as_str().map(str::to_string))
    }

    fn network<'v>(&self, key: &str, value: &'v Value) -> Option<&'v Arc<ShaderNetwork>> {
        let network = value.as_shader_network();
        if network.is_none() {
            self.wrong_type(key, "ShaderNetwork", value);
        }
        network
    }

    fn wrong_type(&self, key: &str, expected: &str, value: &Value) {
        self.messages.warning(
            CONTEXT,
            format!("Expected {expected} for \"{key}\" but got {}", value.type_name()),
        );
    }

    fn unknown(&self, key: &str) {
        self.messages.warning(CONTEXT, format!("Unknown attribute \"{key}\" will be ignored"));
    }
}
