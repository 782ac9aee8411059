//! Built-in node types.
//!
//! The node vocabulary of the native renderer: shapes, instances, cameras,
//! lights, light filters, shaders, drivers, pixel filters, the color manager
//! and the global options node. Hosts may add to it through
//! [`Registry::register_entry`](crate::registry::Registry::register_entry).

use glam::{Mat4, Vec2, Vec3};

use super::entry::{EntryBuilder, EntryKind, NodeEntry, ShapeKind};
use super::value::{ParamType, ParamValue};

/// Region parameters default to this value, meaning "whole frame".
pub const REGION_UNSET: i32 = i32::MIN;

fn rgb(v: Vec3) -> ParamValue {
    ParamValue::Rgb(v)
}

fn xform(b: EntryBuilder) -> EntryBuilder {
    b.motion_array("matrix", ParamType::Matrix)
        .param("motion_start", 0.0f32)
        .param("motion_end", 1.0f32)
}

fn shape(b: EntryBuilder) -> EntryBuilder {
    b.with(xform)
        .param("visibility", 255u8)
        .param("sidedness", 255u8)
        .param("receive_shadows", true)
        .param("self_shadows", true)
        .param("opaque", true)
        .param("matte", false)
        .array("shader", ParamType::Node)
        .array("light_group", ParamType::Node)
        .param("use_light_group", false)
        .array("shadow_group", ParamType::Node)
        .param("use_shadow_group", false)
        .param("id", 0u32)
}

fn light(b: EntryBuilder) -> EntryBuilder {
    b.with(xform)
        .param("color", rgb(Vec3::ONE))
        .param("intensity", 1.0f32)
        .param("exposure", 0.0f32)
        .array("filters", ParamType::Node)
        .param("cast_shadows", true)
        .param("samples", 1)
}

fn camera(b: EntryBuilder) -> EntryBuilder {
    b.with(xform)
        .param("near_clip", 0.0001f32)
        .param("far_clip", 1.0e30f32)
        .param("shutter_start", 0.0f32)
        .param("shutter_end", 0.0f32)
        .param("screen_window_min", Vec2::new(-1.0, -1.0))
        .param("screen_window_max", Vec2::new(1.0, 1.0))
}

fn driver(b: EntryBuilder) -> EntryBuilder {
    b.param("filename", "")
}

fn filter(b: EntryBuilder, width: f32) -> EntryBuilder {
    b.param("width", width)
}

/// Every node type the renderer knows out of the box.
#[must_use]
pub fn builtin_entries() -> Vec<NodeEntry> {
    use EntryKind as K;
    use ParamType as T;

    let entry = NodeEntry::builder;

    vec![
        // ─── Shapes ─────────────────────────────────────────────────────────
        entry("polymesh", K::Shape(ShapeKind::Mesh))
            .with(shape)
            .array("nsides", T::UInt)
            .array("vidxs", T::UInt)
            .motion_array("vlist", T::Vec3)
            .motion_array("nlist", T::Vec3)
            .array("nidxs", T::UInt)
            .array("uvlist", T::Vec2)
            .array("uvidxs", T::UInt)
            .param("smoothing", false)
            .param("subdiv_type", "none")
            .param("subdiv_iterations", 1u8)
            .param("subdiv_adaptive_error", 0.0f32)
            .param("subdiv_adaptive_metric", "auto")
            .param("subdiv_adaptive_space", "raster")
            .param("subdiv_uv_smoothing", "pin_corners")
            .param("subdiv_smooth_derivs", false)
            .param("subdiv_frustum_ignore", false)
            .param("subdivide_polygons", false)
            .array("disp_map", T::Node)
            .param("disp_height", 1.0f32)
            .param("disp_padding", 0.0f32)
            .param("disp_zero_value", 0.0f32)
            .param("disp_autobump", false)
            .param("step_size", 0.0f32)
            .param("volume_padding", 0.0f32)
            .build(),
        entry("curves", K::Shape(ShapeKind::Curves))
            .with(shape)
            .array("num_points", T::UInt)
            .motion_array("points", T::Vec3)
            .motion_array("radius", T::Float)
            .motion_array("orientations", T::Vec3)
            .param("basis", "bezier")
            .param("mode", "ribbon")
            .param("min_pixel_width", 0.0f32)
            .build(),
        entry("points", K::Shape(ShapeKind::Points))
            .with(shape)
            .motion_array("points", T::Vec3)
            .motion_array("radius", T::Float)
            .param("mode", "disk")
            .param("min_pixel_width", 0.0f32)
            .build(),
        entry("volume", K::Shape(ShapeKind::Volume))
            .with(shape)
            .param("filename", "")
            .array("grids", T::String)
            .param("step_size", 0.0f32)
            .param("step_scale", 1.0f32)
            .param("volume_padding", 0.0f32)
            .build(),
        entry("procedural", K::Shape(ShapeKind::Procedural))
            .with(shape)
            .param("filename", "")
            .param("namespace", "")
            .param("bound_min", Vec3::splat(-1.0))
            .param("bound_max", Vec3::splat(1.0))
            .build(),
        entry("ginstance", K::Instance)
            .with(shape)
            .node_param("node")
            .param("inherit_xform", true)
            .build(),
        // ─── Cameras ────────────────────────────────────────────────────────
        entry("persp_camera", K::Camera)
            .with(camera)
            .param("fov", 54.43f32)
            .param("aperture_size", 0.0f32)
            .param("focus_distance", 1.0f32)
            .build(),
        entry("ortho_camera", K::Camera).with(camera).build(),
        // ─── Lights ─────────────────────────────────────────────────────────
        entry("point_light", K::Light)
            .with(light)
            .param("radius", 0.0f32)
            .build(),
        entry("distant_light", K::Light)
            .with(light)
            .param("angle", 0.0f32)
            .build(),
        entry("spot_light", K::Light)
            .with(light)
            .param("radius", 0.0f32)
            .param("cone_angle", 65.0f32)
            .param("penumbra_angle", 0.0f32)
            .build(),
        entry("quad_light", K::Light)
            .with(light)
            .array("vertices", T::Vec3)
            .param("resolution", 512)
            .param("roundness", 0.0f32)
            .build(),
        entry("skydome_light", K::Light)
            .with(light)
            .param("resolution", 1000)
            .param("format", "latlong")
            .build(),
        entry("mesh_light", K::Light)
            .with(light)
            .node_param("mesh")
            .build(),
        // ─── Light filters ──────────────────────────────────────────────────
        entry("light_blocker", K::LightFilter)
            .with(xform)
            .param("geometry_type", "box")
            .param("density", 0.0f32)
            .param("roundness", 0.0f32)
            .build(),
        entry("gobo", K::LightFilter)
            .with(xform)
            .param("slidemap", rgb(Vec3::ONE))
            .param("density", 0.0f32)
            .build(),
        entry("barndoor", K::LightFilter)
            .with(xform)
            .param("barndoor_top_left", 0.0f32)
            .param("barndoor_top_right", 0.0f32)
            .param("barndoor_bottom_left", 1.0f32)
            .param("barndoor_bottom_right", 1.0f32)
            .build(),
        // ─── Shaders ────────────────────────────────────────────────────────
        entry("standard_surface", K::Shader)
            .param("base", 0.8f32)
            .param("base_color", rgb(Vec3::ONE))
            .param("specular", 1.0f32)
            .param("specular_color", rgb(Vec3::ONE))
            .param("specular_roughness", 0.2f32)
            .param("emission", 0.0f32)
            .param("emission_color", rgb(Vec3::ONE))
            .param("opacity", rgb(Vec3::ONE))
            .build(),
        entry("lambert", K::Shader)
            .param("Kd", 0.7f32)
            .param("Kd_color", rgb(Vec3::ONE))
            .param("opacity", rgb(Vec3::ONE))
            .build(),
        entry("flat", K::Shader).param("color", rgb(Vec3::ONE)).build(),
        entry("image", K::Shader)
            .param("filename", "")
            .param("color_space", "auto")
            .param("multiply", rgb(Vec3::ONE))
            .build(),
        entry("utility", K::Shader)
            .param("color", rgb(Vec3::ONE))
            .param("color_mode", "color")
            .param("shade_mode", "ndoty")
            .build(),
        entry("aov_write_rgb", K::Shader)
            .param("aov_name", "")
            .param("aov_input", rgb(Vec3::ZERO))
            .build(),
        entry("atmosphere_volume", K::Shader)
            .param("density", 0.0f32)
            .param("samples", 5)
            .build(),
        entry("imager_exposure", K::Shader)
            .param("exposure", 0.0f32)
            .node_param("input")
            .build(),
        entry("color_manager_ocio", K::ColorManager)
            .param("config", "")
            .param("color_space_linear", "")
            .param("color_space_narrow", "")
            .build(),
        // ─── Drivers ────────────────────────────────────────────────────────
        entry("driver_exr", K::Driver)
            .with(driver)
            .param("compression", "zip")
            .param("half_precision", false)
            .build(),
        entry("driver_tiff", K::Driver)
            .with(driver)
            .param("format", "int8")
            .build(),
        entry("driver_png", K::Driver)
            .with(driver)
            .param("format", "int8")
            .build(),
        entry("driver_jpeg", K::Driver)
            .with(driver)
            .param("quality", 100)
            .build(),
        entry("driver_memory", K::Driver).with(driver).build(),
        // ─── Pixel filters ──────────────────────────────────────────────────
        filter(entry("gaussian_filter", K::Filter), 2.0).build(),
        filter(entry("box_filter", K::Filter), 1.0).build(),
        filter(entry("blackman_harris_filter", K::Filter), 3.0).build(),
        filter(entry("closest_filter", K::Filter), 1.0).build(),
        filter(entry("triangle_filter", K::Filter), 2.0).build(),
        // ─── Options ────────────────────────────────────────────────────────
        entry("options", K::Options)
            .node_param("camera")
            .param("xres", 640)
            .param("yres", 480)
            .param("pixel_aspect_ratio", 1.0f32)
            .param("region_min_x", REGION_UNSET)
            .param("region_min_y", REGION_UNSET)
            .param("region_max_x", REGION_UNSET)
            .param("region_max_y", REGION_UNSET)
            .param("shutter_start", 0.0f32)
            .param("shutter_end", 0.0f32)
            .array("outputs", T::String)
            .array("light_path_expressions", T::String)
            .param("frame", 0.0f32)
            .param("AA_samples", 3)
            .param("AA_seed", 1)
            .param("enable_progressive_render", false)
            .param("progressive_min_AA_samples", -4)
            .param("ignore_motion_blur", false)
            .param("threads", 0)
            .param("texture_searchpath", "")
            .node_param("color_manager")
            .node_param("atmosphere")
            .node_param("background")
            .array("imagers", T::Node)
            .array("aov_shaders", T::Node)
            .param("log_file", "")
            .param("log_flags", 0)
            .param("console_flags", 0)
            .param("stats_file", "")
            .param("profile_file", "")
            .param("world_matrix", Mat4::IDENTITY)
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_names_are_unique() {
        let entries = builtin_entries();
        let mut names: Vec<_> = entries.iter().map(NodeEntry::name).collect();
        names.sort_unstable();
        let count = names.len();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_shapes_share_common_params() {
        for entry in builtin_entries() {
            if entry.kind().is_shape() {
                for param in ["matrix", "visibility", "shader", "light_group", "shadow_group"] {
                    assert!(entry.has_param(param), "{} lacks {param}", entry.name());
                }
                assert!(entry.param("matrix").unwrap().motion);
            }
        }
    }
}
