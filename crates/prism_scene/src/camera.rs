//! Camera description.

use glam::{UVec2, Vec2};
use prism_core::{CompoundData, ContentHash, ContentHasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Renderer-agnostic camera. Resolution, pixel aspect, crop window and
/// shutter are camera level here but render-global in the native renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraData {
    pub projection: Projection,
    /// Horizontal field of view in degrees.
    pub field_of_view: f32,
    pub resolution: UVec2,
    pub pixel_aspect_ratio: f32,
    /// Normalized `(min, max)` crop window; `None` renders the full frame.
    pub crop_window: Option<(Vec2, Vec2)>,
    pub clipping_planes: Vec2,
    pub shutter: Vec2,
    pub f_stop: f32,
    pub focal_length: f32,
    pub focus_distance: f32,
    /// Explicit screen window; derived from resolution when `None`.
    pub screen_window: Option<(Vec2, Vec2)>,
    /// Extra native camera parameters passed through verbatim.
    pub parameters: CompoundData,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            field_of_view: 54.43,
            resolution: UVec2::new(640, 480),
            pixel_aspect_ratio: 1.0,
            crop_window: None,
            clipping_planes: Vec2::new(0.01, 100_000.0),
            shutter: Vec2::ZERO,
            f_stop: 0.0,
            focal_length: 1.0,
            focus_distance: 1.0,
            screen_window: None,
            parameters: CompoundData::new(),
        }
    }
}

impl CameraData {
    #[must_use]
    pub fn with_resolution(mut self, x: u32, y: u32) -> Self {
        self.resolution = UVec2::new(x, y);
        self
    }

    #[must_use]
    pub fn with_crop_window(mut self, min: Vec2, max: Vec2) -> Self {
        self.crop_window = Some((min, max));
        self
    }

    #[must_use]
    pub fn with_shutter(mut self, open: f32, close: f32) -> Self {
        self.shutter = Vec2::new(open, close);
        self
    }

    /// Screen window fitted to the frame aspect: the wider axis spans
    /// `[-1, 1]`.
    #[must_use]
    pub fn screen_window(&self) -> (Vec2, Vec2) {
        if let Some(window) = self.screen_window {
            return window;
        }
        let aspect = self.resolution.x.max(1) as f32 * self.pixel_aspect_ratio
            / self.resolution.y.max(1) as f32;
        if aspect >= 1.0 {
            (Vec2::new(-1.0, -1.0 / aspect), Vec2::new(1.0, 1.0 / aspect))
        } else {
            (Vec2::new(-aspect, -1.0), Vec2::new(aspect, 1.0))
        }
    }

    /// Pixel region `(min_x, min_y, max_x, max_y)`, inclusive, derived from
    /// the crop window. `None` when the whole frame is rendered.
    #[must_use]
    pub fn render_region(&self) -> Option<[i32; 4]> {
        let (min, max) = self.crop_window?;
        let res = self.resolution.as_vec2();
        let lo = (min.clamp(Vec2::ZERO, Vec2::ONE) * res).round();
        let hi = (max.clamp(Vec2::ZERO, Vec2::ONE) * res).round() - Vec2::ONE;
        Some([lo.x as i32, lo.y as i32, hi.x as i32, hi.y as i32])
    }
}

impl ContentHash for CameraData {
    fn hash_into(&self, h: &mut ContentHasher) {
        h.write_str("CameraData");
        h.write_bool(self.projection == Projection::Orthographic);
        h.write_f32(self.field_of_view);
        h.write_u32(self.resolution.x);
        h.write_u32(self.resolution.y);
        h.write_f32(self.pixel_aspect_ratio);
        match self.crop_window {
            Some((min, max)) => {
                h.write_u8(1);
                min.hash_into(h);
                max.hash_into(h);
            }
            None => h.write_u8(0),
        }
        self.clipping_planes.hash_into(h);
        self.shutter.hash_into(h);
        h.write_f32(self.f_stop);
        h.write_f32(self.focal_length);
        h.write_f32(self.focus_distance);
        let (min, max) = self.screen_window();
        min.hash_into(h);
        max.hash_into(h);
        self.parameters.hash_into(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_screen_window_is_fitted() {
        let camera = CameraData::default();
        let (min, max) = camera.screen_window();
        assert!((min.x + 1.0).abs() < 1e-6);
        assert!((max.y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_render_region_from_crop_window() {
        let camera = CameraData::default()
            .with_resolution(100, 100)
            .with_crop_window(Vec2::new(0.25, 0.5), Vec2::new(0.75, 1.0));
        assert_eq!(camera.render_region(), Some([25, 50, 74, 99]));
        assert_eq!(CameraData::default().render_region(), None);
    }
}
