//! ---------------------------------------------------------------------------
//! Fixed-point software viewport
//!
//! * Renders into an 8-bit palette-indexed color buffer plus a 16-bit depth
//!   buffer (one unit = 64 mm, nearest wins, ties overwrite).
//! * Every per-pixel loop is integer only; the few divisions happen per
//!   column (walls) or per scan-line (floors, triangles).
//! * Resolution-dependent tables are rebuilt by [`Viewport::reconfigure`].
//! ---------------------------------------------------------------------------

mod background;
mod clip;
mod frame;
mod patch;
mod planes;
mod projection;
mod walls;

pub use background::BackgroundTable;
pub use clip::{ClippedRing, DepthClass, DepthRange, clip_polygon, clip_segment};
pub use frame::{FrameBuffer, depth_test};
pub use patch::{PatchTriangle, TriangleOrder};
pub use projection::{Outcode, Projection};

use glam::IVec2;
use thiserror::Error;

use crate::{
    math::{ANGLE_PI, Angle, TrigTable},
    renderer::{PaletteIndex, Renderer, WallTexture},
    world::{Bitmap, Camera, Facing, Panorama, Patch, PositionMatrix, ViewTransform, WallSurface},
};

/// Largest supported resolution on either axis.
pub const MAX_RES: usize = 4096;

/*───────────────────────────────────────────────────────────────────────*/
/*                              Config                                  */
/*───────────────────────────────────────────────────────────────────────*/

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewportError {
    #[error("resolution {x_res}x{y_res} outside 2..={MAX_RES}")]
    Resolution { x_res: usize, y_res: usize },

    #[error("projection plane must be positive (dist {dist}, half-width {hw}, half-height {vw})")]
    Plane { dist: i32, hw: i32, vw: i32 },
}

/// Resolution and projection plane of a viewport, all distances in mm.
///
/// `plane_hw` / `plane_vw` are the half-extents of the projection plane at
/// distance `plane_dist`; `plane_dist` is also the near clipping plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportConfig {
    pub x_res: usize,
    pub y_res: usize,
    pub plane_dist: i32,
    pub plane_hw: i32,
    pub plane_vw: i32,
}

impl Default for ViewportConfig {
    /// 320×240, 90° horizontal field, square pixels.
    fn default() -> Self {
        Self {
            x_res: 320,
            y_res: 240,
            plane_dist: 1_000,
            plane_hw: 1_000,
            plane_vw: 750,
        }
    }
}

impl ViewportConfig {
    /// Square-pixel config from a horizontal field of view.
    pub fn with_fov(x_res: usize, y_res: usize, fov: Angle, plane_dist: i32) -> Self {
        let half = fov.clamp(1, ANGLE_PI - 1) as f64 * std::f64::consts::PI / ANGLE_PI as f64 / 2.0;
        let hw = (plane_dist as f64 * half.tan()).round() as i32;
        let vw = (hw as f64 * y_res as f64 / x_res.max(1) as f64).round() as i32;
        Self {
            x_res,
            y_res,
            plane_dist,
            plane_hw: hw,
            plane_vw: vw,
        }
    }

    pub fn validate(&self) -> Result<(), ViewportError> {
        let res_ok = |r: usize| (2..=MAX_RES).contains(&r);
        if !res_ok(self.x_res) || !res_ok(self.y_res) {
            return Err(ViewportError::Resolution {
                x_res: self.x_res,
                y_res: self.y_res,
            });
        }
        if self.plane_dist <= 0 || self.plane_hw <= 0 || self.plane_vw <= 0 {
            return Err(ViewportError::Plane {
                dist: self.plane_dist,
                hw: self.plane_hw,
                vw: self.plane_vw,
            });
        }
        Ok(())
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                              Viewport                                */
/*───────────────────────────────────────────────────────────────────────*/

/// Software rasterizer state: buffers, camera and per-resolution tables.
pub struct Viewport {
    config: ViewportConfig,
    proj: Projection,
    frame: FrameBuffer,
    trig: TrigTable,
    background: BackgroundTable,
    camera: Camera,
    view: ViewTransform,
    clear_color: PaletteIndex,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Result<Self, ViewportError> {
        config.validate()?;
        let trig = TrigTable::new();
        let camera = Camera::default();
        let view = camera.view(&trig);
        let vp = Self {
            proj: Projection::new(&config),
            frame: FrameBuffer::new(config.x_res, config.y_res),
            background: BackgroundTable::new(&config),
            trig,
            camera,
            view,
            config,
            clear_color: 0,
        };
        log::debug!(
            "viewport {}x{} plane dist {} hw {} vw {}",
            config.x_res,
            config.y_res,
            config.plane_dist,
            config.plane_hw,
            config.plane_vw
        );
        Ok(vp)
    }

    /// Change resolution / projection plane; buffers and tables are rebuilt.
    pub fn reconfigure(&mut self, config: ViewportConfig) -> Result<(), ViewportError> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }
        self.config = config;
        self.proj = Projection::new(&config);
        self.frame.resize(config.x_res, config.y_res);
        self.background = BackgroundTable::new(&config);
        log::debug!("viewport reconfigured to {}x{}", config.x_res, config.y_res);
        Ok(())
    }

    /// Freeze the eye for the primitives that follow.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.view = camera.view(&self.trig);
    }

    pub fn set_clear_color(&mut self, color: PaletteIndex) {
        self.clear_color = color;
    }

    #[inline]
    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn trig(&self) -> &TrigTable {
        &self.trig
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.proj
    }

    #[inline]
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    #[inline]
    pub fn color(&self) -> &[PaletteIndex] {
        self.frame.color()
    }

    #[inline]
    pub fn depth(&self) -> &[u16] {
        self.frame.depth()
    }

    pub fn pixel(&self, x: usize, y: usize) -> PaletteIndex {
        self.frame.pixel(x, y)
    }

    pub fn depth_at(&self, x: usize, y: usize) -> u16 {
        self.frame.depth_at(x, y)
    }

    pub fn clear(&mut self) {
        self.frame.clear(self.clear_color);
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl Renderer for Viewport {
    fn begin_frame(&mut self) {
        self.clear();
    }

    fn draw_background(&mut self, panorama: &Panorama) {
        self.render_background(panorama);
    }

    fn draw_wall(&mut self, wall: &WallSurface, texture: &WallTexture<'_>) {
        self.render_wall(wall, texture);
    }

    fn draw_horizontal_surface(
        &mut self,
        ring: &[IVec2],
        level: i32,
        facing: Facing,
        bitmap: &Bitmap,
    ) {
        self.render_horizontal_surface(ring, level, facing, bitmap);
    }

    fn draw_patch(&mut self, patch: &dyn Patch, matrix: &PositionMatrix, bitmap: &Bitmap) {
        self.render_patch(patch, matrix, bitmap);
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[PaletteIndex], &[u16], usize, usize),
    {
        submit(
            self.frame.color(),
            self.frame.depth(),
            self.frame.width(),
            self.frame.height(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ANGLE_HALF_PI, DEPTH_CLEAR};

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ViewportConfig::default().validate(), Ok(()));
    }

    #[test]
    fn fov_config_matches_default() {
        let cfg = ViewportConfig::with_fov(320, 240, ANGLE_HALF_PI, 1_000);
        assert_eq!(cfg, ViewportConfig::default());
    }

    #[test]
    fn bad_configs_are_rejected() {
        let mut cfg = ViewportConfig::default();
        cfg.x_res = 0;
        assert!(matches!(
            Viewport::new(cfg),
            Err(ViewportError::Resolution { .. })
        ));
        let mut cfg = ViewportConfig::default();
        cfg.plane_vw = 0;
        assert!(matches!(Viewport::new(cfg), Err(ViewportError::Plane { .. })));
    }

    #[test]
    fn reconfigure_resizes_buffers() {
        let mut vp = Viewport::new(ViewportConfig::default()).unwrap();
        let cfg = ViewportConfig::with_fov(64, 48, ANGLE_HALF_PI, 500);
        vp.reconfigure(cfg).unwrap();
        assert_eq!(vp.color().len(), 64 * 48);
        assert!(vp.depth().iter().all(|&z| z == DEPTH_CLEAR));
    }

    #[test]
    fn end_frame_loans_buffers() {
        let mut vp = Viewport::new(ViewportConfig::default()).unwrap();
        vp.set_clear_color(9);
        vp.begin_frame();
        let mut seen = None;
        vp.end_frame(|c, d, w, h| seen = Some((c[0], d[0], w, h)));
        assert_eq!(seen, Some((9, DEPTH_CLEAR, 320, 240)));
    }
}
