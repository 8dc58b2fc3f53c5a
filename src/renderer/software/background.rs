//! Cylindrical background, drawn behind everything without depth.
//!
//! Each screen column samples the panorama column facing its ray: the yaw
//! plus a fixed per-column angle (smaller steps toward the screen edges).
//! Vertically, screen rows map to elevation angles through a per-row table,
//! so source rows are packed denser near the horizon.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::{
    math::{ANGLE_2PI, ANGLE_HALF_PI},
    world::Panorama,
};

use super::{Viewport, ViewportConfig};

/// Scale of [`BackgroundTable`] elevation entries: a quarter turn.
const ELEVATION_FRACT: f64 = 65536.0;
/// Scale of the per-column perspective factor.
const COLUMN_SCALE_FRACT: f64 = 1024.0;
/// `log2(ELEVATION_FRACT * COLUMN_SCALE_FRACT)`
const ROW_SHIFT: u32 = 26;

/// Per-resolution constants of the background blit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundTable {
    /// ray angle of each column relative to the view axis (angle units,
    /// positive to the right)
    column_angle: Box<[i32]>,
    /// cosine of that angle, ×1024
    column_scale: Box<[i32]>,
    /// elevation of the row `r` pixels away from the horizon, as a
    /// fraction of a quarter turn ×65536
    row_elevation: Box<[i32]>,
}

impl BackgroundTable {
    pub fn new(cfg: &ViewportConfig) -> Self {
        let half_x = (cfg.x_res / 2) as f64;
        let col_slope = 2.0 * cfg.plane_hw as f64 / (cfg.x_res as f64 * cfg.plane_dist as f64);
        let row_slope = 2.0 * cfg.plane_vw as f64 / (cfg.y_res as f64 * cfg.plane_dist as f64);

        let (column_angle, column_scale): (Vec<i32>, Vec<i32>) = (0..cfg.x_res)
            .map(|c| {
                let theta = ((c as f64 - half_x) * col_slope).atan();
                (
                    (theta * ANGLE_2PI as f64 / TAU).round() as i32,
                    (theta.cos() * COLUMN_SCALE_FRACT).round() as i32,
                )
            })
            .unzip();

        let row_elevation = (0..=cfg.y_res)
            .map(|r| ((r as f64 * row_slope).atan() / FRAC_PI_2 * ELEVATION_FRACT).round() as i32)
            .collect();

        Self {
            column_angle: column_angle.into_boxed_slice(),
            column_scale: column_scale.into_boxed_slice(),
            row_elevation,
        }
    }

    #[inline]
    pub fn column_angle(&self, col: usize) -> i32 {
        self.column_angle[col]
    }

    #[inline]
    pub fn row_elevation(&self, r: usize) -> i32 {
        self.row_elevation[r]
    }
}

impl Viewport {
    /// Blit the panorama for the current yaw. Depth is neither read nor
    /// written; submit it first each frame.
    pub fn render_background(&mut self, pano: &Panorama) {
        let y_res = self.proj.y_res;
        let horizon_line = self.proj.center_y(self.camera.scroll) - 1;
        if horizon_line < 0 {
            return;
        }
        let horizon_line = horizon_line.min(y_res - 1) as usize;
        let bottom = (horizon_line as i32 + 1 + y_res / 8).min(y_res) as usize;

        let width = pano.width() as i64;
        let top_row = pano.height() - 1;
        let horizon_row = pano.horizon();
        let rows_above = (pano.height() - horizon_row) as i64;
        let base = (ANGLE_HALF_PI - self.camera.orientation) as i64;
        let table = &self.background;

        for x in 0..self.proj.x_res as usize {
            let angle = (base + table.column_angle[x] as i64).rem_euclid(ANGLE_2PI as i64);
            let texels = pano.column((angle * width / ANGLE_2PI as i64) as usize);
            let mul = table.column_scale[x] as i64 * rows_above;
            let offset = |r: usize| ((table.row_elevation[r] as i64 * mul) >> ROW_SHIFT) as usize;

            // upward from the horizon, then the band below it
            for r in 0..=horizon_line {
                let src = (horizon_row + offset(r)).min(top_row);
                self.frame.put(x, horizon_line - r, texels[src]);
            }
            for y in horizon_line + 1..bottom {
                let src = horizon_row.saturating_sub(offset(y - horizon_line));
                self.frame.put(x, y, texels[src]);
            }
        }
    }
}
