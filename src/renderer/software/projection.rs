use bitflags::bitflags;
use glam::IVec2;

use crate::math::{FAR_PLANE, mul_div_i64};

use super::{ViewportConfig, clip::DepthRange};

bitflags! {
    /// Where a projected point lies relative to the view volume.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Outcode: u8 {
        const LEFT   = 0x01;
        const RIGHT  = 0x02;
        const TOP    = 0x04;
        const BOTTOM = 0x08;
        /// Closer than half the projection-plane distance.
        const FRONT  = 0x10;
        /// Beyond the depth buffer range.
        const BACK   = 0x20;
    }
}

/// Perspective constants derived from a [`ViewportConfig`].
///
/// Screen X of a view-space point `(depth, lateral)` is
/// `-lateral * x_num / (depth * x_den) + x_res / 2`, and screen Y of a
/// height `h` is `-h * y_num / (depth * y_den) + y_res / 2 + scroll`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Projection {
    pub x_res: i32,
    pub y_res: i32,
    pub near: i32,
    /// `x_res * plane_dist`
    pub x_num: i64,
    /// `2 * plane_hw`
    pub x_den: i64,
    /// `y_res * plane_dist`
    pub y_num: i64,
    /// `2 * plane_vw`
    pub y_den: i64,
}

impl Projection {
    pub fn new(cfg: &ViewportConfig) -> Self {
        Self {
            x_res: cfg.x_res as i32,
            y_res: cfg.y_res as i32,
            near: cfg.plane_dist,
            x_num: cfg.x_res as i64 * cfg.plane_dist as i64,
            x_den: 2 * cfg.plane_hw as i64,
            y_num: cfg.y_res as i64 * cfg.plane_dist as i64,
            y_den: 2 * cfg.plane_vw as i64,
        }
    }

    #[inline]
    pub fn depth_range(&self) -> DepthRange {
        DepthRange {
            near: self.near,
            far: FAR_PLANE,
        }
    }

    #[inline]
    pub fn half_x(&self) -> i32 {
        self.x_res / 2
    }

    /// Row of the horizon for a given scroll.
    #[inline]
    pub fn center_y(&self, scroll: i32) -> i32 {
        self.y_res / 2 + scroll
    }

    /// Screen column of a view-space point. `p.x` must be positive.
    #[inline]
    pub fn screen_x(&self, p: IVec2) -> i32 {
        debug_assert!(p.x > 0);
        let off = mul_div_i64(-(p.y as i64), self.x_num, p.x as i64 * self.x_den);
        clamp_i32(off) + self.half_x()
    }

    /// Height pre-multiplied by the vertical projection scale; divide by
    /// depth to get the row offset from the horizon.
    #[inline]
    pub fn level_factor(&self, height: i32) -> i64 {
        mul_div_i64(height as i64, self.y_num, self.y_den)
    }

    /// Screen row of a height (already run through [`Self::level_factor`]).
    #[inline]
    pub fn screen_y(&self, level_factor: i64, depth: i32, scroll: i32) -> i32 {
        debug_assert!(depth > 0);
        clamp_i32(-level_factor / depth as i64) + self.center_y(scroll)
    }

    /// Screen-edge classification of a projected point.
    #[inline]
    pub fn screen_side(&self, x: i32, y: i32) -> Outcode {
        let mut code = Outcode::empty();
        if x <= 0 {
            code |= Outcode::LEFT;
        } else if x >= self.x_res {
            code |= Outcode::RIGHT;
        }
        if y <= 0 {
            code |= Outcode::TOP;
        } else if y >= self.y_res {
            code |= Outcode::BOTTOM;
        }
        code
    }
}

/// Keep projected coordinates far from `i32` overflow in later ×4096 maths.
#[inline(always)]
fn clamp_i32(v: i64) -> i32 {
    const LIMIT: i64 = 1 << 24;
    v.clamp(-LIMIT, LIMIT) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::ivec2;

    fn proj() -> Projection {
        Projection::new(&ViewportConfig::default())
    }

    #[test]
    fn center_ray_hits_screen_center() {
        let p = proj();
        assert_eq!(p.screen_x(ivec2(5_000, 0)), 160);
        assert_eq!(p.screen_y(p.level_factor(0), 5_000, 0), 120);
    }

    #[test]
    fn left_is_positive_lateral() {
        let p = proj();
        // 90° field: lateral == depth lands on the left edge
        assert_eq!(p.screen_x(ivec2(2_000, 2_000)), 0);
        assert_eq!(p.screen_x(ivec2(2_000, -2_000)), 320);
        assert!(p.screen_x(ivec2(2_000, 500)) < 160);
    }

    #[test]
    fn heights_above_eye_go_up() {
        let p = proj();
        let up = p.screen_y(p.level_factor(500), 2_000, 0);
        let down = p.screen_y(p.level_factor(-500), 2_000, 0);
        assert_eq!(up, 80);
        assert_eq!(down, 160);
        assert_eq!(p.screen_y(p.level_factor(-500), 2_000, 10), 170);
    }

    #[test]
    fn outcodes() {
        let p = proj();
        assert_eq!(p.screen_side(10, 10), Outcode::empty());
        assert_eq!(p.screen_side(-5, 300), Outcode::LEFT | Outcode::BOTTOM);
        assert_eq!(p.screen_side(320, 0), Outcode::RIGHT | Outcode::TOP);
    }
}
