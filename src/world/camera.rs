use glam::{IVec2, IVec3, ivec2, ivec3};

use crate::math::{Angle, TRIG_FRACT, TrigTable, normalize_angle};

/// Eye point in world space.
///
/// * Only **yaw** is modelled; looking up/down is faked with `scroll`,
///   a vertical shift of the horizon in pixels.
/// * Coordinates are millimetres: X/Y on the ground plane, Z up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Camera {
    pub pos: IVec3,
    pub orientation: Angle,
    pub scroll: i32,
}

impl Camera {
    pub fn new(pos: IVec3, orientation: Angle) -> Self {
        Self {
            pos,
            orientation: normalize_angle(orientation),
            scroll: 0,
        }
    }

    pub fn with_scroll(mut self, scroll: i32) -> Self {
        self.scroll = scroll;
        self
    }

    /// Rotate around Z (positive = turn left).
    pub fn turn(&mut self, delta: Angle) {
        self.orientation = normalize_angle(self.orientation + delta);
    }

    /// Move by `forward` mm along the heading and `side` mm to the right.
    pub fn step(&mut self, trig: &TrigTable, forward: i32, side: i32) {
        let c = trig.cos(self.orientation) as i64;
        let s = trig.sin(self.orientation) as i64;
        let (f, r) = (forward as i64, side as i64);
        self.pos.x += ((f * c + r * s) / TRIG_FRACT as i64) as i32;
        self.pos.y += ((f * s - r * c) / TRIG_FRACT as i64) as i32;
    }

    /// Freeze the rotation for one frame.
    pub fn view(&self, trig: &TrigTable) -> ViewTransform {
        ViewTransform {
            origin: self.pos,
            cos: trig.cos(self.orientation) as i64,
            sin: trig.sin(self.orientation) as i64,
        }
    }
}

/// World → view space: translation by the eye, rotation by `-orientation`.
///
/// Output `x` is depth along the view axis, `y` the lateral offset
/// (positive = left of the view axis), `z` the height relative to the eye.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewTransform {
    origin: IVec3,
    cos: i64,
    sin: i64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            origin: IVec3::ZERO,
            cos: TRIG_FRACT as i64,
            sin: 0,
        }
    }
}

impl ViewTransform {
    #[inline]
    pub fn apply(&self, p: IVec3) -> IVec3 {
        let r = self.apply_2d(p.truncate());
        ivec3(r.x, r.y, p.z - self.origin.z)
    }

    #[inline]
    pub fn apply_2d(&self, p: IVec2) -> IVec2 {
        let dx = p.x as i64 - self.origin.x as i64;
        let dy = p.y as i64 - self.origin.y as i64;
        let f = TRIG_FRACT as i64;
        ivec2(
            ((dx * self.cos + dy * self.sin) / f) as i32,
            ((dy * self.cos - dx * self.sin) / f) as i32,
        )
    }

    /// Eye position in world space.
    #[inline]
    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    /// `(cos, sin)` of the yaw, scaled by [`TRIG_FRACT`].
    #[inline]
    pub fn yaw(&self) -> (i64, i64) {
        (self.cos, self.sin)
    }
}

/// Placement of an object (e.g. a patch) in the world: a yaw plus a
/// translation applied to object-local coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionMatrix {
    pub orientation: Angle,
    pub translation: IVec3,
}

impl PositionMatrix {
    pub fn new(orientation: Angle, translation: IVec3) -> Self {
        Self {
            orientation: normalize_angle(orientation),
            translation,
        }
    }

    pub fn to_world(&self, trig: &TrigTable, local: IVec3) -> IVec3 {
        let c = trig.cos(self.orientation) as i64;
        let s = trig.sin(self.orientation) as i64;
        let (lx, ly) = (local.x as i64, local.y as i64);
        let f = TRIG_FRACT as i64;
        ivec3(
            ((lx * c - ly * s) / f) as i32 + self.translation.x,
            ((lx * s + ly * c) / f) as i32 + self.translation.y,
            local.z + self.translation.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ANGLE_HALF_PI;

    #[test]
    fn view_axes_align() {
        let trig = TrigTable::new();
        let view = Camera::new(IVec3::ZERO, 0).view(&trig);
        // straight ahead → depth only
        assert_eq!(view.apply_2d(ivec2(10_000, 0)), ivec2(10_000, 0));
        // to the left → positive lateral
        assert_eq!(view.apply_2d(ivec2(0, 5_000)), ivec2(0, 5_000));
    }

    #[test]
    fn view_rotated_yaw() {
        let trig = TrigTable::new();
        let view = Camera::new(IVec3::ZERO, ANGLE_HALF_PI).view(&trig);
        // yaw = 90°: forward is +Y
        assert_eq!(view.apply_2d(ivec2(0, 10_000)), ivec2(10_000, 0));
        // +X is now on the right
        assert_eq!(view.apply_2d(ivec2(10_000, 0)), ivec2(0, -10_000));
    }

    #[test]
    fn view_translates_height() {
        let trig = TrigTable::new();
        let view = Camera::new(ivec3(1_000, 2_000, 1_500), 0).view(&trig);
        assert_eq!(view.apply(ivec3(3_000, 2_000, 0)), ivec3(2_000, 0, -1_500));
    }

    #[test]
    fn step_follows_heading() {
        let trig = TrigTable::new();
        let mut cam = Camera::new(IVec3::ZERO, ANGLE_HALF_PI);
        cam.step(&trig, 1_000, 0);
        assert_eq!(cam.pos, ivec3(0, 1_000, 0));
        cam.step(&trig, 0, 500);
        assert_eq!(cam.pos, ivec3(500, 1_000, 0));
    }

    #[test]
    fn position_matrix_rotates_then_translates() {
        let trig = TrigTable::new();
        let m = PositionMatrix::new(ANGLE_HALF_PI, ivec3(100, 200, 300));
        assert_eq!(m.to_world(&trig, ivec3(1_000, 0, 5)), ivec3(100, 1_200, 305));
    }
}
