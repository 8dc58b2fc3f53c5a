/// Integer angle: a full turn is [`ANGLE_2PI`] units, counter-clockwise
/// seen from above, 0 looking down +X.
pub type Angle = i32;

pub const ANGLE_2PI: Angle = 4096;
pub const ANGLE_PI: Angle = ANGLE_2PI / 2;
pub const ANGLE_HALF_PI: Angle = ANGLE_2PI / 4;

/// Scale of the values stored in [`TrigTable`].
pub const TRIG_FRACT: i32 = 16384;

/// Wrap any angle into `0 .. ANGLE_2PI`.
#[inline(always)]
pub fn normalize_angle(a: Angle) -> Angle {
    a & (ANGLE_2PI - 1)
}

/// Sine / cosine lookup, one entry per angle unit.
///
/// Built once when a viewport is configured; the rasterizers only index it.
#[derive(Clone, Debug)]
pub struct TrigTable {
    sin: Box<[i32]>,
    cos: Box<[i32]>,
}

impl Default for TrigTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TrigTable {
    pub fn new() -> Self {
        let step = std::f64::consts::TAU / ANGLE_2PI as f64;
        let scale = TRIG_FRACT as f64;
        let (sin, cos): (Vec<i32>, Vec<i32>) = (0..ANGLE_2PI)
            .map(|a| {
                let (s, c) = (a as f64 * step).sin_cos();
                ((s * scale).round() as i32, (c * scale).round() as i32)
            })
            .unzip();
        Self {
            sin: sin.into_boxed_slice(),
            cos: cos.into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub fn sin(&self, a: Angle) -> i32 {
        self.sin[normalize_angle(a) as usize]
    }

    #[inline(always)]
    pub fn cos(&self, a: Angle) -> i32 {
        self.cos[normalize_angle(a) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinal_angles() {
        let t = TrigTable::new();
        assert_eq!(t.cos(0), TRIG_FRACT);
        assert_eq!(t.sin(0), 0);
        assert_eq!(t.sin(ANGLE_HALF_PI), TRIG_FRACT);
        assert_eq!(t.cos(ANGLE_PI), -TRIG_FRACT);
        assert_eq!(t.sin(-ANGLE_HALF_PI), -TRIG_FRACT);
    }

    #[test]
    fn angles_wrap() {
        let t = TrigTable::new();
        assert_eq!(t.sin(ANGLE_2PI + 300), t.sin(300));
        assert_eq!(normalize_angle(-1), ANGLE_2PI - 1);
    }
}
