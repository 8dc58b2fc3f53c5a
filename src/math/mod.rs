mod fixed;
mod trig;

pub use fixed::{
    DEPTH_CLEAR, DEPTH_LIMIT, DEPTH_UNIT, FAR_PLANE, SCREEN_FRACT, TEX_FRACT,
    depth_to_z, mul_div, mul_div_i64,
};
pub use trig::{ANGLE_2PI, ANGLE_HALF_PI, ANGLE_PI, Angle, TRIG_FRACT, TrigTable, normalize_angle};
