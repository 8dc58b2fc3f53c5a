//! Fixed-point scales and the widened multiply-divide used at every
//! projection divide.

/// Sub-pixel scale carried by incremental screen coordinates.
pub const SCREEN_FRACT: i32 = 4096;

/// Sub-texel scale carried by incremental texture coordinates.
pub const TEX_FRACT: i32 = 4096;

/// Millimetres per depth-buffer unit.
pub const DEPTH_UNIT: i32 = 64;

/// Largest depth a rasterizer ever stores.
pub const DEPTH_LIMIT: u16 = 0xFFFE;

/// Value the depth buffer holds before anything was drawn.
pub const DEPTH_CLEAR: u16 = 0xFFFF;

/// Far clipping plane in millimetres.
pub const FAR_PLANE: i32 = DEPTH_UNIT * DEPTH_LIMIT as i32;

/// `a * b / c` with a 64-bit intermediate product, saturated to `i32`.
///
/// A zero divisor yields 0; every caller guards against it first.
#[inline]
pub fn mul_div(a: i32, b: i32, c: i32) -> i32 {
    debug_assert_ne!(c, 0, "mul_div by zero");
    saturate(mul_div_i64(a as i64, b as i64, c as i64))
}

/// `a * b / c` on 64-bit operands with a 128-bit intermediate product.
#[inline]
pub fn mul_div_i64(a: i64, b: i64, c: i64) -> i64 {
    if c == 0 {
        return 0;
    }
    let q = (a as i128 * b as i128) / c as i128;
    q.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[inline(always)]
fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Convert a view-space depth (mm) into a depth-buffer value.
#[inline]
pub fn depth_to_z(depth_mm: i64, near: i32) -> u16 {
    let clamped = depth_mm.max(near as i64) / DEPTH_UNIT as i64;
    clamped.min(DEPTH_LIMIT as i64) as u16
}
