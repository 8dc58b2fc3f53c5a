//! Scan-line rasterizer for horizontal surfaces (floors and ceilings).
//!
//! The clipped ring is projected and split into a left and a right
//! *stripe*: vertex chains running from the topmost to the bottommost
//! screen vertex. Sections between consecutive stripe vertices are filled
//! row by row. Each row has a single depth, from which the texture start
//! and per-pixel increments are derived once.

use glam::IVec2;
use smallvec::SmallVec;

use crate::{
    math::{DEPTH_LIMIT, SCREEN_FRACT, TEX_FRACT, TRIG_FRACT, depth_to_z, mul_div_i64},
    world::{Bitmap, Facing, MAX_POLYGON_VERTEX, MipLevel},
};

use super::{
    Viewport,
    clip::clip_polygon,
    frame::{FrameBuffer, depth_test},
    projection::Outcode,
};

type ScreenRing = SmallVec<[IVec2; MAX_POLYGON_VERTEX + 2]>;
type Stripe = SmallVec<[usize; MAX_POLYGON_VERTEX + 2]>;
type Slopes = SmallVec<[i64; MAX_POLYGON_VERTEX + 2]>;

/*──────────────────────── stripes ────────────────────────────────────*/

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Walk {
    Forward,
    Backward,
}

impl Walk {
    #[inline]
    fn next(self, i: usize, n: usize) -> usize {
        match self {
            Walk::Forward => (i + 1) % n,
            Walk::Backward => (i + n - 1) % n,
        }
    }
}

/// Which stripe(s) hit a vertex at the end of the current section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StopSide {
    End,
    Left,
    Right,
    Both,
}

/// Left/right vertex chains of a projected ring, top to bottom.
#[derive(Debug, PartialEq, Eq)]
struct Stripes {
    left: Stripe,
    right: Stripe,
}

impl Stripes {
    /// Seen from the painted side a ring clockwise from above is walked
    /// backward on the left for floors and forward for ceilings.
    fn build(pts: &[IVec2], facing: Facing, y_res: i32) -> Option<Self> {
        let n = pts.len();
        let (left_walk, right_walk) = match facing {
            Facing::Up => (Walk::Backward, Walk::Forward),
            Facing::Down => (Walk::Forward, Walk::Backward),
        };

        // extremities; horizontal top/bottom edges are split between sides
        let (mut hi_l, mut hi_r, mut lo_l, mut lo_r) = (0, 0, 0, 0);
        for i in 1..n {
            let y = pts[i].y;
            if y < pts[hi_l].y {
                hi_l = i;
                hi_r = i;
            } else if y == pts[hi_l].y {
                match facing {
                    Facing::Up if hi_r == i - 1 => hi_r = i,
                    Facing::Up => hi_l = i,
                    Facing::Down if hi_l == i - 1 => hi_l = i,
                    Facing::Down => hi_r = i,
                }
            }
            if y > pts[lo_l].y {
                lo_l = i;
                lo_r = i;
            } else if y == pts[lo_l].y {
                match facing {
                    Facing::Up if lo_l == i - 1 => lo_l = i,
                    Facing::Up => lo_r = i,
                    Facing::Down if lo_r == i - 1 => lo_r = i,
                    Facing::Down => lo_l = i,
                }
            }
        }

        // skip leading vertices above the screen
        let skip_above = |mut start: usize, walk: Walk| {
            if pts[start].y < 0 {
                for _ in 0..n {
                    let next = walk.next(start, n);
                    if pts[next].y > 0 {
                        break;
                    }
                    start = next;
                }
            }
            start
        };
        let left_start = skip_above(hi_l, left_walk);
        let right_start = skip_above(hi_r, right_walk);

        let chain = |start: usize, stop: usize, walk: Walk| {
            let mut s = Stripe::new();
            s.push(start);
            let mut i = start;
            while i != stop && pts[i].y < y_res && s.len() <= n {
                i = walk.next(i, n);
                s.push(i);
            }
            s
        };
        let left = chain(left_start, lo_l, left_walk);
        let right = chain(right_start, lo_r, right_walk);

        (left.len() >= 2 && right.len() >= 2).then_some(Self { left, right })
    }
}

/// ×4096 horizontal step per row along each stripe edge.
fn edge_slopes(pts: &[IVec2], stripe: &[usize]) -> Slopes {
    stripe
        .windows(2)
        .map(|w| {
            let (a, b) = (pts[w[0]], pts[w[1]]);
            let dy = b.y - a.y;
            if dy == 0 {
                0
            } else {
                (b.x - a.x) as i64 * SCREEN_FRACT as i64 / dy as i64
            }
        })
        .collect()
}

/*──────────────────────── span writing ───────────────────────────────*/

/// Texture walk along one row, ×4096 texels of the chosen level.
#[derive(Clone, Copy, Debug)]
struct TexWalk {
    col: u32,
    row: u32,
    d_col: u32,
    d_row: u32,
}

fn blit_plain(frame: &mut FrameBuffer, y: usize, x0: usize, x1: usize, color: u8, z: u16) {
    let (colors, depths) = frame.span_mut(y, x0, x1);
    for (c, d) in colors.iter_mut().zip(depths.iter_mut()) {
        if depth_test(*d, z) {
            *c = color;
            *d = z;
        }
    }
}

fn blit_textured(
    frame: &mut FrameBuffer,
    y: usize,
    x0: usize,
    x1: usize,
    mip: &MipLevel,
    mut walk: TexWalk,
    z: u16,
) {
    let col_mask = mip.x_res() as u32 - 1;
    let row_mask = mip.y_res() as u32 - 1;
    let (colors, depths) = frame.span_mut(y, x0, x1);
    for (c, d) in colors.iter_mut().zip(depths.iter_mut()) {
        if depth_test(*d, z) {
            *c = mip.texel(
                ((walk.col >> 12) & col_mask) as usize,
                ((walk.row >> 12) & row_mask) as usize,
            );
            *d = z;
        }
        walk.col = walk.col.wrapping_add(walk.d_col);
        walk.row = walk.row.wrapping_add(walk.d_row);
    }
}

/*──────────────────────── surface rendering ──────────────────────────*/

/// Per-surface constants shared by every row.
struct SurfaceCtx<'a> {
    bitmap: &'a Bitmap,
    /// surface height relative to the eye
    rel_level: i32,
}

impl Viewport {
    /// Rasterize a horizontal polygon at height `level`.
    ///
    /// `ring` is clockwise seen from above. Floors ([`Facing::Up`]) are only
    /// drawn from above, ceilings ([`Facing::Down`]) only from below.
    pub fn render_horizontal_surface(
        &mut self,
        ring: &[IVec2],
        level: i32,
        facing: Facing,
        bitmap: &Bitmap,
    ) {
        let rel_level = level - self.view.origin().z;
        let painted_side = match facing {
            Facing::Up => rel_level <= 0,
            Facing::Down => rel_level >= 0,
        };
        if !painted_side || ring.len() > MAX_POLYGON_VERTEX {
            log::trace!("surface at {level} seen from the wrong side or too large");
            return;
        }

        let rotated: ScreenRing = ring.iter().map(|&p| self.view.apply_2d(p)).collect();
        let Some(clipped) = clip_polygon(&rotated, self.proj.depth_range()) else {
            log::trace!("surface at {level} outside the depth range");
            return;
        };

        let proj = self.proj;
        let scroll = self.camera.scroll;
        let level_f = proj.level_factor(rel_level);
        let mut shared = Outcode::all();
        let screen: ScreenRing = clipped
            .iter()
            .map(|p| {
                let s = IVec2::new(proj.screen_x(*p), proj.screen_y(level_f, p.x, scroll));
                shared &= proj.screen_side(s.x, s.y);
                s
            })
            .collect();
        if !shared.is_empty() {
            log::trace!("surface at {level} off screen ({shared:?})");
            return;
        }

        let Some(stripes) = Stripes::build(&screen, facing, proj.y_res) else {
            return;
        };
        let ctx = SurfaceCtx { bitmap, rel_level };
        self.fill_stripes(&screen, &stripes, &ctx);
    }

    fn fill_stripes(&mut self, pts: &[IVec2], stripes: &Stripes, ctx: &SurfaceCtx<'_>) {
        let (left, right) = (&stripes.left, &stripes.right);
        let dl = edge_slopes(pts, left);
        let dr = edge_slopes(pts, right);
        let fract = SCREEN_FRACT as i64;
        let y_res = self.proj.y_res;

        let (mut li, mut ri) = (0usize, 0usize);
        // both stripes start on or above row 0 when the top is clipped
        let (l0, r0) = (pts[left[0]], pts[right[0]]);
        let mut line = l0.y.max(0);
        let mut lx = l0.x as i64 * fract - l0.y.min(0) as i64 * dl[0];
        let mut rx = r0.x as i64 * fract - r0.y.min(0) as i64 * dr[0];
        let mut left_stop = pts[left[1]].y;
        let mut right_stop = pts[right[1]].y;

        loop {
            let (side, stop) = if left_stop <= right_stop {
                if left_stop >= y_res {
                    (StopSide::End, y_res)
                } else if li + 2 >= left.len() {
                    (StopSide::End, left_stop)
                } else if left_stop == right_stop {
                    if ri + 2 >= right.len() {
                        (StopSide::End, left_stop)
                    } else {
                        (StopSide::Both, left_stop)
                    }
                } else {
                    (StopSide::Left, left_stop)
                }
            } else if right_stop >= y_res {
                (StopSide::End, y_res)
            } else if ri + 2 >= right.len() {
                (StopSide::End, right_stop)
            } else {
                (StopSide::Right, right_stop)
            };

            while line < stop {
                self.fill_row(line, (lx >> 12) as i32, (rx >> 12) as i32, ctx);
                line += 1;
                lx += dl[li];
                rx += dr[ri];
            }

            if matches!(side, StopSide::Left | StopSide::Both) {
                li += 1;
                lx = pts[left[li]].x as i64 * fract;
                left_stop = pts[left[li + 1]].y;
            }
            if matches!(side, StopSide::Right | StopSide::Both) {
                ri += 1;
                rx = pts[right[ri]].x as i64 * fract;
                right_stop = pts[right[ri + 1]].y;
            }
            if side == StopSide::End {
                break;
            }
        }
    }

    /// Depth (mm ×8) seen by screen row `line`, `None` on the horizon.
    fn row_depth_8(&self, line: i32, rel_level: i32) -> Option<i64> {
        let dy = line - self.proj.center_y(self.camera.scroll);
        if dy == 0 {
            return None;
        }
        Some(mul_div_i64(
            -(rel_level as i64) * 8,
            self.proj.y_num,
            self.proj.y_den * dy as i64,
        ))
    }

    fn fill_row(&mut self, line: i32, left: i32, right: i32, ctx: &SurfaceCtx<'_>) {
        if line < 0 || line >= self.proj.y_res {
            return;
        }
        let x0 = left.max(0);
        let x1 = right.min(self.proj.x_res);
        if x1 <= x0 {
            return;
        }
        let (y, x0, x1) = (line as usize, x0 as usize, x1 as usize);
        let bitmap = ctx.bitmap;

        let Some(depth_8) = self.row_depth_8(line, ctx.rel_level) else {
            blit_plain(&mut self.frame, y, x0, x1, bitmap.plain_color(), DEPTH_LIMIT);
            return;
        };
        if depth_8 <= 0 {
            return;
        }
        let z = depth_to_z(depth_8 / 8, self.proj.near);

        // sampling pitch from the depth change to the neighbouring row
        let center = self.proj.center_y(self.camera.scroll);
        let neighbour = if line - 1 == center { line + 1 } else { line - 1 };
        let col_scale = bitmap.max_x_res() as i64 * TEX_FRACT as i64;
        let pitch = self
            .row_depth_8(neighbour, ctx.rel_level)
            .map_or(i64::MAX, |d| {
                mul_div_i64((d - depth_8).abs(), col_scale, 8 * bitmap.width() as i64)
            });

        let Some(level) = bitmap.best_level_for_pitch(pitch) else {
            blit_plain(&mut self.frame, y, x0, x1, bitmap.plain_color(), z);
            return;
        };

        let walk = self.row_walk(depth_8, x0 as i32, bitmap, level);
        blit_textured(&mut self.frame, y, x0, x1, bitmap.level(level), walk, z);
    }

    /// Texture position of pixel `x0` and per-pixel increments for a row at
    /// `depth_8 / 8` mm.
    fn row_walk(&self, depth_8: i64, x0: i32, bitmap: &Bitmap, level: usize) -> TexWalk {
        let eye = self.view.origin();
        let (cos, sin) = self.view.yaw();
        let f8 = TRIG_FRACT as i64 * 8;
        let (x_num, x_den) = (self.proj.x_num, self.proj.x_den);
        let col_scale = bitmap.max_x_res() as i64 * TEX_FRACT as i64;
        let row_scale = bitmap.max_y_res() as i64 * TEX_FRACT as i64;
        let (w, h) = (bitmap.width() as i64, bitmap.height() as i64);

        // world point under the screen center, then the lateral walk
        let col_center = mul_div_i64(eye.x as i64 * f8 + depth_8 * cos, col_scale, f8 * w);
        let row_center = -mul_div_i64(eye.y as i64 * f8 + depth_8 * sin, row_scale, f8 * h);
        // lateral world step per pixel (mm ×8 ×TRIG_FRACT), then texels
        let step_x = mul_div_i64(depth_8 * sin, x_den, x_num);
        let step_y = mul_div_i64(depth_8 * cos, x_den, x_num);
        let d_col = mul_div_i64(step_x, col_scale, f8 * w);
        let d_row = mul_div_i64(step_y, row_scale, f8 * h);

        let s = (x0 - self.proj.half_x()) as i64;
        let (xs, ys) = (bitmap.x_shift(level), bitmap.y_shift(level));
        TexWalk {
            col: ((col_center + s * d_col) >> xs) as u32,
            row: ((row_center + s * d_row) >> ys) as u32,
            d_col: (d_col >> xs) as u32,
            d_row: (d_row >> ys) as u32,
        }
    }
}
