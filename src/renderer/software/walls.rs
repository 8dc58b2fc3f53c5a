//! Column rasterizer for vertical walls.
//!
//! A wall is back-face culled, rotated into view space, clipped to the
//! depth range and projected. Its top and bottom edges are then stepped
//! column by column in ×4096 screen units; per column, the point of the
//! wall hit by that column's ray gives the depth and the texture column.

use crate::{
    math::{SCREEN_FRACT, depth_to_z, mul_div_i64},
    renderer::WallTexture,
    world::{Bitmap, MipLevel, WallSurface},
};

use super::{Viewport, clip::clip_segment, frame::FrameBuffer};

/// Sub-texel scale of the vertical texel step.
const PIXEL_FRACT: i64 = 2048;

/// Rows drawn past the projected bottom edge so adjacent walls meet.
const BOTTOM_OVERDRAW: i64 = 2;

/*──────────────────────── helper structs ─────────────────────────────*/

/// Top/bottom of the current column, ×4096, and their per-column steps.
#[derive(Clone, Copy, Debug)]
struct EdgeCursor {
    top: i64,
    bottom: i64,
    d_top: i64,
    d_bottom: i64,
}

impl EdgeCursor {
    #[inline]
    fn advance(&mut self) {
        self.top += self.d_top;
        self.bottom += self.d_bottom;
    }
}

/// Ray/wall intersection along the wall, as the ratio `len * num / den`.
///
/// For screen column offset `s`, the ray is `lateral = -s * x_den / x_num
/// * depth`; both terms are linear in `s` so they advance by addition.
#[derive(Clone, Copy, Debug)]
struct RayCursor {
    num: i64,
    den: i64,
    d_num: i64,
    d_den: i64,
}

impl RayCursor {
    /// Distance along the wall from its left end, in quarter millimetres.
    #[inline]
    fn len_4(&self, len: i64) -> i64 {
        if self.den == 0 {
            return 2 * len;
        }
        mul_div_i64(4 * len, self.num, self.den).clamp(0, 4 * len)
    }

    #[inline]
    fn advance(&mut self) {
        self.num += self.d_num;
        self.den += self.d_den;
    }
}

/// One screen column of a wall.
#[derive(Clone, Copy, Debug)]
struct ColumnRun {
    x: usize,
    /// ×4096 rows
    start: i64,
    end: i64,
    z: u16,
}

impl ColumnRun {
    fn rows(&self, height: usize) -> (usize, usize) {
        let first = (self.start.max(0) / SCREEN_FRACT as i64) as usize;
        let last = (self.end / SCREEN_FRACT as i64).clamp(0, height as i64) as usize;
        (first, last)
    }

    fn blit_plain(&self, frame: &mut FrameBuffer, color: u8) {
        let (first, last) = self.rows(frame.height());
        for y in first..last {
            frame.plot(self.x, y, color, self.z);
        }
    }

    /// `step`: texel rows per screen row, ×[`PIXEL_FRACT`].
    fn blit_textured(&self, frame: &mut FrameBuffer, texels: &[u8], step: i64) {
        let (first, last) = self.rows(frame.height());
        let mask = texels.len() - 1;
        // texel at the bottom of the first pixel, counted from the wall top
        let mut offset = if self.start < 0 {
            (SCREEN_FRACT as i64 - self.start) * step / SCREEN_FRACT as i64
        } else {
            (SCREEN_FRACT as i64 - (self.start & (SCREEN_FRACT as i64 - 1))) * step
                / SCREEN_FRACT as i64
        };
        for y in first..last {
            let texel = texels[(offset / PIXEL_FRACT) as usize & mask];
            frame.plot(self.x, y, texel, self.z);
            offset += step;
        }
    }
}

/// Bitmap actually sampled for one column, honouring the serial alternate.
fn column_source<'a>(texture: &WallTexture<'a>, serial: i32) -> &'a Bitmap {
    if serial == 0 {
        texture.alternate
    } else {
        texture.bitmap
    }
}

/// Level `level` of `bitmap`, or its coarsest when it has fewer.
fn level_or_coarsest(bitmap: &Bitmap, level: usize) -> Option<(usize, &MipLevel)> {
    let n = bitmap.levels().len();
    if n == 0 {
        return None;
    }
    let l = level.min(n - 1);
    Some((l, bitmap.level(l)))
}

/*──────────────────────── column rendering ───────────────────────────*/

impl Viewport {
    /// Rasterize a textured wall, depth-tested against the frame.
    pub fn render_wall(&mut self, wall: &WallSurface, texture: &WallTexture<'_>) {
        let eye = self.view.origin();
        let (ul, lr) = (wall.upper_left, wall.lower_right);

        // visible side has the eye on its right when walking ul → lr
        let side = (lr.y - ul.y) as i64 * (ul.x - eye.x) as i64
            + (ul.x - lr.x) as i64 * (ul.y - eye.y) as i64;
        if side >= 0 || wall.len <= 0 || wall.height() <= 0 {
            log::trace!("wall {ul} → {lr} faces away or is empty");
            return;
        }

        let r0 = self.view.apply(ul);
        let r1 = self.view.apply(lr);
        let Some((c0, c1)) = clip_segment(r0.truncate(), r1.truncate(), self.proj.depth_range())
        else {
            log::trace!("wall {ul} → {lr} outside the depth range");
            return;
        };

        let proj = self.proj;
        let x_res = proj.x_res;
        let x0 = proj.screen_x(c0);
        let x1 = proj.screen_x(c1);
        if x1 <= x0 || x1 <= 0 || x0 >= x_res {
            return;
        }

        let scroll = self.camera.scroll;
        let top_f = proj.level_factor(r0.z);
        let bottom_f = proj.level_factor(r1.z);
        let fract = SCREEN_FRACT as i64;
        let y0_top = proj.screen_y(top_f, c0.x, scroll) as i64 * fract;
        let y0_bot = proj.screen_y(bottom_f, c0.x, scroll) as i64 * fract;
        let y1_top = proj.screen_y(top_f, c1.x, scroll) as i64 * fract;
        let y1_bot = proj.screen_y(bottom_f, c1.x, scroll) as i64 * fract;

        let span = (x1 - x0) as i64;
        let mut edges = EdgeCursor {
            top: y0_top,
            bottom: y0_bot,
            d_top: (y1_top - y0_top) / span,
            d_bottom: (y1_bot - y0_bot) / span,
        };

        let first = x0.max(0);
        let last = x1.min(x_res);
        if x0 < 0 {
            // short jumps from the left end, long ones back from the right
            let skip = (-x0) as i64;
            if skip <= 2 * x1 as i64 {
                edges.top += skip * edges.d_top;
                edges.bottom += skip * edges.d_bottom;
            } else {
                edges.top = y1_top - x1 as i64 * edges.d_top;
                edges.bottom = y1_bot - x1 as i64 * edges.d_bottom;
            }
        }
        // cover the whole pixel on slanted edges
        if edges.d_top < 0 {
            edges.top += edges.d_top;
        }
        if edges.d_bottom > 0 {
            edges.bottom += edges.d_bottom;
        }

        let len = wall.len as i64;
        let (dx, dy) = ((r1.x - r0.x) as i64, (r1.y - r0.y) as i64);
        let (x_num, x_den) = (proj.x_num, proj.x_den);
        let s0 = (first - proj.half_x()) as i64;
        let mut ray = RayCursor {
            num: -(r0.y as i64 * x_num) - s0 * x_den * r0.x as i64,
            den: dy * x_num + s0 * x_den * dx,
            d_num: -x_den * r0.x as i64,
            d_den: x_den * dx,
        };

        let bitmap = texture.bitmap;
        let width = bitmap.width() as i64;
        let tile_h = bitmap.height() as i64;
        let max_x = bitmap.max_x_res() as i64;
        let max_y = bitmap.max_y_res() as i64;
        let wall_h = wall.height() as i64;
        let near = proj.near;
        let y_res = proj.y_res as i64;

        let mut serial = texture.serial_start;
        let mut prev_col = -1i64;

        for x in first..last {
            let visible_h = edges.bottom - edges.top;
            if edges.bottom > 0 && edges.top / fract < y_res && visible_h / fract != 0 {
                let len_4 = ray.len_4(len);
                let depth = r0.x as i64 + mul_div_i64(len_4, dx, 4 * len);
                let run = ColumnRun {
                    x: x as usize,
                    start: edges.top,
                    end: edges.bottom + BOTTOM_OVERDRAW * fract,
                    z: depth_to_z(depth, near),
                };

                let tile_px = mul_div_i64(visible_h, tile_h, wall_h * fract);
                match bitmap.best_level_for_y_res(tile_px as i32) {
                    None => run.blit_plain(&mut self.frame, bitmap.plain_color()),
                    Some(level) => {
                        let col = mul_div_i64(len_4, max_x, 4 * width) & (max_x - 1);
                        if col < prev_col {
                            serial -= 1;
                            if serial < 0 {
                                serial = texture.serial_len - 1;
                            }
                        }
                        prev_col = col;

                        let source = column_source(texture, serial);
                        match level_or_coarsest(source, level) {
                            None => run.blit_plain(&mut self.frame, source.plain_color()),
                            Some((l, mip)) => {
                                let texels = mip.column((col >> source.x_shift(l)) as usize);
                                // texel rows covered by the whole wall / its screen height
                                let step = mul_div_i64(
                                    max_y * wall_h * PIXEL_FRACT,
                                    fract,
                                    tile_h * visible_h,
                                ) >> source.y_shift(l);
                                run.blit_textured(&mut self.frame, texels, step);
                            }
                        }
                    }
                }
            }
            edges.advance();
            ray.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::ivec3;

    use super::*;
    use crate::{
        math::{DEPTH_CLEAR, DEPTH_UNIT},
        renderer::software::ViewportConfig,
        world::Camera,
    };

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(ViewportConfig::default()).unwrap();
        vp.set_camera(Camera::new(ivec3(0, 0, 0), 0));
        vp.clear();
        vp
    }

    /// 64² down to 4² levels, every texel of level `i` holding `10 + i`.
    fn level_marked() -> Bitmap {
        let levels = (0..5)
            .map(|i| MipLevel::from_fn(64 >> i, 64 >> i, |_, _| (10 + i) as u8))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        Bitmap::new(1_000, 1_000, 0, levels).unwrap()
    }

    /// Facing the eye at `depth`, 1000 mm wide and tall, centered.
    fn facing_wall(depth: i32) -> WallSurface {
        WallSurface::new(ivec3(depth, 500, 500), ivec3(depth, -500, -500))
    }

    #[test]
    fn plain_wall_fills_a_band() {
        let mut vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 42).unwrap();
        vp.render_wall(&facing_wall(2_000), &WallTexture::single(&bmp));

        // projected corners: columns 120..200, rows 80..160 (+2 overdraw)
        let z = (2_000 / DEPTH_UNIT) as u16;
        for x in 121..199 {
            for y in 81..161 {
                assert_eq!(vp.pixel(x, y), 42, "({x},{y})");
                assert_eq!(vp.depth_at(x, y), z);
            }
        }
        assert_eq!(vp.depth_at(60, 120), DEPTH_CLEAR);
        assert_eq!(vp.depth_at(160, 40), DEPTH_CLEAR);
        assert_eq!(vp.depth_at(160, 200), DEPTH_CLEAR);
    }

    #[test]
    fn back_side_is_culled() {
        let mut vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 42).unwrap();
        let w = facing_wall(2_000);
        let reversed = WallSurface::new(
            ivec3(w.lower_right.x, w.lower_right.y, w.upper_left.z),
            ivec3(w.upper_left.x, w.upper_left.y, w.lower_right.z),
        );
        vp.render_wall(&reversed, &WallTexture::single(&bmp));
        assert!(vp.depth().iter().all(|&z| z == DEPTH_CLEAR));
    }

    #[test]
    fn wall_behind_near_plane_is_noop() {
        let mut vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 42).unwrap();
        vp.render_wall(&facing_wall(500), &WallTexture::single(&bmp));
        assert!(vp.depth().iter().all(|&z| z == DEPTH_CLEAR));
    }

    #[test]
    fn texture_columns_follow_the_wall() {
        let mut vp = viewport();
        // one tile across the wall, texel value = column index
        let bmp = Bitmap::point_sampled(1_000, 1_000, 0, 64, 64, 4, |c, _| c as u8).unwrap();
        vp.render_wall(&facing_wall(2_000), &WallTexture::single(&bmp));

        let y = 120;
        let row: Vec<u8> = (121..199).map(|x| vp.pixel(x, y)).collect();
        assert!(row.windows(2).all(|w| w[0] <= w[1]), "{row:?}");
        assert!(row.first() < row.last());
    }

    #[test]
    fn smaller_walls_sample_coarser_levels() {
        let bmp = level_marked();
        // 80, 20 and 10 rows on screen
        for (depth, marker) in [(2_000, 10), (8_000, 11), (16_000, 12)] {
            let mut vp = viewport();
            vp.render_wall(&facing_wall(depth), &WallTexture::single(&bmp));
            assert_eq!(vp.pixel(160, 120), marker, "wall at {depth}");
        }
    }

    #[test]
    fn serial_alternate_is_used_on_counted_tile() {
        let mut vp = viewport();
        // wall is two tiles wide: columns wrap once in the middle
        let a = Bitmap::point_sampled(500, 1_000, 1, 8, 8, 1, |_, _| 1).unwrap();
        let b = Bitmap::point_sampled(500, 1_000, 2, 8, 8, 1, |_, _| 2).unwrap();
        vp.render_wall(&facing_wall(2_000), &WallTexture::serial(&a, &b, 2, 1));
        assert_eq!(vp.pixel(130, 120), 1);
        assert_eq!(vp.pixel(190, 120), 2);
    }
}
