//! Triangle rasterizer for curved patches.
//!
//! Patch nodes are placed in the world, rotated into view space and
//! projected once. Each grid cell whose four corners lie inside the depth
//! range becomes two triangles; every triangle is filled as two trapezoids
//! (above and below its middle vertex) by one routine, with texture
//! coordinates and depth interpolated linearly in screen space.

use glam::IVec2;
use smallvec::SmallVec;

use crate::{
    math::{DEPTH_LIMIT, DEPTH_UNIT, SCREEN_FRACT, TEX_FRACT},
    world::{Bitmap, MAX_PATCH_RES, MipLevel, Patch, PositionMatrix},
};

use super::{Viewport, frame::FrameBuffer, projection::Outcode};

/// Horizontal edge extent above which a triangle is dropped; keeps the
/// ×4096 slope arithmetic well inside `i64`.
const MAX_EDGE_DX: i64 = 1 << 19;

/// A node after placement, view transform and projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ProjectedNode {
    pub screen: IVec2,
    /// view-space depth in mm
    pub depth: i32,
    pub outcode: Outcode,
}

impl ProjectedNode {
    #[inline]
    fn drawable(&self) -> bool {
        !self.outcode.intersects(Outcode::FRONT | Outcode::BACK)
    }
}

type Nodes = SmallVec<[ProjectedNode; MAX_PATCH_RES * MAX_PATCH_RES]>;

/// One triangle of a patch: node indices and their texture coordinates
/// (×4096 texels of the finest level).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchTriangle {
    pub nodes: [usize; 3],
    pub u: [i64; 3],
    pub v: [i64; 3],
}

/// Vertex indices of a triangle sorted top to bottom, plus the side of the
/// long edge the middle vertex lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriangleOrder {
    pub top: usize,
    pub middle: usize,
    pub bottom: usize,
    pub middle_on_right: bool,
}

impl TriangleOrder {
    /// `None` for triangles with no height or no width.
    pub fn of(pts: [IVec2; 3]) -> Option<Self> {
        let mut idx = [0usize, 1, 2];
        idx.sort_by_key(|&i| pts[i].y);
        let [top, middle, bottom] = idx;
        let (t, m, b) = (pts[top], pts[middle], pts[bottom]);
        if t.y == b.y {
            return None;
        }
        let side =
            (m.x - t.x) as i64 * (b.y - t.y) as i64 - (b.x - t.x) as i64 * (m.y - t.y) as i64;
        if side == 0 {
            return None;
        }
        Some(Self {
            top,
            middle,
            bottom,
            middle_on_right: side > 0,
        })
    }
}

/*──────────────────────── interpolation ──────────────────────────────*/

/// Screen-space plane of one attribute: `a(x, y) = a0 + dx*(x-x0) + dy*(y-y0)`.
#[derive(Clone, Copy, Debug)]
struct Gradient {
    at_origin: i64,
    dx: i64,
    dy: i64,
}

impl Gradient {
    /// `area` is twice the signed screen area of `p`.
    fn new(p: &[IVec2; 3], a: [i64; 3], area: i64) -> Self {
        let (e1, e2) = (p[1] - p[0], p[2] - p[0]);
        let (a1, a2) = (a[1] - a[0], a[2] - a[0]);
        Self {
            at_origin: a[0],
            dx: (a1 * e2.y as i64 - a2 * e1.y as i64) / area,
            dy: (a2 * e1.x as i64 - a1 * e2.x as i64) / area,
        }
    }

    #[inline]
    fn at(&self, origin: IVec2, x: i32, y: i32) -> i64 {
        self.at_origin + self.dx * (x - origin.x) as i64 + self.dy * (y - origin.y) as i64
    }
}

/// ×4096 x along one triangle edge, stepped row by row.
#[derive(Clone, Copy, Debug)]
struct EdgeStep {
    x: i64,
    dx: i64,
}

impl EdgeStep {
    /// Edge `a → b` positioned on row `row`.
    fn starting_at(a: IVec2, b: IVec2, row: i32) -> Self {
        let fract = SCREEN_FRACT as i64;
        let dx = (b.x - a.x) as i64 * fract / (b.y - a.y) as i64;
        Self {
            x: a.x as i64 * fract + dx * (row - a.y) as i64,
            dx,
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.x += self.dx;
    }
}

/// Texture source for every triangle of one patch.
enum Fill<'a> {
    Plain(u8),
    Textured(&'a MipLevel),
}

/*──────────────────────── patch rendering ────────────────────────────*/

impl Viewport {
    /// Rasterize a patch placed in the world by `matrix`.
    pub fn render_patch(&mut self, patch: &dyn Patch, matrix: &PositionMatrix, bitmap: &Bitmap) {
        let Some(nodes) = self.project_patch(patch, matrix) else {
            return;
        };
        let fill = match bitmap.levels().first() {
            Some(mip) => Fill::Textured(mip),
            None => Fill::Plain(bitmap.plain_color()),
        };
        for tri in triangulate(&nodes, patch.u_res(), patch.v_res(), bitmap) {
            self.fill_triangle(&nodes, &tri, &fill);
        }
    }

    /// Triangles that [`Self::render_patch`] would rasterize.
    pub fn patch_triangles(
        &self,
        patch: &dyn Patch,
        matrix: &PositionMatrix,
        bitmap: &Bitmap,
    ) -> Vec<PatchTriangle> {
        self.project_patch(patch, matrix)
            .map(|nodes| triangulate(&nodes, patch.u_res(), patch.v_res(), bitmap))
            .unwrap_or_default()
    }

    /// `None` for malformed grids and patches entirely off one screen side.
    fn project_patch(&self, patch: &dyn Patch, matrix: &PositionMatrix) -> Option<Nodes> {
        let (u_res, v_res) = (patch.u_res(), patch.v_res());
        if !(2..=MAX_PATCH_RES).contains(&u_res)
            || !(2..=MAX_PATCH_RES).contains(&v_res)
            || patch.nodes().len() != u_res * v_res
        {
            log::warn!("patch {u_res}x{v_res} with {} nodes skipped", patch.nodes().len());
            return None;
        }

        let proj = self.proj;
        let scroll = self.camera.scroll;
        let mut shared = Outcode::all();
        let nodes: Nodes = patch
            .nodes()
            .iter()
            .map(|&local| {
                let p = self.view.apply(matrix.to_world(&self.trig, local));
                let node = if p.x < proj.near / 2 {
                    ProjectedNode {
                        screen: IVec2::ZERO,
                        depth: p.x,
                        outcode: Outcode::FRONT,
                    }
                } else if p.x / DEPTH_UNIT > DEPTH_LIMIT as i32 {
                    ProjectedNode {
                        screen: IVec2::ZERO,
                        depth: p.x,
                        outcode: Outcode::BACK,
                    }
                } else {
                    let x = proj.screen_x(p.truncate());
                    let y = proj.screen_y(proj.level_factor(p.z), p.x, scroll);
                    ProjectedNode {
                        screen: IVec2::new(x, y),
                        depth: p.x,
                        outcode: proj.screen_side(x, y),
                    }
                };
                shared &= node.outcode;
                node
            })
            .collect();

        shared.is_empty().then_some(nodes)
    }

    fn fill_triangle(&mut self, nodes: &[ProjectedNode], tri: &PatchTriangle, fill: &Fill<'_>) {
        let p = tri.nodes.map(|i| nodes[i].screen);

        // overflow guard on the edge slopes
        let too_wide = |a: IVec2, b: IVec2| ((b.x - a.x) as i64).abs() >= MAX_EDGE_DX;
        if too_wide(p[0], p[1]) || too_wide(p[1], p[2]) || too_wide(p[2], p[0]) {
            return;
        }

        // clockwise on screen (y down) is front facing
        let (e1, e2) = (p[1] - p[0], p[2] - p[0]);
        let area = e1.x as i64 * e2.y as i64 - e2.x as i64 * e1.y as i64;
        if area <= 0 {
            log::trace!("triangle {:?} culled, area {area}", tri.nodes);
            return;
        }
        let Some(order) = TriangleOrder::of(p) else {
            return;
        };
        let (t, m, b) = (p[order.top], p[order.middle], p[order.bottom]);
        // middle row narrower than a quarter pixel
        if area * 4 < (b.y - t.y) as i64 {
            return;
        }

        let fract = SCREEN_FRACT as i64;
        let z = Gradient::new(&p, tri.nodes.map(|i| nodes[i].depth as i64 * fract), area);
        let u = Gradient::new(&p, tri.u, area);
        let v = Gradient::new(&p, tri.v, area);

        let y_res = self.proj.y_res;
        let x_res = self.proj.x_res;
        let near = self.proj.near as i64;
        let frame = &mut self.frame;

        for (a, e) in [(t, m), (m, b)] {
            if a.y == e.y {
                continue;
            }
            let first = a.y.max(0);
            let last = e.y.min(y_res);
            if first >= last {
                continue;
            }
            let mut long = EdgeStep::starting_at(t, b, first);
            let mut short = EdgeStep::starting_at(a, e, first);
            for row in first..last {
                let (l, r) = if order.middle_on_right {
                    (long.x, short.x)
                } else {
                    (short.x, long.x)
                };
                let x0 = ((l >> 12) as i32).max(0);
                let x1 = ((r >> 12) as i32).min(x_res);
                if x0 < x1 {
                    let span = Span {
                        y: row,
                        x0,
                        x1,
                        z: z.at(p[0], x0, row),
                        u: u.at(p[0], x0, row),
                        v: v.at(p[0], x0, row),
                    };
                    span.blit(frame, fill, (z.dx, u.dx, v.dx), near);
                }
                long.advance();
                short.advance();
            }
        }
    }
}

/// One row of a triangle with attribute values at its first pixel.
struct Span {
    y: i32,
    x0: i32,
    x1: i32,
    /// depth mm ×4096
    z: i64,
    u: i64,
    v: i64,
}

impl Span {
    fn blit(&self, frame: &mut FrameBuffer, fill: &Fill<'_>, d: (i64, i64, i64), near: i64) {
        let (dz, du, dv) = d;
        let (mut z, mut u, mut v) = (self.z, self.u, self.v);
        let shift = TEX_FRACT.trailing_zeros();
        let unit = SCREEN_FRACT as i64 * DEPTH_UNIT as i64;
        let (colors, depths) = frame.span_mut(self.y as usize, self.x0 as usize, self.x1 as usize);
        for (c, stored) in colors.iter_mut().zip(depths.iter_mut()) {
            let depth = ((z / unit).max(near / DEPTH_UNIT as i64)).min(DEPTH_LIMIT as i64) as u16;
            if *stored >= depth {
                *c = match fill {
                    Fill::Plain(color) => *color,
                    Fill::Textured(mip) => mip.texel((u >> shift) as usize, (v >> shift) as usize),
                };
                *stored = depth;
            }
            z += dz;
            u += du;
            v += dv;
        }
    }
}

/// Two triangles per grid cell whose four corners are drawable.
///
/// Cell `(u, v)` with corner `c = v * u_res + u` yields `(c, c+1, c+u_res)`
/// and `(c+1, c+u_res+1, c+u_res)`.
pub(crate) fn triangulate(
    nodes: &[ProjectedNode],
    u_res: usize,
    v_res: usize,
    bitmap: &Bitmap,
) -> Vec<PatchTriangle> {
    let col_inc = bitmap.max_x_res() as i64 * TEX_FRACT as i64 / (u_res as i64 - 1);
    let row_inc = bitmap.max_y_res() as i64 * TEX_FRACT as i64 / (v_res as i64 - 1);

    let mut out = Vec::new();
    for cv in 0..v_res - 1 {
        for cu in 0..u_res - 1 {
            let c = cv * u_res + cu;
            let corners = [c, c + 1, c + u_res, c + u_res + 1];
            if !corners.iter().all(|&i| nodes[i].drawable()) {
                continue;
            }
            let (u0, u1) = (cu as i64 * col_inc, (cu as i64 + 1) * col_inc);
            let (v0, v1) = (cv as i64 * row_inc, (cv as i64 + 1) * row_inc);
            out.push(PatchTriangle {
                nodes: [c, c + 1, c + u_res],
                u: [u0, u1, u0],
                v: [v0, v0, v1],
            });
            out.push(PatchTriangle {
                nodes: [c + 1, c + u_res + 1, c + u_res],
                u: [u1, u1, u0],
                v: [v0, v1, v1],
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use glam::{ivec2, ivec3};

    use super::*;
    use crate::{
        math::DEPTH_CLEAR,
        renderer::software::ViewportConfig,
        world::{Camera, PatchGrid},
    };

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(ViewportConfig::default()).unwrap();
        vp.set_camera(Camera::new(ivec3(0, 0, 1_000), 0));
        vp.clear();
        vp
    }

    /// Flat ground grid in front of the eye, visible from above.
    fn ground(u_res: usize, v_res: usize, near: i32) -> PatchGrid {
        PatchGrid::from_fn(
            u_res,
            v_res,
            ivec3(near, -1_000, 0),
            ivec2(0, 2_000 / (u_res as i32 - 1)),
            ivec2(4_000 / (v_res as i32 - 1), 0),
            |_, _| 0,
        )
    }

    #[test]
    fn order_sorts_and_finds_middle_side() {
        let o = TriangleOrder::of([ivec2(0, 10), ivec2(5, 0), ivec2(20, 5)]).unwrap();
        assert_eq!((o.top, o.middle, o.bottom), (1, 2, 0));
        assert!(o.middle_on_right);
        let o = TriangleOrder::of([ivec2(10, 10), ivec2(5, 0), ivec2(0, 5)]).unwrap();
        assert!(!o.middle_on_right);
        assert!(TriangleOrder::of([ivec2(0, 3), ivec2(5, 3), ivec2(9, 3)]).is_none());
        assert!(TriangleOrder::of([ivec2(0, 0), ivec2(5, 5), ivec2(10, 10)]).is_none());
    }

    #[test]
    fn two_by_two_patch_is_two_triangles() {
        let vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 3).unwrap();
        let tris = vp.patch_triangles(&ground(2, 2, 2_000), &PositionMatrix::default(), &bmp);
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0].nodes, [0, 1, 2]);
        assert_eq!(tris[1].nodes, [1, 3, 2]);
    }

    #[test]
    fn cells_touching_a_too_near_node_are_skipped() {
        let vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 3).unwrap();
        let mut grid = ground(3, 3, 2_000);
        let mut nodes = grid.nodes().to_vec();
        nodes[0].x = 100;
        grid = PatchGrid::new(3, 3, nodes).unwrap();
        let tris = vp.patch_triangles(&grid, &PositionMatrix::default(), &bmp);
        // 4 cells, the one using node 0 dropped
        assert_eq!(tris.len(), 6);
        assert!(tris.iter().all(|t| !t.nodes.contains(&0)));
    }

    #[test]
    fn patch_behind_the_eye_draws_nothing() {
        let mut vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 3).unwrap();
        vp.render_patch(&ground(3, 3, -8_000), &PositionMatrix::default(), &bmp);
        assert!(vp.depth().iter().all(|&z| z == DEPTH_CLEAR));
    }

    #[test]
    fn ground_patch_covers_its_projection() {
        let mut vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 3).unwrap();
        vp.render_patch(&ground(3, 3, 2_000), &PositionMatrix::default(), &bmp);
        // same footprint as a floor quad: rows 146..200
        assert_eq!(vp.pixel(160, 170), 3);
        assert_eq!(vp.pixel(160, 198), 3);
        assert_eq!(vp.depth_at(160, 100), DEPTH_CLEAR);
        assert_eq!(vp.depth_at(10, 170), DEPTH_CLEAR);
        let near = vp.depth_at(160, 198);
        let far = vp.depth_at(160, 150);
        assert!(near < far, "{near} !< {far}");
    }

    #[test]
    fn back_facing_patch_is_culled() {
        let mut vp = viewport();
        let bmp = Bitmap::plain(1_000, 1_000, 3).unwrap();
        // swapping the axes mirrors the winding
        let mirrored = PatchGrid::from_fn(
            3,
            3,
            ivec3(2_000, -1_000, 0),
            ivec2(2_000, 0),
            ivec2(0, 1_000),
            |_, _| 0,
        );
        vp.render_patch(&mirrored, &PositionMatrix::default(), &bmp);
        assert!(vp.depth().iter().all(|&z| z == DEPTH_CLEAR));
    }

    #[test]
    fn textured_patch_samples_finest_level() {
        let mut vp = viewport();
        let bmp = Bitmap::point_sampled(1_000, 1_000, 0, 16, 16, 1, |u, v| {
            if u < 8 { 10 + (v / 8) as u8 } else { 20 + (v / 8) as u8 }
        })
        .unwrap();
        vp.render_patch(&ground(2, 2, 2_000), &PositionMatrix::default(), &bmp);
        // u runs toward +Y (screen left), v away from the eye (screen up)
        assert_eq!(vp.pixel(200, 195), 10);
        assert_eq!(vp.pixel(120, 195), 20);
        assert_eq!(vp.pixel(150, 150) % 10, 1);
    }
}
