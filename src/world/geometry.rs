use glam::{IVec2, IVec3};

/// Largest ring accepted by the horizontal-surface rasterizer.
pub const MAX_POLYGON_VERTEX: usize = 34;

/// Largest patch grid (per axis).
pub const MAX_PATCH_RES: usize = 16;

/*--------------------------- walls ----------------------------------*/

/// Vertical rectangle standing on the ground plane.
///
/// Seen from its visible side, `upper_left` is the top-left corner and
/// `lower_right` the bottom-right one. `len` is the horizontal length in mm
/// (precomputed by the geometry owner).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallSurface {
    pub upper_left: IVec3,
    pub lower_right: IVec3,
    pub len: i32,
}

impl WallSurface {
    pub fn new(upper_left: IVec3, lower_right: IVec3) -> Self {
        let d = (lower_right - upper_left).truncate().as_dvec2();
        Self {
            upper_left,
            lower_right,
            len: d.length().round() as i32,
        }
    }

    /// Vertical extent in mm.
    #[inline]
    pub fn height(&self) -> i32 {
        self.upper_left.z - self.lower_right.z
    }
}

/*---------------------- horizontal surfaces --------------------------*/

/// Which side of a horizontal plane is painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    /// Floor: visible from above.
    Up,
    /// Ceiling: visible from below.
    Down,
}

/*---------------------------- patches --------------------------------*/

/// Grid of control points approximating a curved surface.
///
/// Nodes are row-major: node `(u, v)` is `nodes()[v * u_res() + u]`.
pub trait Patch {
    fn u_res(&self) -> usize;
    fn v_res(&self) -> usize;
    fn nodes(&self) -> &[IVec3];
}

/// Owned patch grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchGrid {
    u_res: usize,
    v_res: usize,
    nodes: Vec<IVec3>,
}

impl PatchGrid {
    /// Returns `None` when the node count does not match `u_res * v_res`.
    pub fn new(u_res: usize, v_res: usize, nodes: Vec<IVec3>) -> Option<Self> {
        (nodes.len() == u_res * v_res).then_some(Self {
            u_res,
            v_res,
            nodes,
        })
    }

    /// Regular grid spanning `origin + (u * du, v * dv)` with heights from
    /// `height(u, v)`.
    pub fn from_fn(
        u_res: usize,
        v_res: usize,
        origin: IVec3,
        du: IVec2,
        dv: IVec2,
        height: impl Fn(usize, usize) -> i32,
    ) -> Self {
        let mut nodes = Vec::with_capacity(u_res * v_res);
        for v in 0..v_res {
            for u in 0..u_res {
                let xy = origin.truncate() + du * u as i32 + dv * v as i32;
                nodes.push(xy.extend(origin.z + height(u, v)));
            }
        }
        Self {
            u_res,
            v_res,
            nodes,
        }
    }
}

impl Patch for PatchGrid {
    fn u_res(&self) -> usize {
        self.u_res
    }

    fn v_res(&self) -> usize {
        self.v_res
    }

    fn nodes(&self) -> &[IVec3] {
        &self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{ivec2, ivec3};

    #[test]
    fn wall_len_and_height() {
        let w = WallSurface::new(ivec3(0, 0, 3_000), ivec3(3_000, 4_000, 0));
        assert_eq!(w.len, 5_000);
        assert_eq!(w.height(), 3_000);
    }

    #[test]
    fn grid_layout_is_row_major() {
        let g = PatchGrid::from_fn(3, 2, ivec3(10, 20, 5), ivec2(100, 0), ivec2(0, 50), |u, v| {
            (u + v) as i32
        });
        assert_eq!(g.nodes().len(), 6);
        assert_eq!(g.nodes()[4], ivec3(110, 70, 7));
        assert!(PatchGrid::new(2, 2, vec![IVec3::ZERO; 3]).is_none());
    }
}
