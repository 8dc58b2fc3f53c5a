//! Near/far depth clipping of wall edges and horizontal-surface rings.
//!
//! Both operate on view-space [`IVec2`] points where `x` is the depth and
//! `y` the lateral offset. Crossing points are found by linear
//! interpolation of the lateral offset; an edge with no depth delta is
//! never divided by.

use glam::{IVec2, ivec2};
use smallvec::SmallVec;

use crate::{math::mul_div, world::MAX_POLYGON_VERTEX};

/// Ring produced by [`clip_polygon`]; never longer than `n + 2` for
/// convex input.
pub type ClippedRing = SmallVec<[IVec2; MAX_POLYGON_VERTEX + 2]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthRange {
    pub near: i32,
    pub far: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthClass {
    Near,
    InRange,
    Far,
}

impl DepthRange {
    #[inline]
    pub fn classify(&self, depth: i32) -> DepthClass {
        if depth < self.near {
            DepthClass::Near
        } else if depth > self.far {
            DepthClass::Far
        } else {
            DepthClass::InRange
        }
    }

    /// Clip plane that bounds a given out-of-range class.
    #[inline]
    fn plane(&self, class: DepthClass) -> i32 {
        match class {
            DepthClass::Near => self.near,
            DepthClass::Far | DepthClass::InRange => self.far,
        }
    }
}

/// Point of segment `from → toward` at depth `plane`.
#[inline]
fn crossing(from: IVec2, toward: IVec2, plane: i32) -> Option<IVec2> {
    let dx = toward.x - from.x;
    if dx == 0 {
        return None;
    }
    Some(ivec2(
        plane,
        from.y + mul_div(toward.y - from.y, plane - from.x, dx),
    ))
}

/// Clip a segment to `[near, far]`.
///
/// Returns `None` when both ends are on the same out-of-range side.
pub fn clip_segment(a: IVec2, b: IVec2, range: DepthRange) -> Option<(IVec2, IVec2)> {
    let ca = range.classify(a.x);
    let cb = range.classify(b.x);
    if ca == cb && ca != DepthClass::InRange {
        return None;
    }
    let a2 = match ca {
        DepthClass::InRange => a,
        c => crossing(a, b, range.plane(c))?,
    };
    let b2 = match cb {
        DepthClass::InRange => b,
        c => crossing(b, a, range.plane(c))?,
    };
    Some((a2, b2))
}

/// Clip a closed ring to `[near, far]`, keeping its orientation.
///
/// Rings entirely nearer or entirely farther than the range are rejected,
/// as are rings shorter than three or longer than [`MAX_POLYGON_VERTEX`].
/// A ring already inside the range comes back unchanged.
pub fn clip_polygon(ring: &[IVec2], range: DepthRange) -> Option<ClippedRing> {
    let n = ring.len();
    if n < 3 {
        return None;
    }
    if n > MAX_POLYGON_VERTEX {
        log::warn!("polygon with {n} vertices exceeds {MAX_POLYGON_VERTEX}, skipped");
        return None;
    }

    let classes: SmallVec<[DepthClass; MAX_POLYGON_VERTEX + 2]> =
        ring.iter().map(|p| range.classify(p.x)).collect();

    let near = classes.iter().filter(|&&c| c == DepthClass::Near).count();
    let far = classes.iter().filter(|&&c| c == DepthClass::Far).count();
    if near == n || far == n {
        return None;
    }
    if near == 0 && far == 0 {
        return Some(ring.iter().copied().collect());
    }

    let mut out = ClippedRing::new();
    for (i, &class) in classes.iter().enumerate() {
        if class == DepthClass::InRange {
            out.push(ring[i]);
            continue;
        }
        let prev = (i + n - 1) % n;
        let next = (i + 1) % n;
        let plane = range.plane(class);
        for neighbour in [prev, next] {
            if classes[neighbour] != class {
                if let Some(p) = crossing(ring[i], ring[neighbour], plane) {
                    out.push(p);
                }
            }
        }
    }

    (out.len() >= 3).then_some(out)
}
