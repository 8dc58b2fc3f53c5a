use crate::math::DEPTH_CLEAR;

/// Nearest-wins depth comparison shared by every rasterizer.
///
/// Ties overwrite: the most recent draw wins on coplanar surfaces.
#[inline(always)]
pub fn depth_test(stored: u16, candidate: u16) -> bool {
    stored >= candidate
}

/// Row-major color + depth buffers of one viewport.
///
/// * color: one palette index per pixel
/// * depth: one `u16` per pixel, [`DEPTH_CLEAR`] when nothing was drawn
#[derive(Clone, Debug, Default)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    color: Vec<u8>,
    depth: Vec<u16>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            color: vec![0; width * height],
            depth: vec![DEPTH_CLEAR; width * height],
        }
    }

    /// (Re)allocate for a new resolution; contents are cleared.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.color.clear();
        self.color.resize(width * height, 0);
        self.depth.clear();
        self.depth.resize(width * height, DEPTH_CLEAR);
    }

    pub fn clear(&mut self, color: u8) {
        self.color.fill(color);
        self.depth.fill(DEPTH_CLEAR);
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn color(&self) -> &[u8] {
        &self.color
    }

    #[inline]
    pub fn depth(&self) -> &[u16] {
        &self.depth
    }

    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "pixel ({x},{y}) out of bounds");
        y * self.width + x
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.color[self.index(x, y)]
    }

    pub fn depth_at(&self, x: usize, y: usize) -> u16 {
        self.depth[self.index(x, y)]
    }

    /// Depth-tested write of a single pixel. Returns whether it landed.
    #[inline(always)]
    pub fn plot(&mut self, x: usize, y: usize, color: u8, z: u16) -> bool {
        let i = self.index(x, y);
        if depth_test(self.depth[i], z) {
            self.color[i] = color;
            self.depth[i] = z;
            true
        } else {
            false
        }
    }

    /// Color-only write, used by layers that sit behind everything.
    #[inline(always)]
    pub fn put(&mut self, x: usize, y: usize, color: u8) {
        let i = self.index(x, y);
        self.color[i] = color;
    }

    /// Both buffers of row `y`, restricted to `x0..x1`.
    #[inline]
    pub fn span_mut(&mut self, y: usize, x0: usize, x1: usize) -> (&mut [u8], &mut [u16]) {
        debug_assert!(y < self.height && x0 <= x1 && x1 <= self.width);
        let base = y * self.width;
        (
            &mut self.color[base + x0..base + x1],
            &mut self.depth[base + x0..base + x1],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_keeps_nearest_and_overwrites_ties() {
        let mut fb = FrameBuffer::new(4, 4);
        assert!(fb.plot(1, 2, 7, 100));
        assert!(!fb.plot(1, 2, 8, 101));
        assert_eq!(fb.pixel(1, 2), 7);
        assert!(fb.plot(1, 2, 9, 100));
        assert_eq!(fb.pixel(1, 2), 9);
        assert_eq!(fb.depth_at(1, 2), 100);
    }

    #[test]
    fn span_is_row_slice() {
        let mut fb = FrameBuffer::new(8, 2);
        let (c, d) = fb.span_mut(1, 2, 5);
        c.fill(3);
        d.fill(10);
        assert_eq!(&fb.color()[8..16], &[0, 0, 3, 3, 3, 0, 0, 0]);
        assert_eq!(fb.depth_at(4, 1), 10);
    }

    #[test]
    fn clear_resets_depth() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.plot(0, 0, 1, 5);
        fb.clear(0);
        assert!(fb.depth().iter().all(|&z| z == DEPTH_CLEAR));
    }
}
