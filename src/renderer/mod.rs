//! Rendering abstraction layer.
//!
//! *Scene owners never touch a pixel buffer directly.*
//! They describe a frame as a list of [`DrawCall`]s and hand them to a type
//! that implements [`Renderer`].
//!
//! * Draw order is free: every primitive (except the background) is
//!   depth-tested, so callers do not sort.
//! * A helper blanket-impl [`RendererExt`] adds `draw_frame` so call-sites
//!   stay short.

use glam::IVec2;

use crate::world::{Bitmap, Facing, Panorama, Patch, PositionMatrix, WallSurface};

/// One palette index per pixel.
pub type PaletteIndex = u8;

/// Texture assignment of a wall.
///
/// Walls longer than one tile may alternate between two bitmaps: every
/// time the texture column wraps around, a countdown starting at
/// `serial_start` is decremented (modulo `serial_len`) and the tile whose
/// count reaches 0 uses `alternate`.
#[derive(Clone, Copy, Debug)]
pub struct WallTexture<'a> {
    pub bitmap: &'a Bitmap,
    pub alternate: &'a Bitmap,
    pub serial_len: i32,
    pub serial_start: i32,
}

impl<'a> WallTexture<'a> {
    pub fn single(bitmap: &'a Bitmap) -> Self {
        Self {
            bitmap,
            alternate: bitmap,
            serial_len: 1,
            serial_start: 1,
        }
    }

    pub fn serial(
        bitmap: &'a Bitmap,
        alternate: &'a Bitmap,
        serial_len: i32,
        serial_start: i32,
    ) -> Self {
        Self {
            bitmap,
            alternate,
            serial_len: serial_len.max(1),
            serial_start,
        }
    }
}

/// One primitive of a frame.
pub enum DrawCall<'a> {
    Background(&'a Panorama),
    Wall {
        wall: WallSurface,
        texture: WallTexture<'a>,
    },
    HorizontalSurface {
        ring: &'a [IVec2],
        level: i32,
        facing: Facing,
        bitmap: &'a Bitmap,
    },
    Patch {
        patch: &'a dyn Patch,
        matrix: PositionMatrix,
        bitmap: &'a Bitmap,
    },
}

/// A renderer that owns its color and depth buffers for the whole frame.
///
/// `end_frame` hands the finished buffers to a user-supplied closure.
pub trait Renderer {
    /// Clear color + depth for a new frame.
    fn begin_frame(&mut self);

    /// Panorama behind everything; ignores and keeps the depth buffer.
    fn draw_background(&mut self, panorama: &Panorama);

    fn draw_wall(&mut self, wall: &WallSurface, texture: &WallTexture<'_>);

    /// Flat polygon at height `level`; `ring` is clockwise seen from above.
    fn draw_horizontal_surface(
        &mut self,
        ring: &[IVec2],
        level: i32,
        facing: Facing,
        bitmap: &Bitmap,
    );

    fn draw_patch(&mut self, patch: &dyn Patch, matrix: &PositionMatrix, bitmap: &Bitmap);

    /// Finish the frame and **loan** the buffers to `submit`.
    ///
    /// `submit(color, depth, width, height)` runs exactly once per frame.
    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[PaletteIndex], &[u16], usize, usize);
}

/// Convenience blanket-impl with a one-liner `draw_frame` adaptor.
pub trait RendererExt: Renderer {
    fn draw_frame<F>(&mut self, calls: &[DrawCall<'_>], submit: F)
    where
        F: FnOnce(&[PaletteIndex], &[u16], usize, usize),
    {
        self.begin_frame();
        for c in calls {
            match c {
                DrawCall::Background(p) => self.draw_background(p),
                DrawCall::Wall { wall, texture } => self.draw_wall(wall, texture),
                DrawCall::HorizontalSurface {
                    ring,
                    level,
                    facing,
                    bitmap,
                } => self.draw_horizontal_surface(ring, *level, *facing, bitmap),
                DrawCall::Patch {
                    patch,
                    matrix,
                    bitmap,
                } => self.draw_patch(*patch, matrix, bitmap),
            }
        }
        self.end_frame(submit);
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

pub mod software;
