//! Fixed-point software rasterizer.
//!
//! The engine around this crate resolves scene geometry (wall corners,
//! floor rings, patch grids) and bitmaps with precomputed mip levels. The
//! [`renderer::software::Viewport`] turns them into a palette-indexed color
//! buffer plus a 16-bit depth buffer using integer arithmetic only.

pub mod math;
pub mod renderer;
pub mod world;
