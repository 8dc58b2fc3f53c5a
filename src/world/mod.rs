mod bitmap;
mod camera;
mod geometry;

pub use bitmap::{Bitmap, BitmapError, MipLevel, Panorama};
pub use camera::{Camera, PositionMatrix, ViewTransform};
pub use geometry::{
    Facing, MAX_PATCH_RES, MAX_POLYGON_VERTEX, Patch, PatchGrid, WallSurface,
};
