// Format-agnostic bitmaps handed over by the asset loader.
// The rasterizers only *select* among precomputed levels, they never resample.

use thiserror::Error;

use crate::math::TEX_FRACT;

/// Things that can go wrong when assembling a bitmap.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitmapError {
    /// Level dimensions must be powers of two so texel indices can be masked.
    #[error("{x_res}x{y_res} is not a power-of-two size")]
    NotPowerOfTwo { x_res: usize, y_res: usize },

    /// Texel vector does not match the declared size.
    #[error("expected {expected} texels, found {found}")]
    DataLength { expected: usize, found: usize },

    /// Every level must halve the previous one on both axes (down to 1).
    #[error("level {0} does not halve the previous level")]
    BrokenMipChain(usize),

    /// World tile size must be positive.
    #[error("world size {0}x{1} mm must be positive")]
    ZeroSize(i32, i32),

    /// Panorama columns are masked, rows only need to exist.
    #[error("panorama {width}x{height} needs a power-of-two width and at least one row")]
    PanoramaSize { width: usize, height: usize },
}

/// One precomputed resolution of a bitmap.
///
/// Texels are stored **column-major**: column `c` is the contiguous slice
/// `texels[c * y_res .. (c + 1) * y_res]`, row 0 at the top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MipLevel {
    x_res: usize,
    y_res: usize,
    texels: Vec<u8>,
}

impl MipLevel {
    pub fn new(x_res: usize, y_res: usize, texels: Vec<u8>) -> Result<Self, BitmapError> {
        if !x_res.is_power_of_two() || !y_res.is_power_of_two() {
            return Err(BitmapError::NotPowerOfTwo { x_res, y_res });
        }
        if texels.len() != x_res * y_res {
            return Err(BitmapError::DataLength {
                expected: x_res * y_res,
                found: texels.len(),
            });
        }
        Ok(Self {
            x_res,
            y_res,
            texels,
        })
    }

    /// Build a level from `f(column, row)`.
    pub fn from_fn(
        x_res: usize,
        y_res: usize,
        f: impl Fn(usize, usize) -> u8,
    ) -> Result<Self, BitmapError> {
        let mut texels = Vec::with_capacity(x_res * y_res);
        for col in 0..x_res {
            for row in 0..y_res {
                texels.push(f(col, row));
            }
        }
        Self::new(x_res, y_res, texels)
    }

    #[inline]
    pub fn x_res(&self) -> usize {
        self.x_res
    }

    #[inline]
    pub fn y_res(&self) -> usize {
        self.y_res
    }

    #[inline(always)]
    pub fn column(&self, col: usize) -> &[u8] {
        let col = col & (self.x_res - 1);
        &self.texels[col * self.y_res..][..self.y_res]
    }

    /// Texel lookup with both indices wrapped to the level size.
    #[inline(always)]
    pub fn texel(&self, col: usize, row: usize) -> u8 {
        self.column(col)[row & (self.y_res - 1)]
    }
}

/// A tiled surface texture: world tile size, a plain fallback color and a
/// finest-first chain of mip levels.
///
/// A bitmap without levels is a solid-color bitmap; every level query then
/// answers `None` and the rasterizers draw [`Bitmap::plain_color`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: i32,
    height: i32,
    plain_color: u8,
    levels: Vec<MipLevel>,
}

impl Bitmap {
    /// `width`/`height` are the size in mm one tile covers in the world.
    pub fn new(
        width: i32,
        height: i32,
        plain_color: u8,
        levels: Vec<MipLevel>,
    ) -> Result<Self, BitmapError> {
        if width <= 0 || height <= 0 {
            return Err(BitmapError::ZeroSize(width, height));
        }
        for (i, pair) in levels.windows(2).enumerate() {
            let (fine, coarse) = (&pair[0], &pair[1]);
            if coarse.x_res != (fine.x_res / 2).max(1) || coarse.y_res != (fine.y_res / 2).max(1)
            {
                return Err(BitmapError::BrokenMipChain(i + 1));
            }
        }
        Ok(Self {
            width,
            height,
            plain_color,
            levels,
        })
    }

    pub fn plain(width: i32, height: i32, color: u8) -> Result<Self, BitmapError> {
        Self::new(width, height, color, Vec::new())
    }

    /// Full mip chain point-sampled from `f(column, row)` at the finest
    /// resolution, down to `min_res` texels on the shorter axis.
    pub fn point_sampled(
        width: i32,
        height: i32,
        plain_color: u8,
        x_res: usize,
        y_res: usize,
        min_res: usize,
        f: impl Fn(usize, usize) -> u8,
    ) -> Result<Self, BitmapError> {
        let mut levels = Vec::new();
        let (mut xr, mut yr, mut shift) = (x_res, y_res, 0u32);
        loop {
            levels.push(MipLevel::from_fn(xr, yr, |c, r| f(c << shift, r << shift))?);
            if xr.min(yr) <= min_res.max(1) {
                break;
            }
            xr /= 2;
            yr /= 2;
            shift += 1;
        }
        Self::new(width, height, plain_color, levels)
    }

    /// Two-color checkerboard with `cells` squares per side.
    pub fn checker(
        width: i32,
        height: i32,
        res: usize,
        cells: usize,
        a: u8,
        b: u8,
    ) -> Result<Self, BitmapError> {
        let cell = (res / cells.max(1)).max(1);
        Self::point_sampled(width, height, a, res, res, 4, |c, r| {
            if ((c / cell) ^ (r / cell)) & 1 == 0 { a } else { b }
        })
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn plain_color(&self) -> u8 {
        self.plain_color
    }

    #[inline]
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    #[inline]
    pub fn level(&self, idx: usize) -> &MipLevel {
        &self.levels[idx]
    }

    pub fn max_x_res(&self) -> usize {
        self.levels.first().map_or(1, MipLevel::x_res)
    }

    pub fn max_y_res(&self) -> usize {
        self.levels.first().map_or(1, MipLevel::y_res)
    }

    /// `log2(max_x_res / x_res(level))`
    pub fn x_shift(&self, level: usize) -> u32 {
        (self.max_x_res() / self.levels[level].x_res).trailing_zeros()
    }

    /// `log2(max_y_res / y_res(level))`
    pub fn y_shift(&self, level: usize) -> u32 {
        (self.max_y_res() / self.levels[level].y_res).trailing_zeros()
    }

    /// Best level for a tile that covers `screen_px` rows on screen.
    ///
    /// The coarsest level that still has at least one texel row per screen
    /// row wins; magnified tiles use the finest level. Tiles thinner than a
    /// pixel fall back to the plain color.
    pub fn best_level_for_y_res(&self, screen_px: i32) -> Option<usize> {
        if self.levels.is_empty() || screen_px < 1 {
            return None;
        }
        let target = screen_px as usize;
        let found = self.levels.iter().rposition(|l| l.y_res >= target);
        Some(found.unwrap_or(0))
    }

    /// Best level for a sampling pitch of `pitch_4096 / 4096` finest-level
    /// texels per screen pixel: the finest level whose pitch is at most one
    /// texel, clamped to the coarsest level.
    pub fn best_level_for_pitch(&self, pitch_4096: i64) -> Option<usize> {
        if self.levels.is_empty() {
            return None;
        }
        let mut level = 0;
        let mut pitch = pitch_4096.abs();
        while pitch > TEX_FRACT as i64 && level + 1 < self.levels.len() {
            pitch >>= 1;
            level += 1;
        }
        Some(level)
    }
}

/// Cylindrical background wrapped around the viewer.
///
/// Columns cover a full turn. Each column is stored **bottom-up**: row 0 is
/// the lowest texel, [`Panorama::horizon`] sits on the horizon line and the
/// rows above it climb to the zenith.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Panorama {
    width: usize,
    height: usize,
    texels: Vec<u8>,
}

impl Panorama {
    pub fn new(width: usize, height: usize, texels: Vec<u8>) -> Result<Self, BitmapError> {
        if !width.is_power_of_two() || height == 0 {
            return Err(BitmapError::PanoramaSize { width, height });
        }
        if texels.len() != width * height {
            return Err(BitmapError::DataLength {
                expected: width * height,
                found: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Build from `f(column, row_from_bottom)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        f: impl Fn(usize, usize) -> u8,
    ) -> Result<Self, BitmapError> {
        let mut texels = Vec::with_capacity(width * height);
        for col in 0..width {
            for row in 0..height {
                texels.push(f(col, row));
            }
        }
        Self::new(width, height, texels)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row (from the bottom) that lies on the horizon.
    #[inline]
    pub fn horizon(&self) -> usize {
        self.height / 9
    }

    #[inline(always)]
    pub fn column(&self, col: usize) -> &[u8] {
        let col = col & (self.width - 1);
        &self.texels[col * self.height..][..self.height]
    }
}
