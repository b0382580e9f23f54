use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::core::constants::TILE_SIZE;
use crate::{MapError, Result};

/// An immutable 256×256 RGBA tile
///
/// Cloning is cheap: the pixels live behind an `Arc` and are shared by the
/// cache and every caller holding the tile.
#[derive(Clone)]
pub struct TileImage {
    pixels: Arc<RgbaImage>,
}

impl TileImage {
    /// Wrap an already decoded image, which must be exactly tile-sized
    pub fn new(pixels: RgbaImage) -> Result<Self> {
        if pixels.dimensions() != (TILE_SIZE, TILE_SIZE) {
            return Err(MapError::Decode(format!(
                "expected a {}x{} tile, got {}x{}",
                TILE_SIZE,
                TILE_SIZE,
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self {
            pixels: Arc::new(pixels),
        })
    }

    /// Decode an encoded raster (PNG, JPEG) into a tile
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Self::new(decoded.to_rgba8())
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Whether two handles share the same pixel buffer
    pub fn ptr_eq(&self, other: &TileImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for TileImage {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.pixels == *other.pixels
    }
}
