use std::sync::Arc;

use super::image::TileImage;
use crate::core::geo::TileCoord;
use crate::Result;

/// Anything that can produce the image for a tile
///
/// Calls are synchronous and may block on I/O; the [`TileManager`](super::TileManager)
/// runs them off the caller's thread. Implementations must reject coordinates
/// outside the grid with [`MapError::InvalidTileIndex`](crate::MapError::InvalidTileIndex)
/// before doing any work.
pub trait TileProvider: Send + Sync {
    /// Produce the image for `coord`
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage>;

    /// Short human-readable name used in logs
    fn name(&self) -> &str;
}

impl<P: TileProvider + ?Sized> TileProvider for Arc<P> {
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage> {
        (**self).fetch_tile(coord)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P: TileProvider + ?Sized> TileProvider for Box<P> {
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage> {
        (**self).fetch_tile(coord)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
