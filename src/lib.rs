//! # tilelet
//!
//! Slippy-map tile plumbing for renderers: Web-Mercator projection math,
//! tile addressing, pluggable tile providers and a cache that guarantees at
//! most one fetch per tile no matter how many callers ask for it.
//!
//! The renderer computes the visible tiles with [`core::projection`], asks a
//! [`TileManager`] for each one every redraw pass and paints whatever is
//! ready. Missing tiles are fetched in the background and a load listener
//! (usually a [`RedrawSignal`]) tells the renderer to scan again.

pub mod core;
pub mod prelude;
pub mod runtime;
pub mod tiles;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{MapConfig, ProviderConfig},
    geo::{LatLng, Point, TileCoord},
    projection::{geo_to_tile, meters_per_pixel, pixel_to_geo, visible_tiles, world_pixel},
    viewport::Viewport,
};

pub use crate::tiles::{
    FallbackProvider, RedrawSignal, RemoteProvider, SyntheticProvider, TileImage, TileManager,
    TileManagerConfig, TileProvider,
};

pub use crate::runtime::FetchRuntime;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
///
/// `Clone` so that a failed tile can hand the same error to every caller
/// that asks for it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("tile {z}/{x}/{y} is outside the grid for zoom {z}")]
    InvalidTileIndex { z: u8, x: i64, y: i64 },

    #[error("zoom level {0} is not supported")]
    InvalidZoom(u8),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid coordinate {0}")]
    InvalidCoordinate(String),

    #[error("invalid URL template: {0}")]
    InvalidTemplate(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("tile manager has been shut down")]
    ShutDown,
}

impl From<image::ImageError> for MapError {
    fn from(err: image::ImageError) -> Self {
        MapError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Config(err.to_string())
    }
}

/// Error type alias for convenience
pub type Error = MapError;

/// Install `env_logger` as the `log` backend, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
