//! Prelude module for common tilelet types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilelet::prelude::*;`

pub use crate::core::{
    config::{MapConfig, ProviderConfig},
    geo::{LatLng, Point, TileCoord},
    projection::{
        geo_to_tile, meters_per_pixel, pan_by_pixels, pixel_to_geo, tile_screen_origin,
        visible_tiles, world_pixel,
    },
    viewport::Viewport,
};

pub use crate::tiles::{
    FallbackProvider, LoadOutcome, RedrawReceiver, RedrawSignal, RemoteProvider, RetryPolicy,
    SyntheticProvider, TileImage, TileLoadEvent, TileManager, TileManagerConfig, TileProvider,
    TileStatus,
};

pub use crate::runtime::FetchRuntime;
pub use crate::{MapError, Result};

// Common std types
pub use std::sync::Arc;
pub use std::time::{Duration, Instant};

// Fast hash collections keyed by tile coordinates
pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
