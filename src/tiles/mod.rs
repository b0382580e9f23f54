//! Tile images, the providers that produce them and the manager that caches them
//!
//! - [`TileProvider`] is the capability to turn a [`TileCoord`](crate::TileCoord)
//!   into a [`TileImage`]. [`RemoteProvider`] fetches over HTTP,
//!   [`SyntheticProvider`] draws a labelled placeholder and
//!   [`FallbackProvider`] chains two providers.
//! - [`TileManager`] sits in front of one provider, caches results and makes
//!   sure each tile is fetched at most once at a time.
//! - [`RedrawSignal`] turns load notifications into a coalescing "please
//!   redraw" channel for a render loop.

pub mod cache;
pub mod fallback;
pub mod http;
pub mod image;
pub mod manager;
pub mod notify;
pub mod provider;
pub mod remote;
pub mod source;
pub mod synthetic;

// Re-exports for convenience
pub use self::image::TileImage;
pub use cache::{CacheEntry, TileCache};
pub use fallback::FallbackProvider;
pub use http::{HttpClient, ReqwestClient};
pub use manager::{
    CacheStats, LoadOutcome, RetryPolicy, TileLoadEvent, TileManager, TileManagerConfig, TileStatus,
};
pub use notify::{RedrawReceiver, RedrawSignal};
pub use provider::TileProvider;
pub use remote::RemoteProvider;
pub use source::{OpenStreetMapSource, TileSource, UrlTemplate};
pub use synthetic::SyntheticProvider;
