//! Core constants shared by the projection math and the tile system.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Northern/southern edge of the Web-Mercator square, in degrees.
///
/// `atan(sinh(PI))`: the latitude at which the projected world becomes square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Ground resolution of one pixel at the equator at zoom 0, in meters.
pub const METERS_PER_PIXEL_AT_EQUATOR: f64 = 156_543.033_92;

/// Default lower zoom bound for a view.
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Default upper zoom bound for a view.
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Largest zoom whose `2^z` tile grid still fits a `u32` index.
pub const MAX_ZOOM_LEVEL: u8 = 30;

/// Tiles of margin added around the viewport when computing visible tiles.
pub const VISIBLE_TILE_MARGIN: i64 = 1;
