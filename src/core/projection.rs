//! Web-Mercator projection and tile-grid math
//!
//! Pure functions only: no state, no I/O. Three coordinate spaces are involved:
//!
//! - geographic ([`LatLng`], degrees),
//! - world pixels at a zoom level: the whole world is a square of
//!   `256 × 2^zoom` pixels, origin at the northwest corner, y pointing south,
//! - tile indices ([`TileCoord`]): world pixels divided by 256.
//!
//! Every function takes latitudes in degrees. Trigonometry converts to radians
//! internally, in exactly one place per formula.

use std::f64::consts::PI;

use super::constants::{METERS_PER_PIXEL_AT_EQUATOR, TILE_SIZE, VISIBLE_TILE_MARGIN};
use super::geo::{LatLng, Point, TileCoord};
use crate::{MapError, Result};

/// Side length of the world in pixels at `zoom`
pub fn world_size(zoom: u8) -> f64 {
    f64::from(TILE_SIZE) * 2_f64.powi(i32::from(zoom))
}

/// Projects a geographic point to continuous world-pixel coordinates
///
/// Longitude is read modulo 360, so `x` always lands in `[0, world_size)`.
///
/// Latitude is *not* clamped. Inside ±[`MAX_LATITUDE`](super::constants::MAX_LATITUDE)
/// `y` lies in `[0, world_size]`; beyond it `y` leaves the world square
/// (negative in the north, larger than the world in the south) and reaches
/// ±infinity at the poles. Callers that need a tile index should go through
/// [`geo_to_tile`], which clamps.
pub fn world_pixel(point: LatLng, zoom: u8) -> Point {
    let size = world_size(zoom);
    let lng = LatLng::wrap_lng(point.lng);
    let lat_rad = point.lat.to_radians();

    let x = (lng + 180.0) / 360.0 * size;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * size;

    Point::new(x, y)
}

/// Inverse of [`world_pixel`]
///
/// Round-trips within floating-point tolerance for latitudes inside the
/// Mercator band. Pixels outside the world square yield longitudes beyond
/// ±180 and latitudes approaching ±90.
pub fn pixel_to_geo(pixel: Point, zoom: u8) -> LatLng {
    let size = world_size(zoom);

    let lng = pixel.x / size * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * pixel.y / size)).sinh().atan();

    LatLng::new(lat_rad.to_degrees(), lng)
}

/// Tile containing `point` at `zoom`
///
/// `floor(world_pixel / 256)` per axis, clamped into `[0, 2^zoom)`. Points
/// north or south of the Mercator band therefore map to the first or last
/// row. Fails for zooms above
/// [`MAX_ZOOM_LEVEL`](super::constants::MAX_ZOOM_LEVEL) and for NaN or
/// infinite coordinates.
pub fn geo_to_tile(point: LatLng, zoom: u8) -> Result<TileCoord> {
    let last = (TileCoord::grid_size(zoom)? - 1) as f64;
    ensure_finite(point)?;
    let pixel = world_pixel(point, zoom);
    let tile = f64::from(TILE_SIZE);

    let x = (pixel.x / tile).floor().clamp(0.0, last);
    let y = (pixel.y / tile).floor().clamp(0.0, last);

    Ok(TileCoord::new(zoom, x as u32, y as u32))
}

/// Ground distance covered by one pixel, in meters
///
/// `latitude` is in degrees, like everywhere else in this crate.
pub fn meters_per_pixel(latitude: f64, zoom: u8) -> f64 {
    METERS_PER_PIXEL_AT_EQUATOR * latitude.to_radians().cos() / 2_f64.powi(i32::from(zoom))
}

/// Tiles whose footprint intersects a viewport centered on `center`
///
/// `viewport` is `(width, height)` in pixels. One extra ring of tiles is
/// included on every side so small pans don't reveal empty cells. Indices
/// outside `[0, 2^zoom)` are dropped, never wrapped.
///
/// The result is ordered nearest-first from the center tile, so callers that
/// request tiles in order get the middle of the screen first. A NaN or
/// infinite `center` is an error.
pub fn visible_tiles(center: LatLng, zoom: u8, viewport: (u32, u32)) -> Result<Vec<TileCoord>> {
    let last = (TileCoord::grid_size(zoom)? - 1) as f64;
    ensure_finite(center)?;
    let pixel = world_pixel(center, zoom);
    let (width, height) = (f64::from(viewport.0), f64::from(viewport.1));

    let x_range = tile_span(pixel.x - width / 2.0, pixel.x + width / 2.0, last);
    let y_range = tile_span(pixel.y - height / 2.0, pixel.y + height / 2.0, last);
    let (Some((min_x, max_x)), Some((min_y, max_y))) = (x_range, y_range) else {
        return Ok(Vec::new());
    };

    let mut tiles = Vec::with_capacity(((max_x - min_x + 1) * (max_y - min_y + 1)) as usize);
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            tiles.push(TileCoord::new(zoom, x as u32, y as u32));
        }
    }

    let focus = geo_to_tile(center, zoom)?;
    tiles.sort_by_key(|tile| {
        let dx = i64::from(tile.x) - i64::from(focus.x);
        let dy = i64::from(tile.y) - i64::from(focus.y);
        (dx * dx + dy * dy, tile.y, tile.x)
    });

    Ok(tiles)
}

/// Inclusive tile index range covering the pixel interval `[lo, hi)` plus margin
fn tile_span(lo: f64, hi: f64, last: f64) -> Option<(i64, i64)> {
    let tile = f64::from(TILE_SIZE);
    let margin = VISIBLE_TILE_MARGIN as f64;

    let first = ((lo / tile).floor() - margin).max(0.0);
    let end = ((hi / tile).ceil() - 1.0 + margin).min(last);

    // Empty when the interval lies wholly off the grid
    if first <= end {
        Some((first as i64, end as i64))
    } else {
        None
    }
}

// Non-finite input would otherwise saturate every clamp to a grid edge
fn ensure_finite(point: LatLng) -> Result<()> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(MapError::InvalidCoordinate(point.to_string()))
    }
}

/// New center after dragging the map by `(dx, dy)` screen pixels
///
/// Dragging the content right moves the center west, dragging it down moves
/// the center north. The result is not clamped or wrapped.
pub fn pan_by_pixels(center: LatLng, zoom: u8, dx: f64, dy: f64) -> LatLng {
    let pixel = world_pixel(center, zoom);
    pixel_to_geo(pixel.subtract(&Point::new(dx, dy)), zoom)
}

/// Screen position of a tile's top-left corner in a viewport centered on `center`
///
/// Uses the tile's own zoom level.
pub fn tile_screen_origin(tile: TileCoord, center: LatLng, viewport: (u32, u32)) -> Point {
    let center_px = world_pixel(center, tile.z);
    let half = Point::new(f64::from(viewport.0) / 2.0, f64::from(viewport.1) / 2.0);
    tile.world_origin().subtract(&center_px).add(&half)
}
