use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{MAX_LATITUDE, MAX_ZOOM_LEVEL, TILE_SIZE};
use crate::{MapError, Result};

/// Represents a geographical coordinate with latitude and longitude in degrees
///
/// Latitude is expected in `[-90, 90]`. Longitude is not bounded; the
/// projection reads it modulo 360. Latitudes beyond [`MAX_LATITUDE`] are
/// representable but fall outside the Web-Mercator square, see
/// [`crate::core::projection::world_pixel`] for what that means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude within `[-90, 90]` and a finite longitude
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && self.lng.is_finite()
    }

    /// Whether the latitude lies inside the square Web-Mercator world
    pub fn is_mercator_valid(&self) -> bool {
        (-MAX_LATITUDE..=MAX_LATITUDE).contains(&self.lat) && self.lng.is_finite()
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Wraps longitude to the `[-180, 180)` range
    pub fn wrap_lng(lng: f64) -> f64 {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }

    /// Clamps latitude to the Web-Mercator range
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Represents a point in world-pixel or screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Address of one tile in the slippy map grid
///
/// The grid at zoom `z` is `2^z × 2^z` tiles; `x` grows eastwards and `y`
/// southwards. Equality is structural, which makes this the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Builds a coordinate without checking it against the grid
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Builds a coordinate from signed indices, rejecting anything off the grid
    pub fn checked(z: u8, x: i64, y: i64) -> Result<Self> {
        let n = Self::grid_size(z)? as i64;
        if x < 0 || y < 0 || x >= n || y >= n {
            return Err(MapError::InvalidTileIndex { z, x, y });
        }
        Ok(Self::new(z, x as u32, y as u32))
    }

    /// Number of tiles per axis at `zoom`
    pub fn grid_size(zoom: u8) -> Result<u64> {
        if zoom > MAX_ZOOM_LEVEL {
            return Err(MapError::InvalidZoom(zoom));
        }
        Ok(1u64 << zoom)
    }

    /// Checks if the tile is valid for its zoom level
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Like [`is_valid`](Self::is_valid) but reports why
    pub fn validate(&self) -> Result<()> {
        let n = Self::grid_size(self.z)?;
        if u64::from(self.x) >= n || u64::from(self.y) >= n {
            return Err(MapError::InvalidTileIndex {
                z: self.z,
                x: i64::from(self.x),
                y: i64::from(self.y),
            });
        }
        Ok(())
    }

    /// World-pixel position of the tile's top-left corner
    pub fn world_origin(&self) -> Point {
        let size = f64::from(TILE_SIZE);
        Point::new(f64::from(self.x) * size, f64::from(self.y) * size)
    }

    /// Geographic position of the tile's northwest corner
    pub fn to_lat_lng(&self) -> LatLng {
        super::projection::pixel_to_geo(self.world_origin(), self.z)
    }

    /// Gets the parent tile at a lower zoom level
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            None
        } else {
            Some(TileCoord::new(self.z - 1, self.x / 2, self.y / 2))
        }
    }

    /// Gets the child tiles at a higher zoom level
    pub fn children(&self) -> Vec<TileCoord> {
        if self.z >= MAX_ZOOM_LEVEL {
            return Vec::new();
        }
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        vec![
            TileCoord::new(z, x, y),
            TileCoord::new(z, x + 1, y),
            TileCoord::new(z, x, y + 1),
            TileCoord::new(z, x + 1, y + 1),
        ]
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
