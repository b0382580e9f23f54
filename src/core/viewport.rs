use super::config::MapConfig;
use super::geo::{LatLng, Point, TileCoord};
use super::projection;
use crate::Result;

/// Manages the current view of the map: center, zoom, and screen dimensions
///
/// This is the renderer's state, not the tile system's. The tile manager never
/// sees it; it only derives which tiles to ask for.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level, always within `[min_zoom, max_zoom]`
    zoom: u8,
    /// The size of the viewport in pixels
    pub size: (u32, u32),
    /// The minimum allowed zoom level
    min_zoom: u8,
    /// The maximum allowed zoom level
    max_zoom: u8,
}

impl Viewport {
    /// Creates a new viewport with the default zoom bounds
    pub fn new(center: LatLng, zoom: u8, size: (u32, u32)) -> Self {
        Self::with_zoom_limits(
            center,
            zoom,
            size,
            super::constants::DEFAULT_MIN_ZOOM,
            super::constants::DEFAULT_MAX_ZOOM,
        )
    }

    /// Creates a viewport with explicit zoom bounds; `zoom` is clamped into them
    pub fn with_zoom_limits(
        center: LatLng,
        zoom: u8,
        size: (u32, u32),
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        let max_zoom = max_zoom.max(min_zoom);
        Self {
            center,
            zoom: zoom.clamp(min_zoom, max_zoom),
            size,
            min_zoom,
            max_zoom,
        }
    }

    /// Initial view described by a configuration
    pub fn from_config(config: &MapConfig) -> Self {
        Self::with_zoom_limits(
            config.center,
            config.zoom,
            config.viewport,
            config.min_zoom,
            config.max_zoom,
        )
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn zoom_limits(&self) -> (u8, u8) {
        (self.min_zoom, self.max_zoom)
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Returns `true` if the zoom changed
    pub fn zoom_in(&mut self) -> bool {
        let before = self.zoom;
        self.set_zoom(self.zoom.saturating_add(1));
        self.zoom != before
    }

    /// Returns `true` if the zoom changed
    pub fn zoom_out(&mut self) -> bool {
        let before = self.zoom;
        self.set_zoom(self.zoom.saturating_sub(1));
        self.zoom != before
    }

    /// Sets the viewport size
    pub fn set_size(&mut self, size: (u32, u32)) {
        self.size = size;
    }

    /// Moves the view by a drag of `(dx, dy)` screen pixels
    ///
    /// The resulting center is kept renderable: latitude is clamped to the
    /// Mercator band and longitude wrapped into `[-180, 180)`.
    pub fn pan(&mut self, delta: Point) {
        let moved = projection::pan_by_pixels(self.center, self.zoom, delta.x, delta.y);
        self.center = LatLng::new(LatLng::clamp_lat(moved.lat), LatLng::wrap_lng(moved.lng));
    }

    /// Tiles to request for this view, nearest-first
    pub fn visible_tiles(&self) -> Result<Vec<TileCoord>> {
        projection::visible_tiles(self.center, self.zoom, self.size)
    }

    /// Where to draw `tile` on screen
    pub fn tile_screen_origin(&self, tile: TileCoord) -> Point {
        projection::tile_screen_origin(tile, self.center, self.size)
    }

    /// Ground resolution at the view center, in meters per pixel
    pub fn meters_per_pixel(&self) -> f64 {
        projection::meters_per_pixel(self.center.lat, self.zoom)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_config(&MapConfig::default())
    }
}
