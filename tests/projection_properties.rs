use tilelet::constants::{MAX_LATITUDE, METERS_PER_PIXEL_AT_EQUATOR, TILE_SIZE};
use tilelet::prelude::*;

const EPSILON: f64 = 1e-9;

fn sample_points() -> Vec<LatLng> {
    let mut points = Vec::new();
    let mut lat = -84.9;
    while lat < 85.0 {
        let mut lng = -180.0;
        while lng < 180.0 {
            points.push(LatLng::new(lat, lng));
            lng += 23.7;
        }
        lat += 7.3;
    }
    points
}

#[test]
fn test_round_trip_all_zooms() {
    for zoom in 0..=19 {
        for point in sample_points() {
            let back = pixel_to_geo(world_pixel(point, zoom), zoom);
            assert!(
                (back.lat - point.lat).abs() < EPSILON && (back.lng - point.lng).abs() < EPSILON,
                "round trip of {} at zoom {} gave {}",
                point,
                zoom,
                back
            );
        }
    }
}

#[test]
fn test_tile_indices_stay_on_grid() {
    let extremes = [
        LatLng::new(90.0, 180.0),
        LatLng::new(-90.0, -180.0),
        LatLng::new(89.9, 179.999),
        LatLng::new(-89.9, -179.999),
        LatLng::new(MAX_LATITUDE, 0.0),
        LatLng::new(-MAX_LATITUDE, 0.0),
    ];
    for zoom in 0..=19 {
        let grid = 1u64 << zoom;
        for point in sample_points().into_iter().chain(extremes) {
            let tile = geo_to_tile(point, zoom).unwrap();
            assert!(u64::from(tile.x) < grid, "{} -> {}", point, tile);
            assert!(u64::from(tile.y) < grid, "{} -> {}", point, tile);
            assert!(tile.is_valid());
        }
    }
}

#[test]
fn test_zoom_zero_is_single_tile() {
    for point in sample_points() {
        assert_eq!(geo_to_tile(point, 0).unwrap(), TileCoord::new(0, 0, 0));
    }
    let tiles = visible_tiles(LatLng::new(0.0, 0.0), 0, (2048, 2048)).unwrap();
    assert_eq!(tiles, vec![TileCoord::new(0, 0, 0)]);
}

#[test]
fn test_meters_per_pixel_at_equator() {
    let mpp = meters_per_pixel(0.0, 0);
    assert!((mpp - METERS_PER_PIXEL_AT_EQUATOR).abs() < 1e-6);
    assert!((mpp - 156_543.033_92).abs() < 1e-3);
}

#[test]
fn test_meters_per_pixel_halves_per_zoom() {
    for lat in [0.0, 30.0, 51.5, -60.0] {
        for zoom in 0..19 {
            let coarse = meters_per_pixel(lat, zoom);
            let fine = meters_per_pixel(lat, zoom + 1);
            assert!((coarse / fine - 2.0).abs() < 1e-12);
        }
    }
    // Latitude is in degrees: 60° is exactly half the equatorial value
    assert!((meters_per_pixel(60.0, 0) - METERS_PER_PIXEL_AT_EQUATOR / 2.0).abs() < 1e-6);
}

#[test]
fn test_visible_tiles_include_neighbors() {
    let zoom = 5;
    let tile_px = f64::from(TILE_SIZE);
    let center = pixel_to_geo(Point::new(10.5 * tile_px, 12.5 * tile_px), zoom);

    let tiles = visible_tiles(center, zoom, (512, 512)).unwrap();
    for x in 9..=11 {
        for y in 11..=13 {
            assert!(
                tiles.contains(&TileCoord::new(zoom, x, y)),
                "missing {}/{}/{}",
                zoom,
                x,
                y
            );
        }
    }
    assert_eq!(tiles[0], TileCoord::new(zoom, 10, 12));
    // 512px spans two tiles plus the margin ring on each side
    assert_eq!(tiles.len(), 25);
}

#[test]
fn test_visible_tiles_clip_at_world_edge() {
    let zoom = 3;
    let corner = pixel_to_geo(Point::new(1.0, 1.0), zoom);
    let tiles = visible_tiles(corner, zoom, (512, 512)).unwrap();

    assert!(tiles.contains(&TileCoord::new(zoom, 0, 0)));
    assert!(tiles.iter().all(|t| t.is_valid()));
    let unique: HashSet<TileCoord> = tiles.iter().copied().collect();
    assert_eq!(unique.len(), tiles.len());
}

#[test]
fn test_pan_then_pan_back() {
    let start = LatLng::new(40.7128, -74.0060);
    let moved = pan_by_pixels(start, 12, 300.0, -120.0);
    assert!(moved.lng < start.lng);
    assert!(moved.lat < start.lat);

    let back = pan_by_pixels(moved, 12, -300.0, 120.0);
    assert!((back.lat - start.lat).abs() < 1e-9);
    assert!((back.lng - start.lng).abs() < 1e-9);
}

#[test]
fn test_center_tile_straddles_screen_center() {
    let viewport = (800, 600);
    let center = LatLng::new(48.8566, 2.3522);
    let tile = geo_to_tile(center, 14).unwrap();
    let origin = tile_screen_origin(tile, center, viewport);
    let size = f64::from(TILE_SIZE);

    assert!(origin.x <= 400.0 && 400.0 < origin.x + size);
    assert!(origin.y <= 300.0 && 300.0 < origin.y + size);
}
