use std::time::Duration;

use tilelet::prelude::*;

/// Example of driving the tile manager without any UI
fn main() -> tilelet::Result<()> {
    #[cfg(feature = "debug")]
    tilelet::init_logging();

    println!("tilelet headless example");
    println!("========================");

    let manager = TileManager::with_provider(
        SyntheticProvider::new(),
        TileManagerConfig::default(),
        FetchRuntime::owned(2)?,
    )?;
    let (signal, redraws) = RedrawSignal::new(1);
    manager.set_on_load(signal.listener());

    let locations = [
        ("New York", LatLng::new(40.7128, -74.0060), 11),
        ("London", LatLng::new(51.5074, -0.1278), 10),
        ("Tokyo", LatLng::new(35.6762, 139.6503), 12),
    ];

    for (name, location, zoom) in locations {
        let viewport = Viewport::new(location, zoom, (1024, 768));
        let tiles = viewport.visible_tiles()?;
        println!(
            "{} at zoom {}: {} tiles, {:.2} m/px, center tile {}",
            name,
            zoom,
            tiles.len(),
            viewport.meters_per_pixel(),
            geo_to_tile(location, zoom)?
        );

        // Keep asking until every tile is ready, waking up on each redraw signal
        let mut ready = 0;
        while ready < tiles.len() {
            ready = 0;
            for coord in &tiles {
                if let Ok(Some(_)) = manager.get_tile(*coord) {
                    ready += 1;
                }
            }
            if ready < tiles.len() && !redraws.wait(Duration::from_secs(5)) {
                println!("   timed out with {} of {} tiles", ready, tiles.len());
                break;
            }
        }
    }

    let stats = manager.stats();
    println!(
        "\n{} tiles cached, {} fetches started",
        stats.loaded, stats.fetches_started
    );

    manager.shutdown();
    Ok(())
}
