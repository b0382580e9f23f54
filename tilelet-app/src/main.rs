//! Headless map renderer
//!
//! Loads a map configuration, runs redraw passes over the visible tiles until
//! they have all settled (or a deadline passes), optionally pans a few steps,
//! and writes the last frame to a PNG.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use image::{imageops, Rgba, RgbaImage};
use tilelet::prelude::{
    FetchRuntime, HashSet, MapConfig, Point, RedrawReceiver, RedrawSignal, TileManager, Viewport,
};

const BACKGROUND: Rgba<u8> = Rgba([221, 221, 221, 255]);

#[derive(Parser)]
#[command(name = "tilelet-app")]
#[command(about = "Render a map view to a PNG without a window", long_about = None)]
struct Args {
    /// JSON map configuration (built-in defaults when omitted)
    config: Option<PathBuf>,

    /// Output PNG path
    #[arg(long, default_value = "map.png")]
    out: PathBuf,

    /// Drag the map by "dx,dy" screen pixels after the first frame; repeatable
    #[arg(long = "pan", value_parser = parse_delta, allow_hyphen_values = true)]
    pans: Vec<(f64, f64)>,

    /// Seconds to wait for a frame's tiles before drawing what is there
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Async worker threads for the fetch runtime
    #[arg(long, default_value = "2")]
    workers: usize,
}

fn parse_delta(s: &str) -> std::result::Result<(f64, f64), String> {
    let (dx, dy) = s
        .split_once(',')
        .ok_or_else(|| format!("expected dx,dy but got {:?}", s))?;
    let dx = dx.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let dy = dy.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((dx, dy))
}

fn main() -> Result<()> {
    tilelet::init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => MapConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => MapConfig::default(),
    };

    let provider = config
        .provider
        .build()
        .context("failed to build tile provider")?;
    let runtime = FetchRuntime::owned(args.workers)?;
    let manager = TileManager::new(provider, config.manager.clone(), runtime)?;

    // One slot: a burst of loads collapses into a single redraw
    let (signal, redraws) = RedrawSignal::new(1);
    manager.set_on_load(signal.listener());

    let mut viewport = Viewport::from_config(&config);
    let timeout = Duration::from_secs(args.timeout);

    log::info!(
        "rendering {} at zoom {} ({}x{}) from {}",
        viewport.center,
        viewport.zoom(),
        viewport.size.0,
        viewport.size.1,
        manager.provider_name()
    );

    let mut frame = render_frame(&manager, &viewport, &redraws, timeout)?;
    for (dx, dy) in &args.pans {
        viewport.pan(Point::new(*dx, *dy));
        log::info!("panned by ({}, {}) to {}", dx, dy, viewport.center);
        frame = render_frame(&manager, &viewport, &redraws, timeout)?;
    }

    frame
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    let stats = manager.stats();
    log::info!(
        "wrote {} ({} tiles loaded, {} failed, {} fetches)",
        args.out.display(),
        stats.loaded,
        stats.failed,
        stats.fetches_started
    );

    manager.shutdown();
    Ok(())
}

/// Redraw until every visible tile is loaded or failed, or `timeout` passes
///
/// Pending and failed tiles are left as background.
fn render_frame(
    manager: &TileManager,
    viewport: &Viewport,
    redraws: &RedrawReceiver,
    timeout: Duration,
) -> Result<RgbaImage> {
    let wanted = viewport.visible_tiles()?;
    let (width, height) = viewport.size;
    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
    let mut settled = HashSet::default();
    let deadline = Instant::now() + timeout;
    let mut passes = 0;

    loop {
        passes += 1;
        for coord in &wanted {
            if settled.contains(coord) {
                continue;
            }
            match manager.get_tile(*coord) {
                Ok(Some(tile)) => {
                    let origin = viewport.tile_screen_origin(*coord);
                    imageops::overlay(
                        &mut canvas,
                        tile.as_rgba(),
                        origin.x.round() as i64,
                        origin.y.round() as i64,
                    );
                    settled.insert(*coord);
                }
                Ok(None) => {}
                Err(e) => {
                    log::debug!("nothing to draw for {}: {}", coord, e);
                    settled.insert(*coord);
                }
            }
        }

        if settled.len() == wanted.len() {
            break;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            log::warn!(
                "gave up on {} of {} tiles after {:?}",
                wanted.len() - settled.len(),
                wanted.len(),
                timeout
            );
            break;
        }
        redraws.wait(remaining);
    }

    log::debug!("frame settled after {} passes", passes);
    Ok(canvas)
}
