use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tilelet::prelude::*;
use tilelet::tiles::{HttpClient, UrlTemplate};

/// Provider with a fixed answer that counts its calls
struct Scripted {
    calls: AtomicUsize,
    result: Result<TileImage>,
}

impl Scripted {
    fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: SyntheticProvider::new().fetch_tile(TileCoord::new(0, 0, 0)),
        }
    }

    fn failing(error: MapError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Err(error),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TileProvider for Scripted {
    fn fetch_tile(&self, _coord: TileCoord) -> Result<TileImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// HTTP client that fails every request and records it
#[derive(Default)]
struct Offline {
    requests: Mutex<Vec<String>>,
}

impl HttpClient for Offline {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        Err(MapError::Network(format!("connection refused: {}", url)))
    }
}

#[test]
fn test_fallback_uses_secondary_after_primary_fails() {
    let provider = FallbackProvider::new(
        Scripted::failing(MapError::Network("offline".into())),
        Scripted::succeeding(),
    );

    let tile = provider.fetch_tile(TileCoord::new(7, 64, 42)).unwrap();
    assert_eq!(tile, provider.secondary().result.clone().unwrap());
    assert_eq!(provider.primary().calls(), 1);
    assert_eq!(provider.secondary().calls(), 1);
}

#[test]
fn test_fallback_never_calls_secondary_on_success() {
    let provider = FallbackProvider::new(
        Scripted::succeeding(),
        Scripted::failing(MapError::Decode("unused".into())),
    );

    for x in 0..8 {
        provider.fetch_tile(TileCoord::new(3, x, 0)).unwrap();
    }
    assert_eq!(provider.primary().calls(), 8);
    assert_eq!(provider.secondary().calls(), 0);
}

#[test]
fn test_remote_falls_back_to_synthetic() {
    let source = UrlTemplate::parse("https://tiles.example.com/{z}/{x}/{y}.png").unwrap();
    let remote = RemoteProvider::new(source, Offline::default());
    let provider = FallbackProvider::new(remote, SyntheticProvider::new());
    let coord = TileCoord::new(10, 301, 384);

    let tile = provider.fetch_tile(coord).unwrap();
    assert_eq!(tile, SyntheticProvider::new().fetch_tile(coord).unwrap());
    assert_eq!(provider.name(), "remote+synthetic");
}

#[test]
fn test_synthetic_tiles_are_full_size() {
    let tile = SyntheticProvider::new()
        .fetch_tile(TileCoord::new(19, 1, 2))
        .unwrap();
    assert_eq!((tile.width(), tile.height()), (256, 256));
}

#[test]
fn test_provider_chain_from_config() {
    let json = r#"{
        "provider": {
            "type": "fallback",
            "primary": { "type": "synthetic" },
            "secondary": {
                "type": "fallback",
                "primary": { "type": "synthetic" },
                "secondary": { "type": "synthetic" }
            }
        }
    }"#;
    let config = MapConfig::from_json_str(json).unwrap();
    let provider = config.provider.build().unwrap();

    assert_eq!(provider.name(), "synthetic+synthetic+synthetic");
    assert!(provider.fetch_tile(TileCoord::new(2, 3, 3)).is_ok());
    assert!(matches!(
        provider.fetch_tile(TileCoord::new(2, 4, 3)),
        Err(MapError::InvalidTileIndex { .. })
    ));
}

#[test]
fn test_manager_over_configured_provider() {
    let config = MapConfig::from_json_str(r#"{ "provider": { "type": "synthetic" } }"#).unwrap();
    let manager = TileManager::new(
        config.provider.build().unwrap(),
        config.manager.clone(),
        FetchRuntime::owned(1).unwrap(),
    )
    .unwrap();
    let (signal, redraws) = RedrawSignal::new(4);
    manager.set_on_load(signal.listener());

    let coord = TileCoord::new(1, 1, 1);
    assert_eq!(manager.get_tile(coord), Ok(None));
    assert_eq!(redraws.recv_timeout(Duration::from_secs(10)), Some(coord));
    assert!(manager.get_tile(coord).unwrap().is_some());
    assert_eq!(manager.provider_name(), "synthetic");
}
