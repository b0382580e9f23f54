use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tilelet::prelude::*;
use tilelet::tiles::CacheStats;

const WAIT: Duration = Duration::from_secs(10);

/// Provider that counts its calls and answers after a delay
struct Counting {
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl Counting {
    fn ok(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TileProvider for Counting {
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.fail {
            return Err(MapError::Network(format!("no route to {}", coord)));
        }
        SyntheticProvider::new().fetch_tile(coord)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Provider that blocks each fetch until the test releases it
struct Gate {
    started: Sender<TileCoord>,
    release: Receiver<()>,
}

impl TileProvider for Gate {
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage> {
        let _ = self.started.send(coord);
        let _ = self.release.recv_timeout(WAIT);
        SyntheticProvider::new().fetch_tile(coord)
    }

    fn name(&self) -> &str {
        "gate"
    }
}

fn manager_over(provider: Arc<dyn TileProvider>, config: TileManagerConfig) -> TileManager {
    TileManager::new(provider, config, FetchRuntime::owned(2).unwrap()).unwrap()
}

fn event_channel(manager: &TileManager) -> Receiver<TileLoadEvent> {
    let (tx, rx) = unbounded();
    manager.set_on_load(move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

#[test]
fn test_concurrent_requests_fetch_once() {
    let provider = Counting::ok(Duration::from_millis(200));
    let manager = Arc::new(manager_over(provider.clone(), TileManagerConfig::for_testing()));
    let events = event_channel(&manager);
    let coord = TileCoord::new(12, 1205, 1539);

    let callers = 16;
    let barrier = Arc::new(Barrier::new(callers));
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.get_tile(coord)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(None));
    }

    let event = events.recv_timeout(WAIT).unwrap();
    assert_eq!(event.coord, coord);
    assert!(event.is_loaded());
    assert_eq!(provider.calls(), 1);
    assert_eq!(manager.stats().fetches_started, 1);
    assert!(events.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn test_loaded_tile_served_from_cache() {
    let provider = Counting::ok(Duration::ZERO);
    let manager = manager_over(provider.clone(), TileManagerConfig::for_testing());
    let events = event_channel(&manager);
    let coord = TileCoord::new(4, 8, 5);

    assert_eq!(manager.get_tile(coord), Ok(None));
    let event = events.recv_timeout(WAIT).unwrap();
    let LoadOutcome::Loaded(delivered) = event.outcome else {
        panic!("expected a loaded tile");
    };

    for _ in 0..10 {
        let tile = manager.get_tile(coord).unwrap().unwrap();
        assert!(tile.ptr_eq(&delivered));
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(manager.status(coord), TileStatus::Loaded);
}

#[test]
fn test_failed_tile_returns_stored_error() {
    let provider = Counting::failing();
    let manager = manager_over(provider.clone(), TileManagerConfig::for_testing());
    let events = event_channel(&manager);
    let coord = TileCoord::new(6, 10, 20);

    assert_eq!(manager.get_tile(coord), Ok(None));
    let event = events.recv_timeout(WAIT).unwrap();
    assert!(matches!(event.outcome, LoadOutcome::Failed(MapError::Network(_))));

    for _ in 0..3 {
        assert!(matches!(manager.get_tile(coord), Err(MapError::Network(_))));
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(manager.status(coord), TileStatus::Failed { attempts: 1 });
    assert_eq!(manager.stats().failed, 1);
}

#[test]
fn test_failed_tiles_survive_eviction() {
    let provider = Counting::failing();
    let config = TileManagerConfig {
        cache_capacity: Some(2),
        ..TileManagerConfig::for_testing()
    };
    let manager = manager_over(provider.clone(), config);
    let events = event_channel(&manager);
    let coords = [
        TileCoord::new(3, 0, 0),
        TileCoord::new(3, 1, 0),
        TileCoord::new(3, 2, 0),
    ];

    for coord in coords {
        assert_eq!(manager.get_tile(coord), Ok(None));
        events.recv_timeout(WAIT).unwrap();
    }

    // Over capacity, yet the first error is still what callers see
    assert!(matches!(manager.get_tile(coords[0]), Err(MapError::Network(_))));
    assert_eq!(manager.status(coords[0]), TileStatus::Failed { attempts: 1 });
    assert_eq!(manager.stats().failed, 3);
    assert_eq!(provider.calls(), 3);
}

#[test]
fn test_loaded_tiles_evicted_past_capacity() {
    let provider = Counting::ok(Duration::ZERO);
    let config = TileManagerConfig {
        cache_capacity: Some(1),
        ..TileManagerConfig::for_testing()
    };
    let manager = manager_over(provider.clone(), config);
    let events = event_channel(&manager);
    let first = TileCoord::new(3, 0, 0);
    let second = TileCoord::new(3, 1, 0);

    for coord in [first, second] {
        assert_eq!(manager.get_tile(coord), Ok(None));
        events.recv_timeout(WAIT).unwrap();
    }

    assert_eq!(manager.status(first), TileStatus::Missing);
    assert_eq!(manager.status(second), TileStatus::Loaded);
    assert_eq!(manager.stats().loaded, 1);
}

#[test]
fn test_explicit_retry() {
    let provider = Counting::failing();
    let manager = manager_over(provider.clone(), TileManagerConfig::for_testing());
    let events = event_channel(&manager);
    let coord = TileCoord::new(6, 10, 20);

    // Nothing to retry yet
    assert_eq!(manager.retry(coord), Ok(false));

    manager.get_tile(coord).unwrap();
    events.recv_timeout(WAIT).unwrap();

    assert_eq!(manager.retry(coord), Ok(true));
    // A retry in flight is not retried again
    assert_eq!(manager.retry(coord), Ok(false));
    let event = events.recv_timeout(WAIT).unwrap();
    assert_eq!(event.attempt, 2);

    assert_eq!(provider.calls(), 2);
    assert_eq!(manager.status(coord), TileStatus::Failed { attempts: 2 });
}

#[test]
fn test_retry_policy_rearms_on_get() {
    let provider = Counting::failing();
    let config = TileManagerConfig {
        retry: RetryPolicy::new(1, Duration::ZERO, false),
        ..TileManagerConfig::for_testing()
    };
    let manager = manager_over(provider.clone(), config);
    let events = event_channel(&manager);
    let coord = TileCoord::new(3, 1, 1);

    assert_eq!(manager.get_tile(coord), Ok(None));
    assert_eq!(events.recv_timeout(WAIT).unwrap().attempt, 1);

    // One automatic retry allowed
    assert_eq!(manager.get_tile(coord), Ok(None));
    assert_eq!(events.recv_timeout(WAIT).unwrap().attempt, 2);

    // Budget spent, the error sticks
    assert!(matches!(manager.get_tile(coord), Err(MapError::Network(_))));
    assert_eq!(provider.calls(), 2);
}

#[test]
fn test_invalid_index_rejected_before_fetch() {
    let provider = Counting::ok(Duration::ZERO);
    let manager = manager_over(provider.clone(), TileManagerConfig::for_testing());

    assert!(matches!(
        manager.get_tile(TileCoord::new(2, 4, 0)),
        Err(MapError::InvalidTileIndex { .. })
    ));
    assert!(matches!(
        manager.get_tile(TileCoord::new(3, 0, 8)),
        Err(MapError::InvalidTileIndex { .. })
    ));
    assert!(manager.get_tile(TileCoord::new(31, 0, 0)).is_err());

    assert_eq!(manager.status(TileCoord::new(2, 4, 0)), TileStatus::Missing);
    assert_eq!(manager.stats(), CacheStats::default());
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_listener_replacement() {
    let provider = Counting::ok(Duration::ZERO);
    let manager = manager_over(provider, TileManagerConfig::for_testing());

    let old = event_channel(&manager);
    let new = event_channel(&manager);

    manager.get_tile(TileCoord::new(1, 1, 0)).unwrap();
    assert_eq!(new.recv_timeout(WAIT).unwrap().coord, TileCoord::new(1, 1, 0));
    assert!(old.try_recv().is_err());
}

#[test]
fn test_independent_managers() {
    let provider = Counting::ok(Duration::ZERO);
    let first = manager_over(provider.clone(), TileManagerConfig::for_testing());
    let second = manager_over(provider.clone(), TileManagerConfig::for_testing());
    let first_events = event_channel(&first);
    let second_events = event_channel(&second);
    let coord = TileCoord::new(5, 5, 5);

    first.get_tile(coord).unwrap();
    first_events.recv_timeout(WAIT).unwrap();

    assert_eq!(second.status(coord), TileStatus::Missing);
    second.get_tile(coord).unwrap();
    second_events.recv_timeout(WAIT).unwrap();
    assert_eq!(provider.calls(), 2);
}

#[test]
fn test_clear_keeps_nothing_settled() {
    let provider = Counting::ok(Duration::ZERO);
    let manager = manager_over(provider.clone(), TileManagerConfig::for_testing());
    let events = event_channel(&manager);
    let coord = TileCoord::new(2, 1, 2);

    manager.get_tile(coord).unwrap();
    events.recv_timeout(WAIT).unwrap();

    assert_eq!(manager.clear(), 1);
    assert_eq!(manager.status(coord), TileStatus::Missing);

    manager.get_tile(coord).unwrap();
    events.recv_timeout(WAIT).unwrap();
    assert_eq!(provider.calls(), 2);
}

#[test]
fn test_shutdown_fails_queued_fetches() {
    let (started_tx, started_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    let provider = Arc::new(Gate {
        started: started_tx,
        release: release_rx,
    });
    let config = TileManagerConfig {
        max_concurrent_fetches: 1,
        ..TileManagerConfig::for_testing()
    };
    let manager = manager_over(provider, config);
    let events = event_channel(&manager);

    let running = TileCoord::new(4, 0, 0);
    let queued = TileCoord::new(4, 1, 0);

    manager.get_tile(running).unwrap();
    assert_eq!(started_rx.recv_timeout(WAIT).unwrap(), running);
    manager.get_tile(queued).unwrap();

    manager.shutdown();
    assert_eq!(manager.get_tile(TileCoord::new(4, 2, 0)), Err(MapError::ShutDown));
    assert_eq!(manager.retry(queued), Err(MapError::ShutDown));

    // The queued fetch never reaches the provider
    let event = events.recv_timeout(WAIT).unwrap();
    assert_eq!(event.coord, queued);
    assert_eq!(event.outcome, LoadOutcome::Failed(MapError::ShutDown));

    // The running one completes normally
    release_tx.send(()).unwrap();
    let event = events.recv_timeout(WAIT).unwrap();
    assert_eq!(event.coord, running);
    assert!(event.is_loaded());

    assert!(manager.get_tile(running).unwrap().is_some());
    assert_eq!(manager.get_tile(queued), Err(MapError::ShutDown));
    assert!(started_rx.try_recv().is_err());
}

#[test]
fn test_redraw_pass_over_visible_tiles() {
    let provider = Counting::ok(Duration::from_millis(5));
    let manager = manager_over(provider.clone(), TileManagerConfig::for_testing());
    let (signal, redraws) = RedrawSignal::new(1);
    manager.set_on_load(signal.listener());

    let viewport = Viewport::new(LatLng::new(35.6762, 139.6503), 9, (640, 480));
    let wanted = viewport.visible_tiles().unwrap();
    assert!(!wanted.is_empty());

    let mut drawn = HashSet::default();
    let mut passes = 0;
    while drawn.len() < wanted.len() {
        passes += 1;
        assert!(passes < 1000, "tiles never finished loading");
        for coord in &wanted {
            if let Ok(Some(_)) = manager.get_tile(*coord) {
                drawn.insert(*coord);
            }
        }
        if drawn.len() < wanted.len() {
            redraws.wait(WAIT);
        }
    }

    assert_eq!(provider.calls(), wanted.len());
    assert_eq!(manager.stats().loaded, wanted.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_inside_tokio_runtime() {
    let provider = Counting::ok(Duration::from_millis(20));
    let manager = TileManager::new(
        provider.clone(),
        TileManagerConfig::default(),
        FetchRuntime::current().unwrap(),
    )
    .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    manager.set_on_load(move |event| {
        let _ = tx.send(event.coord);
    });

    let coords: Vec<TileCoord> = TileCoord::new(1, 0, 0).children();
    for coord in &coords {
        assert_eq!(manager.get_tile(*coord), Ok(None));
        assert_eq!(manager.get_tile(*coord), Ok(None));
    }

    let mut seen = HashSet::default();
    while seen.len() < coords.len() {
        let coord = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for tiles")
            .expect("listener dropped");
        seen.insert(coord);
    }

    assert_eq!(provider.calls(), coords.len());
    for coord in &coords {
        assert!(manager.get_tile(*coord).unwrap().is_some());
    }
}
