//! Tile cache and fetch scheduling in front of one provider
//!
//! [`TileManager::get_tile`] never blocks: it answers from the cache and, for
//! a tile it has never seen, inserts a `Pending` entry and spawns exactly one
//! background fetch. Concurrent callers asking for the same tile see the
//! pending entry and get `Ok(None)` without starting another fetch.
//!
//! Fetches run as tokio tasks on a [`FetchRuntime`]. A semaphore bounds how
//! many run at once, and the provider call itself goes through
//! `spawn_blocking` since providers are synchronous.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::cache::{CacheEntry, TileCache};
use super::image::TileImage;
use super::provider::TileProvider;
use crate::core::geo::TileCoord;
use crate::runtime::FetchRuntime;
use crate::{MapError, Result};

/// When a failed tile is fetched again on its own
///
/// The default never retries; failed tiles stay failed until
/// [`TileManager::retry`] or [`TileManager::clear`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Automatic retries allowed after the first attempt
    pub max_retries: u32,
    /// Wait after a failure before `get_tile` re-arms the fetch
    pub retry_delay_ms: u64,
    /// Double the delay after every further failure
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::never()
    }
}

impl RetryPolicy {
    pub fn never() -> Self {
        Self {
            max_retries: 0,
            retry_delay_ms: 0,
            exponential_backoff: false,
        }
    }

    pub fn new(max_retries: u32, retry_delay: Duration, exponential_backoff: bool) -> Self {
        Self {
            max_retries,
            retry_delay_ms: retry_delay.as_millis().min(u64::MAX as u128) as u64,
            exponential_backoff,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay required after `attempts` failed attempts
    pub fn delay_after(&self, attempts: u32) -> Duration {
        let retries_so_far = attempts.saturating_sub(1);
        let multiplier = if self.exponential_backoff {
            2_u64.saturating_pow(retries_so_far)
        } else {
            1
        };
        Duration::from_millis(self.retry_delay_ms.saturating_mul(multiplier))
    }

    /// Whether a tile that failed `attempts` times, last at `failed_at`,
    /// should be fetched again now
    pub fn should_retry(&self, attempts: u32, failed_at: Instant) -> bool {
        if attempts.saturating_sub(1) >= self.max_retries {
            return false;
        }
        failed_at.elapsed() >= self.delay_after(attempts)
    }
}

/// Configuration for the tile manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileManagerConfig {
    /// Upper bound on fetches running at the same time
    pub max_concurrent_fetches: usize,
    /// Settled tiles kept before the least recently used are evicted,
    /// `None` for no limit
    pub cache_capacity: Option<usize>,
    pub retry: RetryPolicy,
}

impl Default for TileManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            cache_capacity: Some(1024),
            retry: RetryPolicy::never(),
        }
    }
}

/// Configuration presets
impl TileManagerConfig {
    pub fn low_resource() -> Self {
        Self {
            max_concurrent_fetches: 2,
            cache_capacity: Some(256),
            retry: RetryPolicy::new(1, Duration::from_millis(500), false),
        }
    }

    pub fn high_performance() -> Self {
        Self {
            max_concurrent_fetches: 32,
            cache_capacity: Some(4096),
            retry: RetryPolicy::new(2, Duration::from_millis(250), true),
        }
    }

    pub fn for_testing() -> Self {
        Self {
            max_concurrent_fetches: 4,
            cache_capacity: None,
            retry: RetryPolicy::never(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(MapError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.cache_capacity == Some(0) {
            return Err(MapError::Config("cache_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Where a tile is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    /// Never requested, or dropped from the cache since
    Missing,
    Pending { attempt: u32 },
    Loaded,
    Failed { attempts: u32 },
}

/// How a fetch ended
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(TileImage),
    Failed(MapError),
}

/// Passed to the load listener once per completed fetch
#[derive(Debug, Clone, PartialEq)]
pub struct TileLoadEvent {
    pub coord: TileCoord,
    /// Which attempt this was, counting from 1
    pub attempt: u32,
    pub outcome: LoadOutcome,
}

impl TileLoadEvent {
    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome, LoadOutcome::Loaded(_))
    }
}

/// Snapshot of the cache and fetch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub loaded: usize,
    pub pending: usize,
    pub failed: usize,
    /// Fetches scheduled since the manager was created
    pub fetches_started: u64,
    pub fetches_succeeded: u64,
    pub fetches_failed: u64,
}

impl CacheStats {
    pub fn entries(&self) -> usize {
        self.loaded + self.pending + self.failed
    }
}

type Listener = Arc<dyn Fn(&TileLoadEvent) + Send + Sync>;

/// State shared with the fetch tasks
struct Shared {
    provider: Arc<dyn TileProvider>,
    cache: Mutex<TileCache>,
    listener: RwLock<Option<Listener>>,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
    fetches_started: AtomicU64,
    fetches_succeeded: AtomicU64,
    fetches_failed: AtomicU64,
}

impl Shared {
    fn cache(&self) -> MutexGuard<'_, TileCache> {
        // A panicking listener never runs under this lock, so the map is
        // consistent even if poisoned.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(&self) -> Option<Listener> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn run_fetch(self: Arc<Self>, coord: TileCoord, attempt: u32) {
        let result = self.fetch(coord).await;
        self.complete(coord, attempt, result);

        // The manager is gone. The provider may own a blocking HTTP client,
        // which must not be dropped on an async worker.
        if Arc::strong_count(&self) == 1 {
            tokio::task::spawn_blocking(move || drop(self));
        }
    }

    async fn fetch(&self, coord: TileCoord) -> Result<TileImage> {
        // Closed by shutdown while this fetch was queued
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| MapError::ShutDown)?;
        if self.closed.load(Ordering::Acquire) {
            return Err(MapError::ShutDown);
        }

        let provider = Arc::clone(&self.provider);
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || provider.fetch_tile(coord))
            .await
            .unwrap_or_else(|e| Err(MapError::Runtime(format!("fetch task for {} failed: {}", coord, e))));

        log::trace!("fetch of {} took {:?}", coord, started.elapsed());
        result
    }

    fn complete(&self, coord: TileCoord, attempt: u32, result: Result<TileImage>) {
        let outcome = match result {
            Ok(tile) => {
                self.fetches_succeeded.fetch_add(1, Ordering::Relaxed);
                log::info!("loaded tile {} from {}", coord, self.provider.name());
                self.cache().settle(coord, CacheEntry::Loaded(tile.clone()));
                LoadOutcome::Loaded(tile)
            }
            Err(error) => {
                self.fetches_failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("tile {} failed (attempt {}): {}", coord, attempt, error);
                self.cache().settle(
                    coord,
                    CacheEntry::Failed {
                        error: error.clone(),
                        attempts: attempt,
                        failed_at: Instant::now(),
                    },
                );
                LoadOutcome::Failed(error)
            }
        };

        // Called without any lock held, so the listener may call back in
        if let Some(listener) = self.listener() {
            listener(&TileLoadEvent {
                coord,
                attempt,
                outcome,
            });
        }
    }
}

/// Owns the tile cache and makes sure each tile is fetched at most once
/// at a time
///
/// Managers are independent: each has its own cache, provider and listener.
pub struct TileManager {
    shared: Arc<Shared>,
    config: TileManagerConfig,
    runtime: FetchRuntime,
}

impl TileManager {
    pub fn new(
        provider: Arc<dyn TileProvider>,
        config: TileManagerConfig,
        runtime: FetchRuntime,
    ) -> Result<Self> {
        config.validate()?;
        let permits = config.max_concurrent_fetches.min(Semaphore::MAX_PERMITS);

        log::debug!(
            "tile manager over {} with {} fetch slots",
            provider.name(),
            permits
        );

        let shared = Shared {
            provider,
            cache: Mutex::new(TileCache::new(config.cache_capacity)),
            listener: RwLock::new(None),
            permits: Arc::new(Semaphore::new(permits)),
            closed: AtomicBool::new(false),
            fetches_started: AtomicU64::new(0),
            fetches_succeeded: AtomicU64::new(0),
            fetches_failed: AtomicU64::new(0),
        };

        Ok(Self {
            shared: Arc::new(shared),
            config,
            runtime,
        })
    }

    /// Build a manager over a concrete provider
    pub fn with_provider<P: TileProvider + 'static>(
        provider: P,
        config: TileManagerConfig,
        runtime: FetchRuntime,
    ) -> Result<Self> {
        Self::new(Arc::new(provider), config, runtime)
    }

    /// Return the tile if it is loaded, schedule it if it is missing
    ///
    /// - `Ok(Some(tile))`: loaded, no I/O
    /// - `Ok(None)`: a fetch is in flight, possibly started by this call
    /// - `Err(e)`: the coordinate is invalid, the last fetch failed with
    ///   `e`, or the manager is shut down and the tile isn't cached
    pub fn get_tile(&self, coord: TileCoord) -> Result<Option<TileImage>> {
        coord.validate()?;

        let mut cache = self.shared.cache();
        let attempt = match cache.get(&coord).cloned() {
            Some(CacheEntry::Loaded(tile)) => return Ok(Some(tile)),
            Some(CacheEntry::Pending { .. }) => return Ok(None),
            Some(CacheEntry::Failed {
                error,
                attempts,
                failed_at,
            }) => {
                if self.is_shut_down() || !self.config.retry.should_retry(attempts, failed_at) {
                    return Err(error);
                }
                match cache.rearm(coord) {
                    Some(attempt) => attempt,
                    None => return Ok(None),
                }
            }
            None => {
                if self.is_shut_down() {
                    return Err(MapError::ShutDown);
                }
                cache.claim(coord);
                1
            }
        };
        drop(cache);

        self.schedule(coord, attempt);
        Ok(None)
    }

    /// Fetch a failed tile again
    ///
    /// Returns `true` if a fetch was scheduled, `false` if the tile wasn't
    /// in the failed state.
    pub fn retry(&self, coord: TileCoord) -> Result<bool> {
        coord.validate()?;
        if self.is_shut_down() {
            return Err(MapError::ShutDown);
        }

        let attempt = self.shared.cache().rearm(coord);
        match attempt {
            Some(attempt) => {
                self.schedule(coord, attempt);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn schedule(&self, coord: TileCoord, attempt: u32) {
        self.shared.fetches_started.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "scheduling fetch of {} from {} (attempt {})",
            coord,
            self.shared.provider.name(),
            attempt
        );
        let shared = Arc::clone(&self.shared);
        self.runtime.spawn(shared.run_fetch(coord, attempt));
    }

    /// Register the listener called once per completed fetch
    ///
    /// Replaces any previous listener. It runs on a fetch task, so it
    /// should hand off quickly; a [`RedrawSignal`](super::RedrawSignal)
    /// listener is the usual choice.
    pub fn set_on_load<F>(&self, listener: F)
    where
        F: Fn(&TileLoadEvent) + Send + Sync + 'static,
    {
        *self
            .shared
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(listener));
    }

    pub fn clear_on_load(&self) {
        *self
            .shared
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn status(&self, coord: TileCoord) -> TileStatus {
        match self.shared.cache().peek(&coord) {
            None => TileStatus::Missing,
            Some(CacheEntry::Pending { attempt }) => TileStatus::Pending { attempt: *attempt },
            Some(CacheEntry::Loaded(_)) => TileStatus::Loaded,
            Some(CacheEntry::Failed { attempts, .. }) => TileStatus::Failed {
                attempts: *attempts,
            },
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (loaded, pending, failed) = self.shared.cache().counts();
        CacheStats {
            loaded,
            pending,
            failed,
            fetches_started: self.shared.fetches_started.load(Ordering::Relaxed),
            fetches_succeeded: self.shared.fetches_succeeded.load(Ordering::Relaxed),
            fetches_failed: self.shared.fetches_failed.load(Ordering::Relaxed),
        }
    }

    /// Drop loaded and failed tiles; in-flight fetches are kept
    pub fn clear(&self) -> usize {
        let removed = self.shared.cache().clear_settled();
        log::debug!("cleared {} cached tiles", removed);
        removed
    }

    /// Forget one settled tile so the next `get_tile` fetches it afresh
    pub fn invalidate(&self, coord: TileCoord) -> bool {
        self.shared.cache().remove_settled(&coord).is_some()
    }

    /// Stop scheduling fetches
    ///
    /// Fetches waiting for a slot fail with [`MapError::ShutDown`]; ones
    /// already talking to the provider run to completion. Cached tiles stay
    /// readable.
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.permits.close();
        log::debug!("tile manager over {} shut down", self.shared.provider.name());
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn provider_name(&self) -> &str {
        self.shared.provider.name()
    }

    pub fn config(&self) -> &TileManagerConfig {
        &self.config
    }

    pub fn runtime(&self) -> &FetchRuntime {
        &self.runtime
    }
}

impl Drop for TileManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileManager")
            .field("provider", &self.provider_name())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
