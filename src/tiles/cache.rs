use std::time::Instant;

use lru::LruCache;

use super::image::TileImage;
use crate::core::geo::TileCoord;
use crate::MapError;

/// Lifecycle of one cached tile
///
/// Created `Pending` when first requested, then settled exactly once into
/// `Loaded` or `Failed` by the fetch that created it. `Loaded` never changes
/// again. `Failed` can only go back to `Pending` through a retry.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// A fetch is in flight; `attempt` counts from 1
    Pending { attempt: u32 },
    Loaded(TileImage),
    Failed {
        error: MapError,
        attempts: u32,
        failed_at: Instant,
    },
}

impl CacheEntry {
    pub fn is_pending(&self) -> bool {
        matches!(self, CacheEntry::Pending { .. })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, CacheEntry::Loaded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CacheEntry::Failed { .. })
    }
}

/// In-memory tile state map with optional LRU eviction
///
/// Not synchronized itself: the [`TileManager`](super::TileManager) keeps it
/// behind one mutex so claim-and-insert is a single critical section.
/// Eviction only ever drops `Loaded` entries. A `Pending` entry stays until
/// its fetch completes and a `Failed` one keeps its error until it is retried
/// or removed, whatever the capacity.
#[derive(Debug)]
pub struct TileCache {
    entries: LruCache<TileCoord, CacheEntry>,
    capacity: Option<usize>,
}

impl TileCache {
    /// `None` keeps every tile for the lifetime of the cache
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    /// Look up an entry and mark it as recently used
    pub fn get(&mut self, coord: &TileCoord) -> Option<&CacheEntry> {
        self.entries.get(coord)
    }

    /// Look up an entry without touching its recency
    pub fn peek(&self, coord: &TileCoord) -> Option<&CacheEntry> {
        self.entries.peek(coord)
    }

    /// Insert a `Pending` entry if the key is vacant
    ///
    /// Returns `true` when the caller now owns the fetch for `coord`.
    pub fn claim(&mut self, coord: TileCoord) -> bool {
        if self.entries.contains(&coord) {
            return false;
        }
        self.entries.put(coord, CacheEntry::Pending { attempt: 1 });
        self.evict_excess();
        true
    }

    /// Turn a `Failed` entry back into `Pending` for another attempt
    ///
    /// Returns the new attempt number, or `None` if the entry isn't failed.
    pub fn rearm(&mut self, coord: TileCoord) -> Option<u32> {
        let entry = self.entries.get_mut(&coord)?;
        let CacheEntry::Failed { attempts, .. } = entry else {
            return None;
        };
        let attempt = *attempts + 1;
        *entry = CacheEntry::Pending { attempt };
        Some(attempt)
    }

    /// Record the outcome of a fetch
    pub fn settle(&mut self, coord: TileCoord, entry: CacheEntry) {
        debug_assert!(!entry.is_pending());
        self.entries.put(coord, entry);
        self.evict_excess();
    }

    /// Drop every settled entry, keeping in-flight ones
    pub fn clear_settled(&mut self) -> usize {
        let settled: Vec<TileCoord> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_pending())
            .map(|(coord, _)| *coord)
            .collect();
        for coord in &settled {
            self.entries.pop(coord);
        }
        settled.len()
    }

    /// Remove one entry unless it is pending
    pub fn remove_settled(&mut self, coord: &TileCoord) -> Option<CacheEntry> {
        if self.entries.peek(coord)?.is_pending() {
            return None;
        }
        self.entries.pop(coord)
    }

    fn evict_excess(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() > capacity {
            // iter() runs most- to least-recently used
            let victim = self
                .entries
                .iter()
                .rev()
                .find(|(_, entry)| entry.is_loaded())
                .map(|(coord, _)| *coord);
            match victim {
                Some(coord) => {
                    log::trace!("evicting tile {}", coord);
                    self.entries.pop(&coord);
                }
                None => break,
            }
        }
    }

    /// Counts of `(loaded, pending, failed)` entries
    pub fn counts(&self) -> (usize, usize, usize) {
        self.entries
            .iter()
            .fold((0, 0, 0), |(loaded, pending, failed), (_, entry)| match entry {
                CacheEntry::Loaded(_) => (loaded + 1, pending, failed),
                CacheEntry::Pending { .. } => (loaded, pending + 1, failed),
                CacheEntry::Failed { .. } => (loaded, pending, failed + 1),
            })
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(Some(1024))
    }
}
