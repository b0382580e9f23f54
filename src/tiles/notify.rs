//! Redraw signalling between fetch tasks and the render loop
//!
//! The render loop doesn't care which tile arrived, only that something
//! changed and the visible tiles are worth scanning again. [`RedrawSignal`]
//! is a small bounded channel: when it is full, further notifications are
//! dropped, collapsing a burst of completed fetches into the few wakeups
//! already queued. A dropped notification is expected, not an error.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use super::manager::TileLoadEvent;
use crate::core::geo::TileCoord;

/// Sending half, cheap to clone and safe to call from any fetch task
#[derive(Debug, Clone)]
pub struct RedrawSignal {
    sender: Sender<TileCoord>,
}

/// Receiving half, owned by the render loop
#[derive(Debug)]
pub struct RedrawReceiver {
    receiver: Receiver<TileCoord>,
}

impl RedrawSignal {
    /// Create a signal that holds at most `capacity` undelivered wakeups
    pub fn new(capacity: usize) -> (RedrawSignal, RedrawReceiver) {
        let (sender, receiver) = bounded(capacity.max(1));
        (RedrawSignal { sender }, RedrawReceiver { receiver })
    }

    /// Queue a wakeup for `coord`
    ///
    /// Returns `false` if it was dropped because the queue is full or the
    /// receiver is gone.
    pub fn notify(&self, coord: TileCoord) -> bool {
        match self.sender.try_send(coord) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("redraw queue full, coalescing {}", coord);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Listener to hand to [`TileManager::set_on_load`](super::TileManager::set_on_load)
    pub fn listener(&self) -> impl Fn(&TileLoadEvent) + Send + Sync + 'static {
        let signal = self.clone();
        move |event: &TileLoadEvent| {
            signal.notify(event.coord);
        }
    }
}

impl RedrawReceiver {
    /// Take one pending wakeup without waiting
    pub fn try_recv(&self) -> Option<TileCoord> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for a wakeup
    ///
    /// `None` on timeout or once every sender is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TileCoord> {
        match self.receiver.recv_timeout(timeout) {
            Ok(coord) => Some(coord),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Empty the queue, returning how many wakeups it held
    pub fn drain(&self) -> usize {
        self.receiver.try_iter().count()
    }

    /// Wait for a wakeup, then swallow any others already queued
    ///
    /// Returns `true` if a redraw is due.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.recv_timeout(timeout).is_none() {
            return false;
        }
        self.drain();
        true
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
