//! Tokio runtime the tile manager spawns its fetch tasks on
//!
//! A [`FetchRuntime`] either borrows the handle of a runtime the caller
//! already runs, or owns a dedicated multi-threaded runtime for callers that
//! have none (plain threads, a headless front-end, tests).

use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::{MapError, Result};

/// Handle to the runtime fetch tasks run on
pub struct FetchRuntime {
    handle: Handle,
    owned: Option<Runtime>,
}

impl FetchRuntime {
    /// Borrow the runtime of the calling context
    ///
    /// Fails with [`MapError::Runtime`] outside a tokio runtime.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| MapError::Runtime(format!("no tokio runtime in scope: {}", e)))?;
        Ok(Self::from_handle(handle))
    }

    /// Spin up a dedicated runtime with `worker_threads` async workers
    pub fn owned(worker_threads: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("tile-fetch")
            .enable_time()
            .build()
            .map_err(|e| MapError::Runtime(format!("failed to build fetch runtime: {}", e)))?;

        log::debug!("started owned fetch runtime with {} workers", worker_threads.max(1));
        Ok(Self {
            handle: runtime.handle().clone(),
            owned: Some(runtime),
        })
    }

    /// The current runtime if there is one, a dedicated one otherwise
    pub fn current_or_owned(worker_threads: usize) -> Result<Self> {
        match Self::current() {
            Ok(runtime) => Ok(runtime),
            Err(_) => Self::owned(worker_threads),
        }
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            owned: None,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_owned(&self) -> bool {
        self.owned.is_some()
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl std::fmt::Debug for FetchRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRuntime")
            .field("owned", &self.is_owned())
            .finish()
    }
}

impl Drop for FetchRuntime {
    fn drop(&mut self) {
        // Never blocks, so dropping from inside an async context is fine.
        // Blocking provider calls still running are left to finish detached.
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_fails_outside_runtime() {
        assert!(matches!(FetchRuntime::current(), Err(MapError::Runtime(_))));
    }

    #[test]
    fn test_owned_runs_tasks() {
        let runtime = FetchRuntime::owned(1).unwrap();
        assert!(runtime.is_owned());

        let (tx, rx) = crossbeam_channel::bounded(1);
        runtime.spawn(async move {
            tx.send(21 * 2).unwrap();
        });
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(5)), Ok(42));
    }

    #[tokio::test]
    async fn test_current_borrows_handle() {
        let runtime = FetchRuntime::current_or_owned(1).unwrap();
        assert!(!runtime.is_owned());
        assert_eq!(runtime.spawn(async { 7 }).await.unwrap(), 7);
    }
}
