//! Per-repository serialization of refreshes
//!
//! Two refreshes of the same repository must not interleave their delete and
//! insert phases. Refreshes of different repositories never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held for the duration of one refresh
pub(crate) type RefreshGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub(crate) struct RefreshLocks {
    // Weak so that finished repositories do not pin a mutex forever
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl RefreshLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait until no other refresh of `repository_url` is running
    pub(crate) async fn acquire(&self, repository_url: &str) -> RefreshGuard {
        let lock = self.lock_for(repository_url);
        lock.lock_owned().await
    }

    fn lock_for(&self, repository_url: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = locks.get(repository_url).and_then(Weak::upgrade) {
            return existing;
        }

        locks.retain(|_, weak| weak.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(repository_url.to_string(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
