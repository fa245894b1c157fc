//! Per-thread async locks keyed by thread id.
//!
//! An entry lives only while some task holds or waits on it; the last guard to
//! drop removes it, so the map does not grow with every thread id ever seen.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub(crate) struct ThreadLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds the lock for one thread id until dropped.
pub(crate) struct ThreadGuard<'a> {
    owner: &'a ThreadLocks,
    thread_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ThreadLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `thread_id`.
    pub(crate) async fn lock(&self, thread_id: &str) -> ThreadGuard<'_> {
        let lock = self
            .locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ThreadGuard {
            owner: self,
            thread_id: thread_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or awaits this lock.
        self.owner
            .locks
            .remove_if(&self.thread_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn entry_is_removed_after_last_guard() {
        let locks = ThreadLocks::new();
        {
            let _a = locks.lock("a").await;
            let _b = locks.lock("b").await;
            assert_eq!(locks.len(), 2);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn waiter_keeps_entry_and_is_serialized() {
        let locks = Arc::new(ThreadLocks::new());
        let first = locks.lock("t").await;

        let l = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = l.lock("t").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        // The waiter still references the mutex, so the entry survives the first drop.
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
