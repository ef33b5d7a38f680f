//! Per-key single-flight coordination for cache fills.
//!
//! The first miss on a key becomes the leader and computes; concurrent misses
//! on the same key queue behind it and re-check the cache once it finishes.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::keys::CacheKey;

#[derive(Default)]
pub(crate) struct FlightGroup {
    slots: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl FlightGroup {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task is computing `key`, then hold the slot.
    pub(crate) async fn enter(&self, key: &CacheKey) -> Flight<'_> {
        // Clone under the shard lock so `Flight::drop` sees every waiter.
        let slot = Arc::clone(&*self.slots.entry(key.clone()).or_default());
        let permit = slot.lock_owned().await;
        Flight {
            group: self,
            key: key.clone(),
            permit: Some(permit),
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

pub(crate) struct Flight<'a> {
    group: &'a FlightGroup,
    key: CacheKey,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        drop(self.permit.take());
        // Only the map still references the slot: nobody is waiting on it.
        self.group
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::cache::keys::ListingOperation;

    #[tokio::test]
    async fn slot_is_released_after_last_holder() {
        let group = FlightGroup::new();
        let key = CacheKey::listing(ListingOperation::AllAuthors, 1, 3);

        {
            let _flight = group.enter(&key).await;
            assert_eq!(group.in_flight(), 1);
        }

        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn holders_of_one_key_run_one_at_a_time() {
        let group = Arc::new(FlightGroup::new());
        let key = CacheKey::listing(ListingOperation::BookList, 1, 3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let group = Arc::clone(&group);
                let key = key.clone();
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _flight = group.enter(&key).await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.expect("task should finish");
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(group.in_flight(), 0);
    }
}
