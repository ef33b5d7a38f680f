use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock the cache state, recovering the guard if a previous holder panicked.
///
/// The cache holds no authoritative data, so the worst a poisoned lock can
/// leave behind is a stale page that the next invalidation clears.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = target,
            result = "poisoned_recovered",
            "Recovered from poisoned cache lock"
        );
        poisoned.into_inner()
    })
}
