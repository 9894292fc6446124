use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

/// Lock a cache shard. A shard poisoned by a panicking holder is still
/// usable: every mutation leaves the entry map and the length counter
/// consistent before it can panic.
pub(crate) fn lock_shard<'a, T>(shard: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    shard.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!(op, "Question cache shard was poisoned; continuing with its contents");
        poisoned.into_inner()
    })
}
