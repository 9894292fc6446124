//! Bounded, time-limited question cache.
//!
//! Entries live in independently locked shards so reads and writes on
//! different questions do not serialize. Capacity is global: when the total
//! number of entries exceeds the bound, the entry with the oldest recency tick
//! across all shard tails is evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lru::LruCache;
use metrics::{counter, gauge};
use tokio::time::Instant;

use crate::domain::entities::{QuestionAggregate, QuestionId};

use super::config::CacheConfig;
use super::lock::lock_shard;

const METRIC_HIT: &str = "qanda_question_cache_hit_total";
const METRIC_MISS: &str = "qanda_question_cache_miss_total";
const METRIC_EXPIRED: &str = "qanda_question_cache_expired_total";
const METRIC_EVICT: &str = "qanda_question_cache_evict_total";
const METRIC_STALE_POPULATE: &str = "qanda_question_cache_stale_populate_total";
const METRIC_ENTRIES: &str = "qanda_question_cache_entries";

/// A cached aggregate with its freshness and recency bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    aggregate: Arc<QuestionAggregate>,
    stored_at: Instant,
    touched: u64,
}

impl CacheEntry {
    fn is_fresh(&self, window: Duration) -> bool {
        self.stored_at.elapsed() < window
    }
}

/// Per-shard tombstones kept before they are folded into the shard floor.
const TOMBSTONE_LIMIT: usize = 256;

/// Position in a shard's invalidation history, taken before a load.
///
/// Populating with a ticket is refused when the same question was removed
/// after the ticket was issued, so a load that raced an invalidation cannot
/// put pre-mutation state back into the cache. Removals of other questions do
/// not affect the ticket unless the shard had to fold its tombstones, which
/// refuses every ticket issued before the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateTicket {
    question_id: QuestionId,
    issued: u64,
}

struct ShardState {
    entries: LruCache<QuestionId, CacheEntry>,
    /// Bumped by every removal in the shard.
    clock: u64,
    /// Tickets issued before this point are refused.
    floor: u64,
    /// Clock value of each question's latest removal.
    tombstones: HashMap<QuestionId, u64>,
}

impl ShardState {
    fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            clock: 0,
            floor: 0,
            tombstones: HashMap::new(),
        }
    }

    fn invalidate(&mut self, question_id: QuestionId) {
        let previous = self.clock;
        if self.tombstones.len() >= TOMBSTONE_LIMIT
            && !self.tombstones.contains_key(&question_id)
        {
            self.tombstones.clear();
            self.floor = previous;
        }
        self.clock = previous + 1;
        self.tombstones.insert(question_id, self.clock);
    }

    fn invalidate_all(&mut self) {
        self.clock += 1;
        self.floor = self.clock;
        self.tombstones.clear();
    }

    fn admits(&self, ticket: PopulateTicket) -> bool {
        ticket.issued >= self.floor
            && self
                .tombstones
                .get(&ticket.question_id)
                .is_none_or(|removed_at| *removed_at <= ticket.issued)
    }
}

pub struct QuestionCache {
    shards: Box<[Mutex<ShardState>]>,
    capacity: usize,
    freshness: Duration,
    len: AtomicUsize,
    ticks: AtomicU64,
}

impl QuestionCache {
    pub fn new(config: &CacheConfig) -> Self {
        let shards = (0..config.shard_count())
            .map(|_| Mutex::new(ShardState::new()))
            .collect();

        Self {
            shards,
            capacity: config.capacity_non_zero().get(),
            freshness: config.freshness(),
            len: AtomicUsize::new(0),
            ticks: AtomicU64::new(0),
        }
    }

    /// Look up a fresh aggregate. Never loads; stale entries are dropped and
    /// reported as a miss.
    pub fn get(&self, question_id: QuestionId) -> Option<Arc<QuestionAggregate>> {
        let mut state = lock_shard(self.shard(question_id), "get");
        let tick = self.next_tick();

        match state.entries.get_mut(&question_id) {
            None => {
                counter!(METRIC_MISS).increment(1);
                return None;
            }
            Some(entry) if entry.is_fresh(self.freshness) => {
                entry.touched = tick;
                counter!(METRIC_HIT).increment(1);
                return Some(Arc::clone(&entry.aggregate));
            }
            Some(_) => {}
        }

        state.entries.pop(&question_id);
        self.len.fetch_sub(1, Ordering::AcqRel);
        drop(state);

        counter!(METRIC_EXPIRED).increment(1);
        counter!(METRIC_MISS).increment(1);
        self.report_len();
        None
    }

    /// Insert or replace the entry for `aggregate.question_id`.
    pub fn set(&self, aggregate: Arc<QuestionAggregate>) {
        let question_id = aggregate.question_id;
        {
            let mut state = lock_shard(self.shard(question_id), "set");
            self.insert_locked(&mut state, aggregate);
        }
        self.enforce_capacity();
    }

    /// Evict unconditionally. Removing an absent key is a no-op.
    pub fn remove(&self, question_id: QuestionId) {
        let removed = {
            let mut state = lock_shard(self.shard(question_id), "remove");
            state.invalidate(question_id);
            let removed = state.entries.pop(&question_id).is_some();
            if removed {
                self.len.fetch_sub(1, Ordering::AcqRel);
            }
            removed
        };

        if removed {
            self.report_len();
        }
    }

    /// Capture the shard's invalidation clock for a later
    /// [`Self::set_with_ticket`].
    pub fn ticket(&self, question_id: QuestionId) -> PopulateTicket {
        let state = lock_shard(self.shard(question_id), "ticket");
        PopulateTicket {
            question_id,
            issued: state.clock,
        }
    }

    /// Populate unless the question was removed since `ticket` was taken.
    /// Returns whether the aggregate was stored.
    pub fn set_with_ticket(
        &self,
        ticket: PopulateTicket,
        aggregate: Arc<QuestionAggregate>,
    ) -> bool {
        if aggregate.question_id != ticket.question_id {
            return false;
        }

        {
            let mut state = lock_shard(self.shard(ticket.question_id), "set_with_ticket");
            if !state.admits(ticket) {
                counter!(METRIC_STALE_POPULATE).increment(1);
                return false;
            }
            self.insert_locked(&mut state, aggregate);
        }
        self.enforce_capacity();
        true
    }

    /// Drop every entry and invalidate outstanding tickets.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let mut state = lock_shard(shard, "clear");
            let dropped = state.entries.len();
            state.entries.clear();
            state.invalidate_all();
            self.len.fetch_sub(dropped, Ordering::AcqRel);
        }
        self.report_len();
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn shard(&self, question_id: QuestionId) -> &Mutex<ShardState> {
        let index = (question_id as u32 as usize) % self.shards.len();
        &self.shards[index]
    }

    fn next_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed)
    }

    fn insert_locked(&self, state: &mut ShardState, aggregate: Arc<QuestionAggregate>) {
        let entry = CacheEntry {
            stored_at: Instant::now(),
            touched: self.next_tick(),
            aggregate,
        };
        let question_id = entry.aggregate.question_id;
        if state.entries.put(question_id, entry).is_none() {
            self.len.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn enforce_capacity(&self) {
        while self.len() > self.capacity {
            if !self.evict_least_recent() {
                break;
            }
        }
        self.report_len();
    }

    /// Evict the globally least recently used entry. Returns false when every
    /// shard is empty or another caller already brought the cache back under
    /// capacity.
    fn evict_least_recent(&self) -> bool {
        let mut victim: Option<(usize, QuestionId, u64)> = None;
        for (index, shard) in self.shards.iter().enumerate() {
            let state = lock_shard(shard, "evict.scan");
            if let Some((question_id, entry)) = state.entries.peek_lru() {
                if victim.is_none_or(|(_, _, oldest)| entry.touched < oldest) {
                    victim = Some((index, *question_id, entry.touched));
                }
            }
        }

        let Some((index, question_id, touched)) = victim else {
            return false;
        };

        let mut state = lock_shard(&self.shards[index], "evict.pop");
        // The candidate may have been touched or removed since the scan; the
        // caller loops and rescans in that case.
        let unchanged = state
            .entries
            .peek(&question_id)
            .is_some_and(|entry| entry.touched == touched);
        if !unchanged {
            return true;
        }

        // Concurrent evictors may have picked different victims for the same
        // overflow. Only the ones that still find the cache over capacity
        // take an entry out.
        let reserved = self
            .len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| {
                (len > self.capacity).then(|| len - 1)
            })
            .is_ok();
        if !reserved {
            return false;
        }
        state.entries.pop(&question_id);
        counter!(METRIC_EVICT).increment(1);
        true
    }

    fn report_len(&self) {
        gauge!(METRIC_ENTRIES).set(self.len() as f64);
    }
}
