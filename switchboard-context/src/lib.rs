//! Switchboard Context - TTL-bounded session context store
//!
//! Keyed cache mapping a session/request identifier to an accumulated
//! context blob. Entries expire on a sliding TTL (every write pushes
//! `expires_at` forward), are lazily evicted on access past expiry, and are
//! additionally removed by a periodic sweep so memory stays bounded
//! regardless of access patterns.
//!
//! Concurrency model: one `tokio::sync::Mutex` per key, held only for the
//! in-memory read-modify-write. Two concurrent `merge` calls on the same key
//! never interleave field updates; operations on different keys never
//! contend. Callers always receive snapshot copies, never references into
//! the store.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use switchboard_core::{ContextConfig, ContextEntry, Timestamp};

// ============================================================================
// SLOT
// ============================================================================

/// Per-key slot guarding one entry.
///
/// `retired` marks a slot that has been unlinked from the map; a writer that
/// raced slot removal re-enters through the map instead of writing into a
/// detached slot.
#[derive(Debug, Default)]
struct Slot {
    state: Mutex<SlotState>,
}

#[derive(Debug, Default)]
struct SlotState {
    entry: Option<ContextEntry>,
    retired: bool,
}

// ============================================================================
// STATS
// ============================================================================

/// Counters describing store activity since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Reads that returned a live entry.
    pub hits: u64,
    /// Reads that found nothing (absent or expired).
    pub misses: u64,
    /// Entries removed past expiry (lazy or swept).
    pub evictions: u64,
    /// Live entries currently held.
    pub entries: u64,
}

impl ContextStats {
    /// Hit rate over all reads (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// CONTEXT STORE
// ============================================================================

/// The context store. One instance per hosting process, created at startup
/// and passed explicitly to consumers.
#[derive(Debug)]
pub struct ContextStore {
    slots: DashMap<String, Arc<Slot>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    live: AtomicU64,
}

impl ContextStore {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            slots: DashMap::new(),
            default_ttl: config.default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            live: AtomicU64::new(0),
        }
    }

    /// Store `payload` under `key`, overwriting any prior value.
    ///
    /// Returns a snapshot of the stored entry.
    pub async fn put(
        &self,
        key: &str,
        mut payload: BTreeMap<String, Value>,
        ttl: Option<Duration>,
    ) -> ContextEntry {
        let ttl = ttl.unwrap_or(self.default_ttl);
        loop {
            let slot = self.live_slot(key);
            let mut state = slot.state.lock().await;
            if state.retired {
                continue;
            }
            let now = Utc::now();
            let version = state.entry.as_ref().map(|e| e.version + 1).unwrap_or(1);
            if state.entry.is_none() {
                self.live.fetch_add(1, Ordering::Relaxed);
            }
            let entry = ContextEntry {
                key: key.to_string(),
                payload: std::mem::take(&mut payload),
                created_at: state
                    .entry
                    .as_ref()
                    .map(|e| e.created_at)
                    .unwrap_or(now),
                expires_at: expiry(now, ttl),
                version,
            };
            state.entry = Some(entry.clone());
            return entry;
        }
    }

    /// Snapshot of the entry under `key`, or `None` if absent or expired.
    ///
    /// An expired entry is lazily removed and counted as an eviction; the
    /// read itself never extends the TTL.
    pub async fn get(&self, key: &str) -> Option<ContextEntry> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let mut state = slot.state.lock().await;
        if state.retired {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let now = Utc::now();
        match &state.entry {
            Some(entry) if !entry.is_expired(now) => {
                let snapshot = entry.clone();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(snapshot)
            }
            Some(_) => {
                // Expired: evict in place, then unlink the slot.
                state.entry = None;
                state.retired = true;
                self.live.fetch_sub(1, Ordering::Relaxed);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                drop(state);
                self.unlink(key, &slot);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Merge `partial` into the entry under `key`, creating it when absent.
    ///
    /// The read-modify-write runs under the per-key mutex, so concurrent
    /// writers never lose fields. The TTL is sliding: `expires_at` moves to
    /// `now + ttl` on every merge. An entry found expired is replaced rather
    /// than merged into.
    pub async fn merge(
        &self,
        key: &str,
        partial: BTreeMap<String, Value>,
        ttl: Option<Duration>,
    ) -> ContextEntry {
        let ttl = ttl.unwrap_or(self.default_ttl);
        loop {
            let slot = self.live_slot(key);
            let mut state = slot.state.lock().await;
            if state.retired {
                continue;
            }
            let now = Utc::now();

            let (mut payload, created_at, version) = match state.entry.take() {
                Some(entry) if !entry.is_expired(now) => {
                    (entry.payload, entry.created_at, entry.version + 1)
                }
                Some(_) => {
                    // Expired under us: start fresh but record the eviction.
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    (BTreeMap::new(), now, 1)
                }
                None => {
                    self.live.fetch_add(1, Ordering::Relaxed);
                    (BTreeMap::new(), now, 1)
                }
            };

            for (field, value) in &partial {
                payload.insert(field.clone(), value.clone());
            }

            let entry = ContextEntry {
                key: key.to_string(),
                payload,
                created_at,
                expires_at: expiry(now, ttl),
                version,
            };
            state.entry = Some(entry.clone());
            return entry;
        }
    }

    /// Remove the entry under `key`. Idempotent; returns whether a live
    /// entry was removed.
    pub async fn remove(&self, key: &str) -> bool {
        let Some(slot) = self.slots.get(key).map(|s| Arc::clone(s.value())) else {
            return false;
        };
        let mut state = slot.state.lock().await;
        if state.retired {
            return false;
        }
        let had_entry = state.entry.take().is_some();
        state.retired = true;
        if had_entry {
            self.live.fetch_sub(1, Ordering::Relaxed);
        }
        drop(state);
        self.unlink(key, &slot);
        had_entry
    }

    /// Remove every expired entry. Returns the number evicted.
    ///
    /// Slots whose mutex is momentarily held by a writer are skipped; the
    /// next cycle picks them up.
    pub fn sweep(&self) -> u64 {
        let now = Utc::now();
        let mut evicted = 0u64;

        let keys: Vec<String> = self.slots.iter().map(|s| s.key().clone()).collect();
        for key in keys {
            let mut had_entry = false;
            let removed = self.slots.remove_if(&key, |_, slot| {
                let Ok(mut state) = slot.state.try_lock() else {
                    return false;
                };
                match &state.entry {
                    Some(entry) if entry.is_expired(now) => {
                        state.entry = None;
                        state.retired = true;
                        had_entry = true;
                        true
                    }
                    Some(_) => false,
                    None => {
                        // Empty slot left behind by a lazy eviction.
                        state.retired = true;
                        true
                    }
                }
            });
            if removed.is_some() && had_entry {
                evicted += 1;
                self.live.fetch_sub(1, Ordering::Relaxed);
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        evicted
    }

    /// Current counters.
    pub fn stats(&self) -> ContextStats {
        ContextStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.live.load(Ordering::Relaxed),
        }
    }

    /// Get or insert the live slot for `key`.
    fn live_slot(&self, key: &str) -> Arc<Slot> {
        Arc::clone(
            self.slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Slot::default()))
                .value(),
        )
    }

    /// Unlink a retired slot, but only if the map still points at it.
    fn unlink(&self, key: &str, slot: &Arc<Slot>) {
        self.slots.remove_if(key, |_, current| Arc::ptr_eq(current, slot));
    }
}

// TTLs beyond what chrono can represent are capped rather than rejected.
fn expiry(now: Timestamp, ttl: Duration) -> Timestamp {
    now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365_000))
}

// ============================================================================
// TESTS
// ============================================================================
