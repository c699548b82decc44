//! Per-route concurrency and request-rate accounting.
//!
//! # Responsibilities
//! - Track in-flight requests per route key (atomic, never negative)
//! - Record request arrivals into an optional per-route RPS ring buffer
//! - Expose a point-in-time snapshot for the autoscaler
//! - Follow the route set: create on first reference, prune on rebuild
//!
//! # Design Decisions
//! - A request that matched a route just before a rebuild removed it is
//!   counted on a detached entry, so it cannot bring the key back into
//!   the snapshot

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::counter::rps::RpsBuckets;
use crate::observability::metrics;

/// Wire format of one route in the `/queue` snapshot. Field names are part
/// of the autoscaler contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteCount {
    #[serde(rename = "Concurrency")]
    pub concurrency: i64,
    #[serde(rename = "RPS")]
    pub rps: f64,
}

#[derive(Debug)]
struct RouteEntry {
    key: String,
    concurrency: AtomicI64,
    /// `None` until the route declares a rate metric.
    buckets: Mutex<Option<RpsBuckets>>,
}

impl RouteEntry {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            concurrency: AtomicI64::new(0),
            buckets: Mutex::new(None),
        }
    }

    fn buckets(&self) -> MutexGuard<'_, Option<RpsBuckets>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn increment(&self, now: Instant) {
        let current = self.concurrency.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(buckets) = self.buckets().as_mut() {
            buckets.record(now, 1.0);
        }
        metrics::record_pending(&self.key, current);
    }

    /// Decrement, clamped at zero so an unmatched release cannot drive the
    /// count negative.
    fn decrement(&self) {
        let mut prev = self.concurrency.load(Ordering::Relaxed);
        loop {
            if prev <= 0 {
                return;
            }
            match self.concurrency.compare_exchange_weak(
                prev,
                prev - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => prev = x,
            }
        }
        metrics::record_pending(&self.key, prev - 1);
    }
}

/// A RAII guard for one admitted request. Releases on drop.
#[derive(Debug)]
pub struct CounterGuard {
    entry: Option<Arc<RouteEntry>>,
}

impl CounterGuard {
    /// Decrement the route's concurrency. Only the first call has an effect.
    pub fn release(&mut self) {
        if let Some(entry) = self.entry.take() {
            entry.decrement();
        }
    }
}

impl Drop for CounterGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Concurrency/RPS counters keyed by route key (`namespace/name`).
#[derive(Debug, Default)]
pub struct RouteCounter {
    entries: DashMap<String, Arc<RouteEntry>>,
    /// Keys dropped by the latest `retain`.
    retired: Mutex<HashSet<String>>,
}

impl RouteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<RouteEntry> {
        let existing = self.entries.get(key).map(|e| e.value().clone());
        match existing {
            Some(entry) => entry,
            None => self
                .entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(RouteEntry::new(key)))
                .value()
                .clone(),
        }
    }

    fn retired(&self) -> MutexGuard<'_, HashSet<String>> {
        self.retired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a zero-valued entry if the key is unknown.
    pub fn ensure(&self, key: &str) {
        if !self.entries.contains_key(key) {
            self.retired().remove(key);
            self.entry(key);
        }
    }

    /// Count one more in-flight request for `key` and record an RPS sample.
    ///
    /// Unknown keys are created, except keys the latest `retain` removed.
    pub fn increase(&self, key: &str) -> CounterGuard {
        let existing = self.entries.get(key).map(|e| e.value().clone());
        let entry = match existing {
            Some(entry) => entry,
            None if self.retired().contains(key) => Arc::new(RouteEntry::new(key)),
            None => self.entry(key),
        };
        entry.increment(Instant::now());
        CounterGuard { entry: Some(entry) }
    }

    /// Decrement `key` directly, clamped at zero. Prefer [`CounterGuard`].
    pub fn decrease(&self, key: &str) {
        let existing = self.entries.get(key).map(|e| e.value().clone());
        if let Some(entry) = existing {
            entry.decrement();
        }
    }

    /// Install an RPS ring buffer for `key`. Buffers with unchanged settings
    /// are kept so their samples survive a routing rebuild.
    pub fn update_buckets(&self, key: &str, window: Duration, granularity: Duration) {
        self.retired().remove(key);
        let entry = self.entry(key);
        let mut buckets = entry.buckets();
        if buckets.as_ref().is_some_and(|b| b.same_shape(window, granularity)) {
            return;
        }
        *buckets = Some(RpsBuckets::new(window, granularity, Instant::now()));
    }

    /// Drop the RPS buffer for `key`, e.g. when its rate metric is removed.
    pub fn clear_buckets(&self, key: &str) {
        let existing = self.entries.get(key).map(|e| e.value().clone());
        if let Some(entry) = existing {
            *entry.buckets() = None;
        }
    }

    /// Delete every entry whose key is not in `active`.
    pub fn retain(&self, active: &HashSet<String>) {
        let mut removed = HashSet::new();
        self.entries.retain(|key, _| {
            let keep = active.contains(key);
            if !keep {
                removed.insert(key.clone());
            }
            keep
        });
        *self.retired() = removed;
    }

    /// Current concurrency for `key`, if tracked.
    pub fn concurrency(&self, key: &str) -> Option<i64> {
        self.entries
            .get(key)
            .map(|e| e.value().concurrency.load(Ordering::Relaxed))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time read of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, RouteCount> {
        let now = Instant::now();
        self.entries
            .iter()
            .map(|e| {
                let entry = e.value();
                let rps = entry
                    .buckets()
                    .as_ref()
                    .map(|b| b.window_average(now))
                    .unwrap_or(0.0);
                let count = RouteCount {
                    concurrency: entry.concurrency.load(Ordering::Relaxed),
                    rps,
                };
                (e.key().clone(), count)
            })
            .collect()
    }

    /// The snapshot serialized for the `/queue` endpoint.
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }
}
