//! Ready-endpoint counts per service, with blocking waits for cold starts.
//!
//! # Responsibilities
//! - Answer "is this service warm?" without taking a lock
//! - Park callers until a service becomes ready, a deadline passes, or the
//!   caller is cancelled
//! - Wake every parked caller on each update
//!
//! # Design Decisions
//! - Counts live in an `ArcSwap` map of atomics; only a new key copies the map
//! - Waiters observe a generation counter in a `watch` channel. Subscribing
//!   marks the current generation as seen, so an update that lands between
//!   the fast check and the subscribe is never missed.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::watch;

use crate::readiness::slice::{count_ready, EndpointSlice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadinessError {
    #[error("timed out waiting for ready endpoints")]
    Timeout,
    #[error("wait cancelled")]
    Cancelled,
}

#[derive(Debug)]
pub struct ReadinessCache {
    counts: ArcSwap<HashMap<String, Arc<AtomicU64>>>,
    generation: watch::Sender<u64>,
}

impl Default for ReadinessCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessCache {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            counts: ArcSwap::from_pointee(HashMap::new()),
            generation,
        }
    }

    /// True iff the service has at least one ready endpoint.
    pub fn is_ready(&self, service_key: &str) -> bool {
        self.ready_count(service_key) > 0
    }

    pub fn ready_count(&self, service_key: &str) -> u64 {
        self.counts
            .load()
            .get(service_key)
            .map(|c| c.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Recompute the ready count from the service's current slices and wake
    /// all waiters.
    pub fn update(&self, service_key: &str, slices: &[EndpointSlice]) {
        let ready = count_ready(slices);
        self.slot(service_key).store(ready, Ordering::Release);
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
        tracing::debug!(service = %service_key, ready = ready, "Readiness updated");
    }

    /// Wait for `service_key` to become ready.
    ///
    /// Returns `Ok(false)` when already ready and `Ok(true)` when the caller
    /// had to wait (a cold start).
    pub async fn wait_until_ready(
        &self,
        service_key: &str,
        timeout: Duration,
    ) -> Result<bool, ReadinessError> {
        self.wait_until_ready_or(service_key, timeout, std::future::pending::<()>())
            .await
    }

    /// Like [`wait_until_ready`](Self::wait_until_ready), but gives up with
    /// [`ReadinessError::Cancelled`] as soon as `cancel` completes.
    pub async fn wait_until_ready_or<F>(
        &self,
        service_key: &str,
        timeout: Duration,
        cancel: F,
    ) -> Result<bool, ReadinessError>
    where
        F: Future,
    {
        if self.is_ready(service_key) {
            return Ok(false);
        }

        let mut generation = self.generation.subscribe();
        if self.is_ready(service_key) {
            return Ok(true);
        }

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                Ok(()) = generation.changed() => {
                    if self.is_ready(service_key) {
                        return Ok(true);
                    }
                }
                _ = &mut deadline => return Err(ReadinessError::Timeout),
                _ = &mut cancel => return Err(ReadinessError::Cancelled),
            }
        }
    }

    /// Forget every service not in `keep`. A forgotten service reads as not
    /// ready. The map is swapped once, and only when something is removed.
    pub fn retain(&self, keep: &HashSet<String>) {
        if self.counts.load().keys().all(|key| keep.contains(key)) {
            return;
        }
        self.counts.rcu(|current| {
            current
                .iter()
                .filter(|(key, _)| keep.contains(*key))
                .map(|(key, slot)| (key.clone(), slot.clone()))
                .collect::<HashMap<_, _>>()
        });
    }

    /// Number of services tracked.
    pub fn len(&self) -> usize {
        self.counts.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.load().is_empty()
    }

    fn slot(&self, service_key: &str) -> Arc<AtomicU64> {
        if let Some(slot) = self.counts.load().get(service_key) {
            return slot.clone();
        }
        let fresh = Arc::new(AtomicU64::new(0));
        self.counts.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.entry(service_key.to_string())
                .or_insert_with(|| fresh.clone());
            next
        });
        self.counts
            .load()
            .get(service_key)
            .cloned()
            .unwrap_or(fresh)
    }
}
