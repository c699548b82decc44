//! Requests-per-second ring buffer.
//!
//! Fixed array of per-bucket counts covering `window`, one bucket per
//! `granularity`. Stale buckets are cleared lazily on the next write rather
//! than by a timer, so both `record` and `window_average` are O(buckets) in
//! the worst case and O(1) in the common case.

use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_GRANULARITY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RpsBuckets {
    data: Vec<f64>,
    window: Duration,
    granularity: Duration,
    last_write: Instant,
    last_index: usize,
}

impl RpsBuckets {
    /// Zero durations fall back to a one-minute window and one-second
    /// granularity. There is always at least one bucket.
    pub fn new(window: Duration, granularity: Duration, now: Instant) -> Self {
        let (window, granularity) = normalize(window, granularity);
        let len = (window.as_nanos() / granularity.as_nanos()).max(1) as usize;
        Self {
            data: vec![0.0; len],
            window,
            granularity,
            last_write: now,
            last_index: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when these buckets were built from the same settings.
    pub fn same_shape(&self, window: Duration, granularity: Duration) -> bool {
        normalize(window, granularity) == (self.window, self.granularity)
    }

    /// Add `delta` to the bucket `now` falls in, clearing every bucket
    /// stepped over since the last write.
    pub fn record(&mut self, now: Instant, delta: f64) {
        let elapsed = now.saturating_duration_since(self.last_write);
        let steps = self.steps(elapsed);
        let len = self.data.len();
        // Stepping past the whole ring means everything is stale.
        for i in 1..=steps.min(len) {
            self.data[(self.last_index + i) % len] = 0.0;
        }
        let index = (self.last_index + steps % len) % len;
        self.data[index] += delta;
        // Stay on the granularity grid: `last_write` is the start of the
        // current bucket, not the time of the last sample.
        let into_bucket = (elapsed.as_nanos() % self.granularity.as_nanos()) as u64;
        self.last_write += elapsed - Duration::from_nanos(into_bucket);
        self.last_index = index;
    }

    /// Average rate over the window, in events per second. Buckets stepped
    /// over since the last write are not counted, so the average is zero
    /// once the last write is older than the window.
    pub fn window_average(&self, now: Instant) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        let len = self.data.len();
        let stale = self.steps(now.saturating_duration_since(self.last_write));
        if stale >= len {
            return 0.0;
        }
        let live: f64 = (0..len - stale)
            .map(|back| self.data[(self.last_index + len - back) % len])
            .sum();
        live / secs
    }

    fn steps(&self, elapsed: Duration) -> usize {
        (elapsed.as_nanos() / self.granularity.as_nanos()) as usize
    }
}

fn normalize(window: Duration, granularity: Duration) -> (Duration, Duration) {
    let granularity = if granularity.is_zero() { DEFAULT_GRANULARITY } else { granularity };
    let window = if window.is_zero() { DEFAULT_WINDOW } else { window };
    (window, granularity)
}
