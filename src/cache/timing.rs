//! Operation Timing Module
//!
//! Optional instrumentation context a caller attaches to a store to record
//! how long each operation takes.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

// == Timing Stats ==
/// Aggregated durations for one operation label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingStats {
    /// Number of recorded runs
    pub count: u64,
    /// Sum of all run durations in milliseconds
    pub total_ms: f64,
    /// Longest single run in milliseconds
    pub max_ms: f64,
}

impl TimingStats {
    /// Mean duration, or 0.0 if nothing was recorded.
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }

    fn record(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.count += 1;
        self.total_ms += ms;
        if ms > self.max_ms {
            self.max_ms = ms;
        }
    }
}

// == Op Timings ==
/// Per-label timing registry, scoped to whoever owns it.
#[derive(Debug, Default)]
pub struct OpTimings {
    labels: Mutex<BTreeMap<&'static str, TimingStats>>,
}

impl OpTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts timing a run of `label`; the run is recorded when the guard
    /// drops.
    pub fn start(&self, label: &'static str) -> TimingGuard<'_> {
        TimingGuard {
            timings: self,
            label,
            started: Instant::now(),
        }
    }

    pub fn record(&self, label: &'static str, elapsed: Duration) {
        if let Ok(mut labels) = self.labels.lock() {
            labels.entry(label).or_default().record(elapsed);
        }
    }

    /// Copy of the current per-label stats.
    pub fn snapshot(&self) -> BTreeMap<&'static str, TimingStats> {
        self.labels
            .lock()
            .map(|labels| labels.clone())
            .unwrap_or_default()
    }
}

/// Records the elapsed time of one run on drop.
pub struct TimingGuard<'a> {
    timings: &'a OpTimings,
    label: &'static str,
    started: Instant,
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        self.timings.record(self.label, self.started.elapsed());
    }
}
