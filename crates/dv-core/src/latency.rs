//! Histogram-based collector for backend write latency.
//!
//! The persistence writer times every insert attempt and records the elapsed
//! microseconds here. Summaries (min, max, mean, p50/p90/p99) are logged
//! periodically and when the writer stops.
//!
//! Bins are 100µs wide and cover 0–300ms (3000 bins). Slower writes land in
//! the last bin; `max` still reports the true value.

use std::time::Duration;

/// Width of each histogram bin in microseconds.
const BIN_WIDTH_US: u64 = 100;

/// Number of histogram bins (covers 0–300ms).
const NUM_BINS: usize = 3000;

/// Computed latency statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub avg_us: f64,
    pub p50_us: u64,
    pub p90_us: u64,
    pub p99_us: u64,
}

impl std::fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "writes={} min={}µs max={}µs avg={:.1}µs p50={}µs p90={}µs p99={}µs",
            self.count, self.min_us, self.max_us, self.avg_us, self.p50_us, self.p90_us, self.p99_us,
        )
    }
}

/// A histogram of write latencies.
///
/// Not thread-safe: owned by the single writer thread.
pub struct LatencyCollector {
    bins: Vec<u64>,
    count: u64,
    sum: u64,
    min: u64,
    max: u64,
}

impl LatencyCollector {
    pub fn new() -> Self {
        Self { bins: vec![0u64; NUM_BINS], count: 0, sum: 0, min: u64::MAX, max: 0 }
    }

    /// Record one write that took `elapsed`.
    #[inline]
    pub fn record(&mut self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.count += 1;
        self.sum = self.sum.saturating_add(us);
        self.min = self.min.min(us);
        self.max = self.max.max(us);

        let bin = usize::try_from(us / BIN_WIDTH_US).unwrap_or(NUM_BINS).min(NUM_BINS - 1);
        self.bins[bin] += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Compute summary statistics. Returns `None` if nothing was recorded.
    pub fn stats(&self) -> Option<LatencyStats> {
        if self.count == 0 {
            return None;
        }

        Some(LatencyStats {
            count: self.count,
            min_us: self.min,
            max_us: self.max,
            avg_us: self.sum as f64 / self.count as f64,
            p50_us: self.percentile(50),
            p90_us: self.percentile(90),
            p99_us: self.percentile(99),
        })
    }

    /// Lower edge of the bin holding the `pct`-th percentile sample.
    fn percentile(&self, pct: u64) -> u64 {
        let target = (self.count * pct).div_ceil(100);
        let mut cumulative = 0u64;
        for (i, &count) in self.bins.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return (i as u64) * BIN_WIDTH_US;
            }
        }
        self.max
    }
}

impl Default for LatencyCollector {
    fn default() -> Self {
        Self::new()
    }
}
