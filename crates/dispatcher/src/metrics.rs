//! Pool metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single dispatch pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Total submissions (accepted or not)
    submitted: AtomicU64,
    /// Tasks placed in the backlog queue
    enqueued: AtomicU64,
    /// Submissions rejected
    dropped: AtomicU64,
    /// Tasks whose send succeeded
    delivered: AtomicU64,
    /// Tasks whose send failed or panicked
    failed: AtomicU64,
    /// Workers started over the pool's lifetime
    workers_started: AtomicU64,
    /// Highest concurrent worker count observed
    peak_workers: AtomicUsize,
}

impl PoolMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a worker start with the live count after the start
    pub fn record_worker_started(&self, live: usize) {
        self.workers_started.fetch_add(1, Ordering::Relaxed);
        self.peak_workers.fetch_max(live, Ordering::Relaxed);
    }

    pub fn workers_started(&self) -> u64 {
        self.workers_started.load(Ordering::Relaxed)
    }

    pub fn peak_workers(&self) -> usize {
        self.peak_workers.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    ///
    /// Backlog length and live workers are owned by the pool and passed in.
    pub fn snapshot(&self, backlog_len: usize, live_workers: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted(),
            enqueued: self.enqueued(),
            dropped: self.dropped(),
            delivered: self.delivered(),
            failed: self.failed(),
            workers_started: self.workers_started(),
            backlog_len,
            live_workers,
            peak_workers: self.peak_workers(),
        }
    }
}

/// Snapshot of pool metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
    pub workers_started: u64,
    pub backlog_len: usize,
    pub live_workers: usize,
    pub peak_workers: usize,
}

impl MetricsSnapshot {
    /// Accepted tasks that have not finished yet
    pub fn in_flight(&self) -> u64 {
        (self.submitted - self.dropped).saturating_sub(self.delivered + self.failed)
    }
}
