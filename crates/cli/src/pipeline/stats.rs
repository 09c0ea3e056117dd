//! Publish session statistics.

use std::time::Duration;

use observability::{RunningStats, StatsSummary};

/// Statistics from a publish session
#[derive(Debug, Clone, Default)]
pub struct PublishStats {
    /// Adapter the session published through
    pub adapter: String,

    /// Messages handed to the adapter
    pub published: u64,

    /// Messages accepted by the pool
    pub enqueued: u64,

    /// Messages dropped at submission (backlog full, pool closed, ...)
    pub dropped: u64,

    /// Messages a worker delivered before the session ended
    pub delivered: u64,

    /// Messages whose send failed
    pub failed: u64,

    /// Optional property entries skipped while connecting
    pub malformed_properties: usize,

    /// Highest number of concurrent workers observed
    pub peak_workers: usize,

    /// False when the drain timeout expired with work still queued
    pub drained: bool,

    /// Total duration of the session
    pub duration: Duration,

    /// Per-message submit latency (microseconds)
    pub submit_latency_us: RunningStats,
}

impl PublishStats {
    /// Messages submitted per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Drop rate as percentage of published messages
    pub fn drop_rate(&self) -> f64 {
        if self.published > 0 {
            (self.dropped as f64 / self.published as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Queued messages that neither succeeded nor failed before exit
    pub fn undelivered(&self) -> u64 {
        self.enqueued.saturating_sub(self.delivered + self.failed)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Publish Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Adapter: {}", self.adapter);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Published: {}", self.published);
        println!("   ├─ Throughput: {:.2} msg/s", self.throughput());
        println!("   └─ Peak workers: {}", self.peak_workers);

        println!("\n📤 Outcomes");
        println!("   ├─ Enqueued: {}", self.enqueued);
        println!(
            "   ├─ Dropped: {} ({:.2}%)",
            self.dropped,
            self.drop_rate()
        );
        println!("   ├─ Delivered: {}", self.delivered);
        println!("   ├─ Failed: {}", self.failed);
        if self.drained {
            println!("   └─ Undelivered: {}", self.undelivered());
        } else {
            println!(
                "   └─ Undelivered: {} (drain timeout expired)",
                self.undelivered()
            );
        }

        if self.malformed_properties > 0 {
            println!(
                "\n⚠️  {} optional property entries were skipped",
                self.malformed_properties
            );
        }

        println!("\n⏱️  Submit latency (µs)");
        println!("   └─ {}", StatsSummary::from(&self.submit_latency_us));

        println!();
    }
}
