//! Run statistics.

use std::fmt;
use std::time::Duration;

use detection_store::StoreStatsSnapshot;
use observability::DecisionStatsAggregator;
use scheduler::DriverStats;

/// Why the run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// The driver used up its tick budget
    #[default]
    Completed,
    /// The run timeout expired
    Timeout,
    /// Ctrl+C or SIGTERM
    Signal,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => f.write_str("tick budget reached"),
            StopReason::Timeout => f.write_str("timeout"),
            StopReason::Signal => f.write_str("shutdown signal"),
        }
    }
}

/// Statistics from a controller run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Why the run ended
    pub stop_reason: StopReason,

    /// Total duration of the run
    pub duration: Duration,

    /// Detection sources registered
    pub active_sources: usize,

    /// Sinks configured
    pub active_sinks: usize,

    /// Decisions handed to the dispatcher
    pub decisions_dispatched: u64,

    /// Decisions the dispatcher channel had no room for
    pub dispatch_dropped: u64,

    /// Tick driver counters
    pub driver: DriverStats,

    /// Reports applied by the detection sources
    pub ingestion: ingestion::MetricsSnapshot,

    /// Detection store write counters
    pub store: StoreStatsSnapshot,

    /// Per-sink delivery counters
    pub sinks: Vec<(String, dispatcher::MetricsSnapshot)>,

    /// Per-lane timing and preemption totals
    pub decisions: DecisionStatsAggregator,
}

impl PipelineStats {
    /// Ticks per second actually achieved
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.driver.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Controller Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Stopped by: {}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {} ({:.1}/s)", self.driver.ticks, self.tick_rate());
        println!(
            "   ├─ Slowest tick: {:.3}ms",
            self.driver.max_tick_latency.as_secs_f64() * 1000.0
        );
        println!("   ├─ Transitions: {}", self.driver.transitions);
        println!("   ├─ Preemptions: {}", self.driver.preemptions);
        println!("   ├─ Detection sources: {}", self.active_sources);
        println!("   └─ Sinks: {}", self.active_sinks);

        println!("\n📡 Detections");
        println!("   ├─ Reports received: {}", self.ingestion.reports_received);
        println!("   ├─ Lane reports: {}", self.ingestion.lane_reports);
        println!("   ├─ Siren reports: {}", self.ingestion.siren_reports);
        println!("   ├─ Positive reports: {}", self.ingestion.positive_reports);
        println!("   └─ Rejected lane ids: {}", self.store.invalid_lanes);

        let summary = self.decisions.summary();

        println!("\n🚦 Lanes");
        for (i, lane) in summary.lanes.iter().enumerate() {
            let prefix = if i == summary.lanes.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {}: green {:.1}s, yellow {:.1}s, preemptions {}",
                prefix, lane.lane, lane.green_secs, lane.yellow_secs, lane.preemptions
            );
        }
        println!(
            "   Priority mode: {:.1}s ({:.2}% of ticks)",
            summary.priority_secs, summary.priority_rate
        );
        println!("   Tick interval (ms): {}", summary.tick_interval_ms);

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, sink)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: written {}, failed {}, displaced {}, dropped {}",
                    prefix,
                    name,
                    sink.write_count,
                    sink.failure_count,
                    sink.displaced_count,
                    sink.dropped_count
                );
            }
        }

        if self.driver.dropped > 0 {
            println!(
                "\n⚠️  {} ticks never reached the summary; lane timings above are approximate",
                self.driver.dropped
            );
        }
        if self.dispatch_dropped > 0 {
            println!(
                "\n⚠️  {} decisions not recorded: dispatcher backlog full",
                self.dispatch_dropped
            );
        }

        println!();
    }
}
