//! Pipeline-wide statistics helpers.
//!
//! `PipelineStats` is a snapshot of what a [`crate::pipeline::TriagePipeline`]
//! has seen since creation or the last reset; `StatsManager` owns the live
//! counters behind a mutex.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Statistics for the triage pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Requests handed to `analyze`.
    pub total_processed: usize,
    /// Requests that produced a record.
    pub successful: usize,
    /// Requests rejected during preprocessing.
    pub failed: usize,
    /// Model calls that ended as error sentinels.
    pub model_errors: usize,
    /// Reports built from the template instead of generated text.
    pub fallback_reports: usize,
    /// Records the sink refused.
    pub sink_failures: usize,
    /// Mean end-to-end latency over all requests, in milliseconds.
    pub average_latency_ms: f64,
}

impl PipelineStats {
    /// Creates a zeroed snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            (self.successful as f64 / self.total_processed as f64) * 100.0
        }
    }

    /// Share of successful requests whose report used the template, as a percentage.
    pub fn fallback_rate(&self) -> f64 {
        if self.successful == 0 {
            0.0
        } else {
            (self.fallback_reports as f64 / self.successful as f64) * 100.0
        }
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Triage Statistics:")?;
        writeln!(f, "  Total processed: {}", self.total_processed)?;
        writeln!(
            f,
            "  Successful: {} ({:.1}%)",
            self.successful,
            self.success_rate()
        )?;
        writeln!(f, "  Rejected: {}", self.failed)?;
        writeln!(f, "  Model errors: {}", self.model_errors)?;
        writeln!(
            f,
            "  Template reports: {} ({:.1}%)",
            self.fallback_reports,
            self.fallback_rate()
        )?;
        writeln!(f, "  Sink failures: {}", self.sink_failures)?;
        writeln!(f, "  Average latency: {:.2} ms", self.average_latency_ms)?;
        Ok(())
    }
}

/// Thread-safe owner of the live counters.
#[derive(Debug, Default)]
pub struct StatsManager {
    stats: Mutex<PipelineStats>,
}

impl StatsManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PipelineStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a copy of the current statistics snapshot.
    pub fn get_stats(&self) -> PipelineStats {
        self.lock().clone()
    }

    fn add_latency(stats: &mut PipelineStats, latency_ms: f64) {
        let previous_total = stats.total_processed;
        stats.total_processed += 1;
        let accumulated = stats.average_latency_ms * previous_total as f64;
        stats.average_latency_ms = (accumulated + latency_ms) / stats.total_processed as f64;
    }

    /// Records a request that produced a record.
    pub fn record_success(&self, latency_ms: f64, model_errors: usize, used_fallback: bool) {
        let mut stats = self.lock();
        Self::add_latency(&mut stats, latency_ms);
        stats.successful += 1;
        stats.model_errors += model_errors;
        if used_fallback {
            stats.fallback_reports += 1;
        }
    }

    /// Records a request rejected during preprocessing.
    pub fn record_failure(&self, latency_ms: f64) {
        let mut stats = self.lock();
        Self::add_latency(&mut stats, latency_ms);
        stats.failed += 1;
    }

    /// Records a record the sink refused.
    pub fn record_sink_failure(&self) {
        self.lock().sink_failures += 1;
    }

    /// Resets the tracked statistics to their default state.
    pub fn reset_stats(&self) {
        *self.lock() = PipelineStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineStats, StatsManager};

    #[test]
    fn test_rates_handle_zero_counts() {
        let stats = PipelineStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.fallback_rate(), 0.0);
    }

    #[test]
    fn test_manager_tracks_outcomes_and_average_latency() {
        let manager = StatsManager::new();
        manager.record_success(100.0, 1, true);
        manager.record_success(200.0, 0, false);
        manager.record_failure(30.0);
        manager.record_sink_failure();

        let stats = manager.get_stats();
        assert_eq!(stats.total_processed, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.model_errors, 1);
        assert_eq!(stats.fallback_reports, 1);
        assert_eq!(stats.sink_failures, 1);
        assert!((stats.average_latency_ms - 110.0).abs() < 1e-9);
        assert!((stats.fallback_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_formats_metrics() {
        let stats = PipelineStats {
            total_processed: 10,
            successful: 8,
            failed: 2,
            model_errors: 3,
            fallback_reports: 2,
            sink_failures: 0,
            average_latency_ms: 125.0,
        };
        let display = stats.to_string();
        assert!(display.contains("Successful: 8 (80.0%)"));
        assert!(display.contains("Template reports: 2 (25.0%)"));
        assert!(display.contains("Average latency: 125.00 ms"));
    }

    #[test]
    fn test_reset_clears_counters() {
        let manager = StatsManager::new();
        manager.record_success(50.0, 2, true);
        manager.reset_stats();
        assert_eq!(manager.get_stats(), PipelineStats::default());
    }
}
