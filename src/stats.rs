//! Inference latency statistics.

use std::fmt;
use std::time::Duration;

/// Running list of per-cycle latencies, in milliseconds.
#[derive(Clone, Debug, Default)]
pub struct LatencyStats {
    samples_ms: Vec<f64>,
}

/// Aggregate over every recorded latency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// `1000 / mean_ms`; zero when the mean is zero.
    pub fps: f64,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.record_ms(elapsed.as_nanos() as f64 / 1_000_000.0);
    }

    pub fn record_ms(&mut self, ms: f64) {
        self.samples_ms.push(ms);
    }

    pub fn len(&self) -> usize {
        self.samples_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_ms.is_empty()
    }

    pub fn samples_ms(&self) -> &[f64] {
        &self.samples_ms
    }

    /// None when nothing was recorded.
    pub fn summary(&self) -> Option<LatencySummary> {
        if self.samples_ms.is_empty() {
            return None;
        }
        let count = self.samples_ms.len();
        let total: f64 = self.samples_ms.iter().sum();
        let min_ms = self.samples_ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = self
            .samples_ms
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let mean_ms = total / count as f64;
        let fps = if mean_ms > 0.0 { 1000.0 / mean_ms } else { 0.0 };
        Some(LatencySummary {
            count,
            mean_ms,
            min_ms,
            max_ms,
            fps,
        })
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "inference cycles: {}", self.count)?;
        writeln!(f, "average latency:  {:.3} ms", self.mean_ms)?;
        writeln!(f, "min latency:      {:.3} ms", self.min_ms)?;
        writeln!(f, "max latency:      {:.3} ms", self.max_ms)?;
        write!(f, "throughput:       {:.2} fps", self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_summary() {
        assert!(LatencyStats::new().summary().is_none());
    }

    #[test]
    fn summary_matches_injected_sequence() {
        let mut stats = LatencyStats::new();
        let samples = [12.0, 8.0, 10.0, 14.0, 6.0, 9.0, 11.0, 13.0, 7.0, 10.0];
        for ms in samples {
            stats.record_ms(ms);
        }
        let summary = stats.summary().unwrap();
        assert_eq!(summary.count, 10);
        assert_eq!(summary.mean_ms, 10.0);
        assert_eq!(summary.min_ms, 6.0);
        assert_eq!(summary.max_ms, 14.0);
        assert_eq!(summary.fps, 100.0);
    }

    #[test]
    fn durations_are_recorded_in_milliseconds() {
        let mut stats = LatencyStats::new();
        stats.record(Duration::from_millis(25));
        stats.record(Duration::from_micros(500));
        assert_eq!(stats.samples_ms(), &[25.0, 0.5]);
    }

    #[test]
    fn zero_mean_reports_zero_fps() {
        let mut stats = LatencyStats::new();
        stats.record_ms(0.0);
        assert_eq!(stats.summary().unwrap().fps, 0.0);
    }

    #[test]
    fn display_lists_every_figure() {
        let mut stats = LatencyStats::new();
        stats.record_ms(20.0);
        let text = stats.summary().unwrap().to_string();
        assert!(text.contains("average latency:  20.000 ms"));
        assert!(text.contains("throughput:       50.00 fps"));
    }
}
