use std::collections::BTreeMap;
use std::time::Instant;

use crate::attention::domain::attention_status::AttentionStatus;

/// Observer for producer-loop events.
///
/// The loop runs for as long as the service is up, so implementations keep
/// running aggregates rather than per-tick history.
pub trait PipelineLogger: Send {
    /// Called once per completed tick with the running tick count.
    fn progress(&mut self, ticks: usize);

    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Called whenever the published status changes.
    fn status_changed(&mut self, from: AttentionStatus, to: AttentionStatus);

    fn info(&mut self, message: &str);

    /// Emit a shutdown summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _ticks: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn status_changed(&mut self, _from: AttentionStatus, _to: AttentionStatus) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Aggregate {
    count: usize,
    sum: f64,
    max: f64,
}

impl Aggregate {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        if self.count == 1 || value > self.max {
            self.max = value;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Server-oriented logger backed by the `log` crate.
///
/// Emits a heartbeat line every `throttle_ticks` ticks and logs each status
/// transition at info level. Stage timings and metrics are folded into
/// running mean/max aggregates for the shutdown summary.
pub struct StdoutPipelineLogger {
    throttle_ticks: usize,
    timings: BTreeMap<String, Aggregate>,
    metrics: BTreeMap<String, Aggregate>,
    transitions: BTreeMap<AttentionStatus, usize>,
    start_time: Instant,
    ticks: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_ticks: usize) -> Self {
        Self {
            throttle_ticks: throttle_ticks.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            transitions: BTreeMap::new(),
            start_time: Instant::now(),
            ticks: 0,
        }
    }

    /// Returns the formatted summary, or `None` before the first tick.
    pub fn summary_string(&self) -> Option<String> {
        if self.ticks == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Attention summary ({} ticks, {elapsed_s:.1}s uptime):",
            self.ticks
        )];

        for (stage, agg) in &self.timings {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms",
                agg.mean(),
                agg.max
            ));
        }
        for (name, agg) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}", agg.mean()));
        }
        for (status, count) in &self.transitions {
            lines.push(format!("  became {status}: {count} time(s)"));
        }
        if elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.ticks as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Mean duration recorded for `stage`, if any.
    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Aggregate::mean)
    }

    pub fn mean_metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(Aggregate::mean)
    }

    pub fn transitions_to(&self, status: AttentionStatus) -> usize {
        self.transitions.get(&status).copied().unwrap_or(0)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(300)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, ticks: usize) {
        self.ticks = ticks;
        if ticks % self.throttle_ticks == 0 {
            log::debug!("Processed {ticks} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn status_changed(&mut self, from: AttentionStatus, to: AttentionStatus) {
        *self.transitions.entry(to).or_default() += 1;
        log::info!("Status changed: {from} -> {to}");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ── NullPipelineLogger ──

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1);
        logger.timing("detect", 5.0);
        logger.metric("faces", 1.0);
        logger.status_changed(AttentionStatus::Focused, AttentionStatus::Distracted);
        logger.info("hello");
        logger.summary();
    }

    // ── StdoutPipelineLogger ──

    #[test]
    fn test_timing_keeps_mean_and_max() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 40.0);
        logger.timing("encode", 5.0);

        assert_relative_eq!(logger.mean_timing("detect").unwrap(), 30.0);
        assert_relative_eq!(logger.timings["detect"].max, 40.0);
        assert_relative_eq!(logger.mean_timing("encode").unwrap(), 5.0);
        assert!(logger.mean_timing("annotate").is_none());
    }

    #[test]
    fn test_metric_mean() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("faces", 1.0);
        logger.metric("faces", 0.0);
        assert_relative_eq!(logger.mean_metric("faces").unwrap(), 0.5);
    }

    #[test]
    fn test_transitions_are_counted_per_target() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.status_changed(AttentionStatus::Focused, AttentionStatus::Distracted);
        logger.status_changed(AttentionStatus::Distracted, AttentionStatus::Focused);
        logger.status_changed(AttentionStatus::Focused, AttentionStatus::Distracted);

        assert_eq!(logger.transitions_to(AttentionStatus::Distracted), 2);
        assert_eq!(logger.transitions_to(AttentionStatus::Focused), 1);
    }

    #[test]
    fn test_summary_empty_before_first_tick() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 1.0);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_summary_lists_stages_metrics_and_transitions() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(12);
        logger.timing("detect", 10.0);
        logger.metric("faces", 1.0);
        logger.status_changed(AttentionStatus::Focused, AttentionStatus::Distracted);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("12 ticks"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("faces: avg 1.0"));
        assert!(summary.contains("became DISTRACTED: 1"));
    }

    #[test]
    fn test_progress_tracks_latest_tick() {
        let mut logger = StdoutPipelineLogger::new(10);
        for tick in 1..=25 {
            logger.progress(tick);
        }
        assert_eq!(logger.ticks(), 25);
    }

    #[test]
    fn test_throttle_is_at_least_one() {
        assert_eq!(StdoutPipelineLogger::new(0).throttle_ticks, 1);
    }
}
