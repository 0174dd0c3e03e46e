use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for what a capture loop is doing.
///
/// Pipelines report through this trait only; whether the events end up on
/// stdout, in a GUI status line or nowhere is the caller's choice.
pub trait PipelineLogger: Send {
    /// Frames handled so far. `total` is 0 for a live camera with no cap.
    fn progress(&mut self, current: usize, total: usize);

    /// Milliseconds one stage spent on one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-frame measurement such as the number of detections.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Called once after the loop exits.
    fn summary(&self) {}
}

/// Drops every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate of one named series.
///
/// Camera streams run until someone stops them, so samples are folded in
/// as they arrive instead of being kept.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 { value } else { self.max.max(value) };
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Terminal reporter for the CLI.
///
/// Logs a progress line every `report_every` frames and, when the stream
/// ends, a table of stage costs, metric averages and achieved frame rate.
pub struct StdoutPipelineLogger {
    report_every: usize,
    stages: BTreeMap<String, SeriesStats>,
    gauges: BTreeMap<String, SeriesStats>,
    started: Instant,
    frames: usize,
}

impl StdoutPipelineLogger {
    pub fn new(report_every: usize) -> Self {
        Self {
            report_every: report_every.max(1),
            stages: BTreeMap::new(),
            gauges: BTreeMap::new(),
            started: Instant::now(),
            frames: 0,
        }
    }

    pub fn stage(&self, name: &str) -> Option<SeriesStats> {
        self.stages.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<SeriesStats> {
        self.gauges.get(name).copied()
    }

    fn fps(&self) -> Option<f64> {
        let secs = self.started.elapsed().as_secs_f64();
        (self.frames > 0 && secs > 0.0).then(|| self.frames as f64 / secs)
    }

    /// End-of-stream report, `None` while nothing has been measured.
    pub fn report(&self) -> Option<String> {
        if self.stages.is_empty() && self.gauges.is_empty() {
            return None;
        }

        let secs = self.started.elapsed().as_secs_f64();
        let mut out = format!("{} frames in {secs:.1}s", self.frames);
        if let Some(fps) = self.fps() {
            out.push_str(&format!(" ({fps:.1} fps)"));
        }

        for (stage, stats) in &self.stages {
            let share = if secs > 0.0 {
                stats.sum / (secs * 1000.0) * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "\n  {stage:<10} {:7.1}ms avg {:7.1}ms max {share:5.1}% of wall time",
                stats.mean(),
                stats.max
            ));
        }
        for (name, stats) in &self.gauges {
            out.push_str(&format!(
                "\n  {name:<10} {:7.1} avg {:7.1} max",
                stats.mean(),
                stats.max
            ));
        }
        Some(out)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames = self.frames.max(current);
        let last = total > 0 && current == total;
        if !last && current % self.report_every != 0 {
            return;
        }
        if total > 0 {
            log::info!("Frame {current}/{total}");
        } else if let Some(fps) = self.fps() {
            log::info!("Frame {current} ({fps:.1} fps)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages
            .entry(stage.to_owned())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.gauges.entry(name.to_owned()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(report) = self.report() {
            log::info!("Stream finished: {report}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stage_samples_fold_into_stats() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 40.0);
        logger.timing("detect", 30.0);

        let stats = logger.stage("detect").unwrap();
        assert_eq!(stats.count, 3);
        assert_relative_eq!(stats.mean(), 30.0);
        assert_relative_eq!(stats.max, 40.0);
        assert!(logger.stage("write").is_none());
    }

    #[test]
    fn test_negative_first_sample_sets_max() {
        let mut stats = SeriesStats::default();
        stats.record(-2.0);
        assert_relative_eq!(stats.max, -2.0);
        assert_relative_eq!(SeriesStats::default().mean(), 0.0);
    }

    #[test]
    fn test_nothing_measured_means_no_report() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(3, 0);
        assert!(logger.report().is_none());
    }

    #[test]
    fn test_report_covers_live_frames_stages_and_gauges() {
        let mut logger = StdoutPipelineLogger::new(10);
        for frame in 1..=25 {
            logger.progress(frame, 0);
            logger.metric("blobs", (frame % 2) as f64);
        }
        logger.timing("write", 5.0);
        logger.timing("capture", 2.0);

        let report = logger.report().unwrap();
        assert!(report.starts_with("25 frames in"));
        let capture = report.find("capture").unwrap();
        let write = report.find("write").unwrap();
        assert!(capture < write);
        assert!(report.contains("blobs"));
        assert_relative_eq!(logger.gauge("blobs").unwrap().mean(), 13.0 / 25.0);
    }

    #[test]
    fn test_null_logger_ignores_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 1);
        logger.timing("detect", 1.0);
        logger.metric("detections", 1.0);
        logger.info("ignored");
        logger.summary();
    }
}
