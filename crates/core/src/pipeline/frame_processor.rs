use std::time::Instant;

use crate::anonymizing::domain::frame_anonymizer::FrameAnonymizer;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::infrastructure::periodic_detector::PeriodicDetector;
use crate::shared::detection::{persons, Detection};
use crate::shared::frame::Frame;

use super::pipeline_logger::PipelineLogger;
use super::stream_controls::StreamControls;

/// Result of one processing iteration.
pub struct ProcessedFrame {
    pub frame: Frame,
    /// Person boxes that were anonymized (possibly from an earlier frame).
    pub persons: Vec<Detection>,
    /// Whether the detector actually ran on this frame.
    pub inferred: bool,
}

/// One step of the anonymizer pipelines: periodic person detection followed
/// by in-place anonymization of every person box.
///
/// Shared by the headless loop and the desktop tick so both behave alike.
pub struct FrameProcessor {
    detector: PeriodicDetector,
    anonymizer: Box<dyn FrameAnonymizer>,
}

impl FrameProcessor {
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        anonymizer: Box<dyn FrameAnonymizer>,
        interval: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            detector: PeriodicDetector::new(detector, interval)?,
            anonymizer,
        })
    }

    pub fn interval(&self) -> usize {
        self.detector.interval()
    }

    /// Detects (every Nth call) and anonymizes persons in `frame`.
    ///
    /// With anonymization switched off the frame passes through untouched
    /// and the detector is not consulted. A failed inference is logged and
    /// the previous detections are reused.
    pub fn process(
        &mut self,
        mut frame: Frame,
        controls: &StreamControls,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ProcessedFrame, Box<dyn std::error::Error>> {
        if !controls.anonymize {
            return Ok(ProcessedFrame {
                frame,
                persons: Vec::new(),
                inferred: false,
            });
        }

        let inferred = self.detector.is_due();
        let t0 = Instant::now();
        let detections = match self.detector.detect(&frame) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {e}", frame.index());
                self.detector.cached().to_vec()
            }
        };
        if inferred {
            logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
        }

        let persons = persons(&detections);
        logger.metric("detections", persons.len() as f64);

        let t0 = Instant::now();
        self.anonymizer
            .anonymize(&mut frame, &persons, &controls.settings)?;
        logger.timing("anonymize", t0.elapsed().as_secs_f64() * 1000.0);

        Ok(ProcessedFrame {
            frame,
            persons,
            inferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymizing::domain::anonymize_settings::AnonymizeMode;
    use crate::anonymizing::infrastructure::cpu_region_anonymizer::CpuRegionAnonymizer;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::shared::region::Region;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Reports one person and one car on every run; optionally fails once.
    struct FakeDetector {
        calls: Arc<AtomicUsize>,
        fail_on_call: Option<usize>,
    }

    impl ObjectDetector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                return Err("session crashed".into());
            }
            Ok(vec![
                Detection::new(Region::new(0, 0, 10, 10), 0, 0.9),
                Detection::new(Region::new(20, 20, 30, 30), 2, 0.8),
            ])
        }
    }

    fn processor(interval: usize, fail_on_call: Option<usize>) -> (FrameProcessor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = FakeDetector {
            calls: calls.clone(),
            fail_on_call,
        };
        let processor =
            FrameProcessor::new(Box::new(detector), Box::new(CpuRegionAnonymizer::new()), interval)
                .unwrap();
        (processor, calls)
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![200u8; 40 * 40 * 3], 40, 40, 3, index)
    }

    fn blackbox() -> StreamControls {
        StreamControls::new(AnonymizeMode::Blackbox, 15)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> u8 {
        frame.data()[(y * 40 + x) * 3]
    }

    #[test]
    fn test_anonymizes_persons_only() {
        let (mut processor, _) = processor(1, None);

        let out = processor
            .process(frame(0), &blackbox(), &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(out.persons.len(), 1);
        assert!(out.inferred);
        assert_eq!(pixel(&out.frame, 5, 5), 0);
        assert_eq!(pixel(&out.frame, 25, 25), 200);
    }

    #[test]
    fn test_reuses_detections_between_runs() {
        let (mut processor, calls) = processor(3, None);
        let mut logger = NullPipelineLogger;

        let inferred: Vec<bool> = (0..7)
            .map(|i| {
                let out = processor.process(frame(i), &blackbox(), &mut logger).unwrap();
                assert_eq!(pixel(&out.frame, 5, 5), 0);
                out.inferred
            })
            .collect();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(inferred, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn test_disabled_passes_frame_through() {
        let (mut processor, calls) = processor(1, None);
        let mut controls = blackbox();
        controls.anonymize = false;

        let out = processor
            .process(frame(0), &controls, &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(out.frame.data(), frame(0).data());
        assert!(out.persons.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_detection_failure_falls_back_to_cache() {
        let (mut processor, _) = processor(1, Some(1));
        let mut logger = NullPipelineLogger;

        processor.process(frame(0), &blackbox(), &mut logger).unwrap();
        let out = processor.process(frame(1), &blackbox(), &mut logger).unwrap();

        assert_eq!(out.persons.len(), 1);
        assert_eq!(pixel(&out.frame, 5, 5), 0);
    }

    #[test]
    fn test_failure_before_first_run_yields_no_persons() {
        let (mut processor, _) = processor(1, Some(0));

        let out = processor
            .process(frame(0), &blackbox(), &mut NullPipelineLogger)
            .unwrap();

        assert!(out.persons.is_empty());
        assert_eq!(out.frame.data(), frame(0).data());
    }

    #[test]
    fn test_records_stage_timings() {
        let (mut processor, _) = processor(2, None);
        let mut logger = StdoutPipelineLogger::new(10);

        for i in 0..4 {
            processor.process(frame(i), &blackbox(), &mut logger).unwrap();
        }

        assert_eq!(logger.stage("detect").unwrap().count, 2);
        assert_eq!(logger.stage("anonymize").unwrap().count, 4);
        let detections = logger.gauge("detections").unwrap();
        assert_eq!((detections.count, detections.sum), (4, 4.0));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let detector = FakeDetector {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_on_call: None,
        };
        assert!(
            FrameProcessor::new(Box::new(detector), Box::new(CpuRegionAnonymizer::new()), 0)
                .is_err()
        );
    }
}
