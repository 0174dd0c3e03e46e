use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::infrastructure::threaded_frame_source::ThreadedFrameSource;

use super::frame_outputs::{FrameOutputs, SinkTarget};
use super::frame_processor::FrameProcessor;
use super::pipeline_logger::PipelineLogger;
use super::stream_controls::StreamControls;

/// Sleep between polls while no new frame is available.
const IDLE_POLL: Duration = Duration::from_millis(2);

/// Headless person anonymizer over a live frame source.
///
/// Polls the source for the newest frame, runs it through a
/// [`FrameProcessor`] and hands the result to every output (live view,
/// recording, snapshot). Runs until the cancel flag is raised or
/// `max_frames` frames were processed. The source is always released and
/// the outputs closed, even on error.
///
/// Single-use: `execute` consumes the owned components.
pub struct AnonymizeStreamUseCase {
    source: Option<ThreadedFrameSource>,
    processor: FrameProcessor,
    outputs: FrameOutputs,
    controls: StreamControls,
    max_frames: Option<usize>,
    cancelled: Arc<AtomicBool>,
}

impl AnonymizeStreamUseCase {
    pub fn new(
        source: ThreadedFrameSource,
        processor: FrameProcessor,
        targets: Vec<SinkTarget>,
        controls: StreamControls,
        fps: f64,
        max_frames: Option<usize>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            source: Some(source),
            processor,
            outputs: FrameOutputs::new(targets, fps),
            controls,
            max_frames,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    /// Runs the loop and returns how many frames were processed.
    pub fn execute(
        &mut self,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut source = self.source.take().ok_or("Pipeline already executed")?;

        logger.info(&format!(
            "Anonymizing persons ({}, intensity {}, detecting every {} frames)",
            self.controls.settings.mode,
            self.controls.settings.intensity(),
            self.processor.interval()
        ));

        let result = self.run_loop(&source, logger);

        source.release();
        let closed = self.outputs.close();
        logger.summary();

        let processed = result?;
        closed?;
        Ok(processed)
    }

    fn run_loop(
        &mut self,
        source: &ThreadedFrameSource,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut processed = 0usize;
        let mut last_index: Option<usize> = None;

        while self.controls.running && !self.cancelled.load(Ordering::Relaxed) {
            if self.max_frames.is_some_and(|max| processed >= max) {
                break;
            }

            let t0 = Instant::now();
            let frame = match source.read() {
                Some(f) if last_index != Some(f.index()) => f,
                _ => {
                    thread::sleep(IDLE_POLL);
                    continue;
                }
            };
            last_index = Some(frame.index());
            logger.timing("capture", t0.elapsed().as_secs_f64() * 1000.0);

            let out = self.processor.process(frame, &self.controls, logger)?;

            if !self.outputs.is_empty() {
                let t0 = Instant::now();
                self.outputs.write(&out.frame)?;
                logger.timing("write", t0.elapsed().as_secs_f64() * 1000.0);
            }

            processed += 1;
            logger.progress(processed, self.max_frames.unwrap_or(0));
        }

        Ok(processed)
    }
}
