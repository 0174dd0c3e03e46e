use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::capture_device::CaptureDevice;
use crate::detection::infrastructure::box_overlay::{draw_boxes, draw_labels};
use crate::detection::infrastructure::color_blob_detector::{apply_mask, ColorBlobDetector};

use super::frame_outputs::{FrameOutputs, SinkTarget};
use super::pipeline_logger::PipelineLogger;

/// What the blob pipeline emits for each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlobView {
    /// The camera frame with a box around every blob.
    #[default]
    Annotated,
    /// Only the pixels inside the cleaned color mask.
    Masked,
}

impl fmt::Display for BlobView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobView::Annotated => write!(f, "annotated"),
            BlobView::Masked => write!(f, "masked"),
        }
    }
}

impl FromStr for BlobView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "annotated" => Ok(BlobView::Annotated),
            "masked" => Ok(BlobView::Masked),
            _ => Err(format!("unknown view '{s}' (expected annotated or masked)")),
        }
    }
}

/// Color-blob tracker reading the camera on the calling thread.
///
/// Every grabbed frame is thresholded, cleaned up and searched for blobs;
/// the annotated (or masked) frame goes to every output. The loop ends
/// on the first failed grab, on cancel, or after `max_frames` frames.
pub struct ColorBlobUseCase {
    device: Option<Box<dyn CaptureDevice>>,
    detector: ColorBlobDetector,
    outputs: FrameOutputs,
    view: BlobView,
    max_frames: Option<usize>,
    cancelled: Arc<AtomicBool>,
}

impl ColorBlobUseCase {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        detector: ColorBlobDetector,
        targets: Vec<SinkTarget>,
        view: BlobView,
        fps: f64,
        max_frames: Option<usize>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            device: Some(device),
            detector,
            outputs: FrameOutputs::new(targets, fps),
            view,
            max_frames,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    /// Runs until the stream ends and returns how many frames were processed.
    pub fn execute(
        &mut self,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut device = self.device.take().ok_or("Pipeline already executed")?;

        logger.info(&format!(
            "Tracking {} blobs ({} view)",
            self.detector.color(),
            self.view
        ));

        let result = self.run_loop(&mut *device, logger);

        device.release();
        let closed = self.outputs.close();
        logger.summary();

        let processed = result?;
        closed?;
        Ok(processed)
    }

    fn run_loop(
        &mut self,
        device: &mut dyn CaptureDevice,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut processed = 0usize;
        let box_color = self.detector.color().overlay_rgb();
        let label = self.detector.color().label();

        while !self.cancelled.load(Ordering::Relaxed) {
            if self.max_frames.is_some_and(|max| processed >= max) {
                break;
            }

            let t0 = Instant::now();
            let mut frame = match device.read() {
                Ok(f) => f,
                Err(e) => {
                    log::warn!("Failed to grab frame: {e}");
                    break;
                }
            };
            logger.timing("capture", t0.elapsed().as_secs_f64() * 1000.0);

            let t0 = Instant::now();
            let mask = self.detector.mask(&frame);
            let blobs = self.detector.blobs_in_mask(&mask);
            logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
            logger.metric("blobs", blobs.len() as f64);

            match self.view {
                BlobView::Annotated => {
                    draw_boxes(&mut frame, &blobs, box_color)?;
                    draw_labels(&mut frame, &blobs, label, box_color)?;
                }
                BlobView::Masked => apply_mask(&mut frame, &mask),
            }

            if !self.outputs.is_empty() {
                let t0 = Instant::now();
                self.outputs.write(&frame)?;
                logger.timing("write", t0.elapsed().as_secs_f64() * 1000.0);
            }

            processed += 1;
            logger.progress(processed, self.max_frames.unwrap_or(0));
        }

        Ok(processed)
    }
}
