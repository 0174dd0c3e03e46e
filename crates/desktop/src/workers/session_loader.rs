use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use camguard_core::anonymizing::infrastructure::cpu_region_anonymizer::CpuRegionAnonymizer;
use camguard_core::capture::domain::capture_device::CameraConfig;
use camguard_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use camguard_core::capture::infrastructure::threaded_frame_source::ThreadedFrameSource;
use camguard_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use camguard_core::pipeline::frame_processor::FrameProcessor;
use camguard_core::shared::constants::PERSON_MODEL_NAME;
use camguard_core::shared::model_resolver;
use camguard_core::shared::stream_metadata::StreamMetadata;

pub enum LoaderMessage {
    DownloadProgress(u64, u64),
    Ready(StreamSession),
    Error(String),
    Cancelled,
}

/// A running camera plus the processor that anonymizes its frames.
pub struct StreamSession {
    pub source: ThreadedFrameSource,
    pub processor: FrameProcessor,
    pub metadata: StreamMetadata,
}

pub struct LoaderParams {
    pub camera: CameraConfig,
    pub model_path: Option<PathBuf>,
    pub model_url: Option<String>,
    pub confidence: f32,
    pub interval: usize,
}

/// Resolves the model, builds the detector and opens the camera off the UI
/// thread. Model download and session creation can take seconds.
pub fn spawn(params: LoaderParams) -> (Receiver<LoaderMessage>, Arc<AtomicBool>) {
    let (tx, rx) = crossbeam_channel::unbounded::<LoaderMessage>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    thread::spawn(move || match load_session(&tx, &params) {
        Ok(mut session) => {
            if cancelled_clone.load(Ordering::Relaxed) {
                session.source.release();
                let _ = tx.send(LoaderMessage::Cancelled);
            } else {
                let _ = tx.send(LoaderMessage::Ready(session));
            }
        }
        Err(e) => {
            if cancelled_clone.load(Ordering::Relaxed) {
                let _ = tx.send(LoaderMessage::Cancelled);
            } else {
                let _ = tx.send(LoaderMessage::Error(e.to_string()));
            }
        }
    });

    (rx, cancelled)
}

fn load_session(
    tx: &Sender<LoaderMessage>,
    params: &LoaderParams,
) -> Result<StreamSession, Box<dyn std::error::Error>> {
    let progress_tx = tx.clone();
    let model_path = model_resolver::resolve(
        PERSON_MODEL_NAME,
        params.model_path.as_deref(),
        params.model_url.as_deref(),
        Some(Box::new(move |done, total| {
            let _ = progress_tx.send(LoaderMessage::DownloadProgress(done, total));
        })),
    )?;

    let detector = OnnxYoloDetector::new(&model_path, params.confidence)?;
    let processor = FrameProcessor::new(
        Box::new(detector),
        Box::new(CpuRegionAnonymizer::new()),
        params.interval,
    )?;

    let camera = FfmpegCamera::open(&params.camera)?;
    let metadata = camera.metadata();
    log::info!(
        "Camera open at {}x{} ({:.1} fps)",
        metadata.width,
        metadata.height,
        metadata.fps
    );

    Ok(StreamSession {
        source: ThreadedFrameSource::start(Box::new(camera)),
        processor,
        metadata,
    })
}
