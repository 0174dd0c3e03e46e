mod live_window;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::{Args, Parser, Subcommand};

use camguard_core::anonymizing::domain::anonymize_settings::AnonymizeMode;
use camguard_core::anonymizing::infrastructure::cpu_region_anonymizer::CpuRegionAnonymizer;
use camguard_core::capture::domain::capture_device::CameraConfig;
use camguard_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use camguard_core::capture::infrastructure::threaded_frame_source::ThreadedFrameSource;
use camguard_core::detection::domain::color_range::BlobColor;
use camguard_core::detection::infrastructure::color_blob_detector::ColorBlobDetector;
use camguard_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use camguard_core::pipeline::anonymize_stream_use_case::AnonymizeStreamUseCase;
use camguard_core::pipeline::color_blob_use_case::{BlobView, ColorBlobUseCase};
use camguard_core::pipeline::frame_outputs::SinkTarget;
use camguard_core::pipeline::frame_processor::FrameProcessor;
use camguard_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use camguard_core::pipeline::stream_controls::StreamControls;
use camguard_core::shared::constants::{MAX_INTENSITY, MIN_INTENSITY, PERSON_MODEL_NAME};
use camguard_core::shared::model_resolver;
use camguard_core::video::infrastructure::live_view_sink::{LiveFeed, LiveViewSink};
use camguard_core::video::infrastructure::sink_factory::create_sink;

/// Live camera tools: color-blob tracking and person anonymization.
#[derive(Parser)]
#[command(name = "camguard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track colored blobs and draw boxes around them.
    Blobs(BlobsArgs),
    /// Detect people and pixelate, blur or black them out.
    Anonymize(AnonymizeArgs),
}

#[derive(Args)]
struct CameraArgs {
    /// Camera index.
    #[arg(long, default_value = "0")]
    camera: u32,

    /// Platform device name, overrides --camera (e.g. /dev/video2).
    #[arg(long)]
    device: Option<String>,

    /// Capture width in pixels.
    #[arg(long, default_value = "640")]
    width: u32,

    /// Capture height in pixels.
    #[arg(long, default_value = "360")]
    height: u32,

    /// Requested capture frame rate.
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Also write frames to a file: an image is kept up to date with the
    /// latest frame, anything else is recorded as video.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Run without the live window; stop with Ctrl+C or --max-frames.
    #[arg(long)]
    no_window: bool,

    /// Stop after this many processed frames.
    #[arg(long)]
    max_frames: Option<usize>,
}

#[derive(Args)]
struct BlobsArgs {
    #[command(flatten)]
    camera: CameraArgs,

    /// Blob color: green, yellow, red or white.
    #[arg(long, default_value = "green")]
    color: BlobColor,

    /// Minimum contour area in px² for a blob to count.
    #[arg(long, default_value = "500")]
    min_area: f64,

    /// Output view: annotated or masked.
    #[arg(long, default_value = "annotated")]
    view: BlobView,
}

#[derive(Args)]
struct AnonymizeArgs {
    #[command(flatten)]
    camera: CameraArgs,

    /// Anonymization mode: pixelate, blur or blackbox.
    #[arg(long, default_value = "pixelate")]
    mode: AnonymizeMode,

    /// Pixelation grid size or blur kernel size (5-50).
    #[arg(long, default_value = "15")]
    intensity: u32,

    /// Run person detection every Nth frame (1 = every frame).
    #[arg(long, default_value = "3")]
    interval: usize,

    /// Person detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f32,

    /// Path to a YOLO ONNX model; defaults to the model cache.
    #[arg(long)]
    model: Option<PathBuf>,

    /// URL to download the model from when it is not cached.
    #[arg(long)]
    model_url: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        log::info!("Stopping...");
        flag.store(true, Ordering::Relaxed);
    })?;

    let (title, camera) = match &cli.command {
        Command::Blobs(args) => ("CamGuard: color blobs", &args.camera),
        Command::Anonymize(args) => ("CamGuard: anonymize", &args.camera),
    };
    if camera.no_window {
        let targets = output_targets(camera.output.clone(), None);
        let processed = run_pipeline(cli.command, targets, cancelled)?;
        log::info!("Processed {processed} frames");
        return Ok(());
    }

    // The window owns the main thread; the pipeline runs beside it and
    // finishes the feed when it stops, which closes the window.
    let (width, height) = (camera.width, camera.height);
    let targets_output = camera.output.clone();
    let feed = LiveFeed::new();
    let worker = {
        let feed = feed.clone();
        let cancelled = cancelled.clone();
        thread::spawn(move || {
            let targets = output_targets(targets_output, Some(&feed));
            let result = run_pipeline(cli.command, targets, cancelled).map_err(|e| e.to_string());
            feed.finish();
            result
        })
    };

    let shown = live_window::show(title, feed, width, height);
    cancelled.store(true, Ordering::Relaxed);
    let processed = worker
        .join()
        .map_err(|_| "Pipeline thread panicked")??;
    shown?;
    log::info!("Processed {processed} frames");
    Ok(())
}

fn run_pipeline(
    command: Command,
    targets: Vec<SinkTarget>,
    cancelled: Arc<AtomicBool>,
) -> Result<usize, Box<dyn std::error::Error>> {
    match command {
        Command::Blobs(args) => run_blobs(args, targets, cancelled),
        Command::Anonymize(args) => run_anonymize(args, targets, cancelled),
    }
}

fn run_blobs(
    args: BlobsArgs,
    targets: Vec<SinkTarget>,
    cancelled: Arc<AtomicBool>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let camera = FfmpegCamera::open(&camera_config(&args.camera))?;
    let fps = camera.metadata().fps;

    let mut use_case = ColorBlobUseCase::new(
        Box::new(camera),
        ColorBlobDetector::new(args.color, args.min_area),
        targets,
        args.view,
        fps,
        args.camera.max_frames,
        Some(cancelled),
    );
    use_case.execute(&mut StdoutPipelineLogger::default())
}

fn run_anonymize(
    args: AnonymizeArgs,
    targets: Vec<SinkTarget>,
    cancelled: Arc<AtomicBool>,
) -> Result<usize, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {PERSON_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        PERSON_MODEL_NAME,
        args.model.as_deref(),
        args.model_url.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    let detector = OnnxYoloDetector::new(&model_path, args.confidence)?;
    let processor = FrameProcessor::new(
        Box::new(detector),
        Box::new(CpuRegionAnonymizer::new()),
        args.interval,
    )?;

    let camera = FfmpegCamera::open(&camera_config(&args.camera))?;
    let fps = camera.metadata().fps;
    let source = ThreadedFrameSource::start(Box::new(camera));

    let mut use_case = AnonymizeStreamUseCase::new(
        source,
        processor,
        targets,
        StreamControls::new(args.mode, args.intensity),
        fps,
        args.camera.max_frames,
        Some(cancelled),
    );
    use_case.execute(&mut StdoutPipelineLogger::default())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let camera = match &cli.command {
        Command::Blobs(args) => {
            if args.min_area <= 0.0 {
                return Err(format!("Min area must be positive, got {}", args.min_area).into());
            }
            &args.camera
        }
        Command::Anonymize(args) => {
            if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&args.intensity) {
                return Err(format!(
                    "Intensity must be between {MIN_INTENSITY} and {MAX_INTENSITY}, got {}",
                    args.intensity
                )
                .into());
            }
            if args.interval == 0 {
                return Err("Interval must be at least 1".into());
            }
            if !(0.0..=1.0).contains(&args.confidence) {
                return Err(format!(
                    "Confidence must be between 0.0 and 1.0, got {}",
                    args.confidence
                )
                .into());
            }
            if let Some(model) = &args.model {
                if !model.is_file() {
                    return Err(format!("Model file not found: {}", model.display()).into());
                }
            }
            &args.camera
        }
    };

    if camera.width == 0 || camera.height == 0 {
        return Err(format!(
            "Frame size must be positive, got {}x{}",
            camera.width, camera.height
        )
        .into());
    }
    if camera.fps == 0 {
        return Err("Frame rate must be positive".into());
    }
    if camera.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    Ok(())
}

fn camera_config(args: &CameraArgs) -> CameraConfig {
    CameraConfig {
        index: args.camera,
        device: args.device.clone(),
        width: args.width,
        height: args.height,
        fps: args.fps,
    }
}

/// The live window (when shown) first, then the `--output` file.
fn output_targets(output: Option<PathBuf>, feed: Option<&Arc<LiveFeed>>) -> Vec<SinkTarget> {
    let window = feed.map(|feed| SinkTarget {
        sink: Box::new(LiveViewSink::new(feed.clone())),
        path: PathBuf::from("window"),
    });
    let file = output.map(|path| SinkTarget {
        sink: create_sink(&path),
        path,
    });
    window.into_iter().chain(file).collect()
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading person detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading person detection model... {downloaded} bytes");
    }
}
