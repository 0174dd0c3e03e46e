/// File name the person detector looks for in the model cache.
pub const PERSON_MODEL_NAME: &str = "yolov8n.onnx";

pub const DEFAULT_CAMERA_INDEX: u32 = 0;
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 360;
pub const DEFAULT_FPS: u32 = 30;

/// Run the person detector every Nth processed frame.
pub const DEFAULT_INFERENCE_INTERVAL: usize = 3;

pub const MIN_INTENSITY: u32 = 5;
pub const MAX_INTENSITY: u32 = 50;
pub const DEFAULT_INTENSITY: u32 = 15;

pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Blobs at or below this contour area (px²) are treated as noise.
pub const DEFAULT_MIN_BLOB_AREA: f64 = 500.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
