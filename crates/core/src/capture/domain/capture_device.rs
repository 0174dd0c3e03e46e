use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_FPS, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH,
};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// Fatal at startup: the camera could not be opened.
    #[error("camera {device} is not available: {reason}")]
    DeviceUnavailable { device: String, reason: String },
    /// Transient: one grab failed; callers retry on the next iteration.
    #[error("failed to read frame: {0}")]
    ReadFailed(String),
}

/// Which camera to open and what frame size to ask it for.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub index: u32,
    /// Platform device name overriding `index` (e.g. a DirectShow name).
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_CAMERA_INDEX,
            device: None,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

/// A blocking source of frames, typically a webcam.
///
/// `read` blocks until the next frame is available or the grab fails.
/// Implementations are moved onto a capture thread, hence `Send`.
pub trait CaptureDevice: Send {
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the underlying device. Further reads must fail.
    fn release(&mut self);
}
