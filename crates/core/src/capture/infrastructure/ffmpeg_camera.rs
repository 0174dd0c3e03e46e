use crate::capture::domain::capture_device::{CameraConfig, CaptureDevice, CaptureError};
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Webcam capture via ffmpeg-next's libavdevice inputs.
///
/// Uses `v4l2` on Linux, `avfoundation` on macOS and `dshow` on Windows.
/// Every decoded frame is scaled to RGB24 at the configured size, so the
/// rest of the pipeline sees the geometry it asked for even when the
/// driver picks a different mode.
pub struct FfmpegCamera {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    width: u32,
    height: u32,
    fps: f64,
    frame_index: usize,
}

// Safety: FfmpegCamera is only used from a single thread at a time (the
// capture thread). The raw pointers inside ffmpeg types are not shared.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    /// Opens the camera described by `config`.
    ///
    /// Any failure here is fatal for the caller: the device is missing,
    /// busy, or the platform input format is not compiled into ffmpeg.
    pub fn open(config: &CameraConfig) -> Result<Self, CaptureError> {
        let (format_name, url) = platform_input(config);
        let unavailable = |reason: String| CaptureError::DeviceUnavailable {
            device: url.clone(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| unavailable(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let format = find_input_format(format_name)
            .ok_or_else(|| unavailable(format!("input format '{format_name}' not available")))?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set("video_size", &format!("{}x{}", config.width, config.height));
        options.set("framerate", &config.fps.to_string());

        let ictx = ffmpeg_next::format::open_with(&url, &format, options)
            .map_err(|e| unavailable(e.to_string()))?
            .input();

        let (video_stream_index, decoder, fps) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| unavailable("no video stream".to_string()))?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                    .map_err(|e| unavailable(e.to_string()))?;
            let decoder = codec_ctx
                .decoder()
                .video()
                .map_err(|e| unavailable(e.to_string()))?;
            let rate = stream.avg_frame_rate();
            let fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                config.fps as f64
            };
            (stream.index(), decoder, fps)
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            config.width,
            config.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| unavailable(e.to_string()))?;

        log::info!(
            "Opened camera {url} ({}x{} native, {}x{} output, {fps:.1} fps)",
            decoder.width(),
            decoder.height(),
            config.width,
            config.height
        );

        Ok(Self {
            input_ctx: Some(ictx),
            decoder: Some(decoder),
            scaler: Some(scaler),
            video_stream_index,
            width: config.width,
            height: config.height,
            fps,
            frame_index: 0,
        })
    }

    pub fn metadata(&self) -> StreamMetadata {
        StreamMetadata {
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

impl CaptureDevice for FfmpegCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let (Some(ictx), Some(decoder), Some(scaler)) = (
            self.input_ctx.as_mut(),
            self.decoder.as_mut(),
            self.scaler.as_mut(),
        ) else {
            return Err(CaptureError::ReadFailed("camera released".into()));
        };

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_err() {
            let Some((stream, packet)) = ictx.packets().next() else {
                return Err(CaptureError::ReadFailed("device stream ended".into()));
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            decoder
                .send_packet(&packet)
                .map_err(|e| CaptureError::ReadFailed(e.to_string()))?;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| CaptureError::ReadFailed(e.to_string()))?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        self.scaler = None;
        self.decoder = None;
        self.input_ctx = None;
    }
}

/// Looks up a registered libavdevice video input by name.
///
/// The device iterator hands out a null format when nothing is registered,
/// so the walk stops at the first null entry.
fn find_input_format(name: &str) -> Option<ffmpeg_next::Format> {
    ffmpeg_next::device::input::video()
        .take_while(|format| match format {
            ffmpeg_next::Format::Input(input) => unsafe { !input.as_ptr().is_null() },
            ffmpeg_next::Format::Output(_) => false,
        })
        .find(|format| format.name() == name)
}

/// Input format name and device URL for the current platform.
fn platform_input(config: &CameraConfig) -> (&'static str, String) {
    #[cfg(target_os = "macos")]
    {
        (
            "avfoundation",
            config
                .device
                .clone()
                .unwrap_or_else(|| config.index.to_string()),
        )
    }
    #[cfg(target_os = "windows")]
    {
        (
            "dshow",
            format!(
                "video={}",
                config
                    .device
                    .clone()
                    .unwrap_or_else(|| config.index.to_string())
            ),
        )
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        (
            "v4l2",
            config
                .device
                .clone()
                .unwrap_or_else(|| format!("/dev/video{}", config.index)),
        )
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
