use std::path::Path;

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::video::domain::frame_sink::FrameSink;

use super::ffmpeg_writer::FfmpegWriter;
use super::snapshot_writer::SnapshotWriter;

/// Returns true if the path has an image file extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Picks the sink for an output path: image extensions get a live snapshot,
/// anything else is encoded as video.
pub fn create_sink(path: &Path) -> Box<dyn FrameSink> {
    if is_image_path(path) {
        log::info!("Writing live snapshot to {}", path.display());
        Box::new(SnapshotWriter::new())
    } else {
        log::info!("Recording video to {}", path.display());
        Box::new(FfmpegWriter::new())
    }
}
