use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_sink::FrameSink;

/// Keeps a single image file up to date with the most recent frame.
///
/// Each write goes to a sibling temp file that is then renamed over the
/// target, so a viewer polling the file never sees a half-written image.
pub struct SnapshotWriter {
    path: Option<PathBuf>,
    frames_written: usize,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self {
            path: None,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// `shot.png` → `shot.part.png`; keeps the extension so the encoder is
/// picked from it.
fn temp_path(path: &Path) -> PathBuf {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("png");
    path.with_extension(format!("part.{ext}"))
}

impl FrameSink for SnapshotWriter {
    fn open(
        &mut self,
        path: &Path,
        _metadata: &StreamMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.path = Some(path.to_path_buf());
        self.frames_written = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let path = self.path.as_ref().ok_or("SnapshotWriter: not opened")?;

        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;

        let tmp = temp_path(path);
        img.save(&tmp)?;
        std::fs::rename(&tmp, path)?;

        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = self.path.take() {
            log::info!(
                "Snapshot {} refreshed {} times",
                path.display(),
                self.frames_written()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> StreamMetadata {
        StreamMetadata {
            width: 40,
            height: 30,
            fps: 30.0,
        }
    }

    fn solid_frame(index: usize, r: u8, g: u8, b: u8) -> Frame {
        let data = [r, g, b].repeat(40 * 30);
        Frame::new(data, 40, 30, 3, index)
    }

    #[test]
    fn test_latest_frame_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.png");

        let mut writer = SnapshotWriter::new();
        writer.open(&path, &metadata()).unwrap();
        writer.write(&solid_frame(0, 10, 20, 30)).unwrap();
        writer.write(&solid_frame(1, 50, 100, 200)).unwrap();
        writer.close().unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (40, 30));
        assert_eq!(img.get_pixel(5, 5).0, [50, 100, 200]);
        assert_eq!(writer.frames_written(), 2);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.png");

        let mut writer = SnapshotWriter::new();
        writer.open(&path, &metadata()).unwrap();
        writer.write(&solid_frame(0, 1, 2, 3)).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("live.png")]);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("live.png");

        let mut writer = SnapshotWriter::new();
        writer.open(&path, &metadata()).unwrap();
        writer.write(&solid_frame(0, 1, 2, 3)).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_write_without_open_returns_error() {
        let mut writer = SnapshotWriter::new();
        assert!(writer.write(&solid_frame(0, 1, 2, 3)).is_err());
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        assert_eq!(
            temp_path(Path::new("/tmp/shot.jpg")),
            PathBuf::from("/tmp/shot.part.jpg")
        );
    }
}
