use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_sink::FrameSink;

/// A sink plus the path it is opened on. Sinks without a file (the live
/// view) ignore the path.
pub struct SinkTarget {
    pub sink: Box<dyn FrameSink>,
    pub path: PathBuf,
}

/// Every place a pipeline sends its processed frames.
///
/// Sinks are opened together on the first frame, with that frame's size
/// and the stream's nominal rate, and receive every frame in order.
pub struct FrameOutputs {
    targets: Vec<SinkTarget>,
    fps: f64,
    opened: bool,
}

impl FrameOutputs {
    pub fn new(targets: Vec<SinkTarget>, fps: f64) -> Self {
        Self {
            targets,
            fps,
            opened: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if !self.opened {
            let metadata = StreamMetadata {
                width: frame.width(),
                height: frame.height(),
                fps: self.fps,
            };
            for t in &mut self.targets {
                t.sink.open(&t.path, &metadata)?;
            }
            self.opened = true;
        }
        for t in &mut self.targets {
            t.sink.write(frame)?;
        }
        Ok(())
    }

    /// Closes every sink, even after one of them fails; the first error wins.
    pub fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut first_err = None;
        for t in &mut self.targets {
            if let Err(e) = t.sink.close() {
                log::error!("Failed to close {}: {e}", t.path.display());
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Appends `name:event` to a shared journal.
    struct JournalSink {
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
        fail_close: bool,
    }

    impl FrameSink for JournalSink {
        fn open(
            &mut self,
            _path: &Path,
            metadata: &StreamMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.journal.lock().unwrap().push(format!(
                "{}:open {}x{}@{}",
                self.name, metadata.width, metadata.height, metadata.fps
            ));
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:write {}", self.name, frame.index()));
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:close", self.name));
            if self.fail_close {
                return Err("flush failed".into());
            }
            Ok(())
        }
    }

    fn outputs(fail_first_close: bool) -> (FrameOutputs, Arc<Mutex<Vec<String>>>) {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let targets = ["a", "b"]
            .into_iter()
            .enumerate()
            .map(|(i, name)| SinkTarget {
                sink: Box::new(JournalSink {
                    name,
                    journal: journal.clone(),
                    fail_close: fail_first_close && i == 0,
                }),
                path: PathBuf::from(name),
            })
            .collect();
        (FrameOutputs::new(targets, 30.0), journal)
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 8 * 6 * 3], 8, 6, 3, index)
    }

    #[test]
    fn test_opens_once_then_writes_every_sink() {
        let (mut out, journal) = outputs(false);

        out.write(&frame(4)).unwrap();
        out.write(&frame(5)).unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "a:open 8x6@30",
                "b:open 8x6@30",
                "a:write 4",
                "b:write 4",
                "a:write 5",
                "b:write 5",
            ]
        );
    }

    #[test]
    fn test_close_reaches_every_sink_and_reports_failure() {
        let (mut out, journal) = outputs(true);

        assert!(out.close().is_err());
        assert_eq!(*journal.lock().unwrap(), vec!["a:close", "b:close"]);
    }

    #[test]
    fn test_empty_outputs_accept_frames() {
        let mut out = FrameOutputs::new(Vec::new(), 30.0);
        assert!(out.is_empty());
        out.write(&frame(0)).unwrap();
        out.close().unwrap();
    }
}
