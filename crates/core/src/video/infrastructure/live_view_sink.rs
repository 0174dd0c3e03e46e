use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::domain::frame_slot::FrameSlot;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_sink::FrameSink;

/// Latest processed frame, shared between a pipeline thread and the window
/// that shows it.
#[derive(Default)]
pub struct LiveFeed {
    slot: FrameSlot,
    finished: AtomicBool,
}

impl LiveFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn latest(&self) -> Option<Frame> {
        self.slot.latest()
    }

    /// Marks the stream as over; the viewer closes on its next poll.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Publishes every processed frame into a [`LiveFeed`].
///
/// The viewer polls at its own rate, so frames it misses are dropped rather
/// than slowing the pipeline down.
pub struct LiveViewSink {
    feed: Arc<LiveFeed>,
}

impl LiveViewSink {
    pub fn new(feed: Arc<LiveFeed>) -> Self {
        Self { feed }
    }
}

impl FrameSink for LiveViewSink {
    fn open(
        &mut self,
        _path: &Path,
        metadata: &StreamMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!("Live view at {}x{}", metadata.width, metadata.height);
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.feed.slot.publish(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.feed.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8, index: usize) -> Frame {
        Frame::new(vec![value; 4 * 2 * 3], 4, 2, 3, index)
    }

    #[test]
    fn test_viewer_sees_latest_written_frame() {
        let feed = LiveFeed::new();
        let mut sink = LiveViewSink::new(feed.clone());
        assert!(feed.latest().is_none());

        sink.write(&frame(10, 0)).unwrap();
        sink.write(&frame(20, 1)).unwrap();

        let shown = feed.latest().unwrap();
        assert_eq!(shown.index(), 1);
        assert_eq!(shown.data()[0], 20);
    }

    #[test]
    fn test_close_finishes_feed_and_keeps_last_frame() {
        let feed = LiveFeed::new();
        let mut sink = LiveViewSink::new(feed.clone());
        sink.write(&frame(7, 3)).unwrap();
        assert!(!feed.is_finished());

        sink.close().unwrap();

        assert!(feed.is_finished());
        assert_eq!(feed.latest().unwrap().index(), 3);
    }
}
