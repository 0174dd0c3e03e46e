use std::sync::{Mutex, PoisonError};

use crate::shared::frame::Frame;

/// Single-frame mailbox shared between the capture thread and a consumer.
///
/// Publishing overwrites whatever was there (latest frame wins, nothing
/// queues). The lock is held only while a frame is moved in or cloned out,
/// so a reader always sees a whole frame.
#[derive(Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Frame>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest = Some(frame);
    }

    /// Returns a copy of the latest frame, or `None` before the first publish.
    pub fn latest(&self) -> Option<Frame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn frame(value: u8, index: usize) -> Frame {
        Frame::new(vec![value; 4 * 4 * 3], 4, 4, 3, index)
    }

    #[test]
    fn test_empty_slot_is_not_ready() {
        assert!(FrameSlot::new().latest().is_none());
    }

    #[test]
    fn test_latest_frame_wins() {
        let slot = FrameSlot::new();
        slot.publish(frame(1, 0));
        slot.publish(frame(2, 1));
        let latest = slot.latest().unwrap();
        assert_eq!(latest.index(), 1);
        assert_eq!(latest.data()[0], 2);
    }

    #[test]
    fn test_latest_returns_independent_copy() {
        let slot = FrameSlot::new();
        slot.publish(frame(9, 0));
        let mut copy = slot.latest().unwrap();
        copy.data_mut().fill(0);
        assert_eq!(slot.latest().unwrap().data()[0], 9);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_frames() {
        let slot = Arc::new(FrameSlot::new());
        let writer_slot = slot.clone();
        let writer = thread::spawn(move || {
            for i in 0..500usize {
                writer_slot.publish(frame((i % 256) as u8, i));
            }
        });

        for _ in 0..500 {
            if let Some(f) = slot.latest() {
                let first = f.data()[0];
                assert!(f.data().iter().all(|&v| v == first));
            }
        }
        writer.join().unwrap();
    }
}
