use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capture::domain::capture_device::CaptureDevice;
use crate::capture::domain::frame_slot::FrameSlot;
use crate::shared::frame::Frame;

/// Pause after a failed grab so a dead device doesn't spin a core.
const FAILED_READ_PAUSE: Duration = Duration::from_millis(5);

/// Decouples camera latency from processing rate.
///
/// A background thread owns the device and keeps publishing into a
/// [`FrameSlot`]; `read` hands out a copy of whatever arrived last. Frames
/// the consumer is too slow for are dropped, never queued.
pub struct ThreadedFrameSource {
    slot: Arc<FrameSlot>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadedFrameSource {
    /// Moves `device` onto a capture thread and starts grabbing.
    pub fn start(device: Box<dyn CaptureDevice>) -> Self {
        let slot = Arc::new(FrameSlot::new());
        let stopped = Arc::new(AtomicBool::new(false));

        let handle = spawn_capture(device, slot.clone(), stopped.clone());

        Self {
            slot,
            stopped,
            handle: Some(handle),
        }
    }

    /// Latest captured frame, or `None` until the first one arrives.
    pub fn read(&self) -> Option<Frame> {
        self.slot.latest()
    }

    /// Stops the capture thread and waits for it to release the device.
    ///
    /// The device is released on the capture thread after it observes the
    /// stop flag, so no grab is ever issued against a released device.
    /// Safe to call more than once.
    pub fn release(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
    }
}

impl Drop for ThreadedFrameSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn spawn_capture(
    mut device: Box<dyn CaptureDevice>,
    slot: Arc<FrameSlot>,
    stopped: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut failed_reads: usize = 0;
        while !stopped.load(Ordering::Acquire) {
            match device.read() {
                Ok(frame) => slot.publish(frame),
                Err(e) => {
                    failed_reads += 1;
                    log::trace!("Frame grab failed, retrying: {e}");
                    thread::sleep(FAILED_READ_PAUSE);
                }
            }
        }
        device.release();
        log::debug!("Capture thread stopped ({failed_reads} failed grabs)");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_device::CaptureError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// Yields frames whose pixels equal their index; every `fail_every`-th
    /// grab fails.
    struct ScriptedDevice {
        next_index: usize,
        fail_every: Option<usize>,
        grabs: Arc<AtomicUsize>,
        released: Arc<AtomicBool>,
    }

    impl ScriptedDevice {
        fn new(fail_every: Option<usize>) -> (Self, Arc<AtomicUsize>, Arc<AtomicBool>) {
            let grabs = Arc::new(AtomicUsize::new(0));
            let released = Arc::new(AtomicBool::new(false));
            (
                Self {
                    next_index: 0,
                    fail_every,
                    grabs: grabs.clone(),
                    released: released.clone(),
                },
                grabs,
                released,
            )
        }
    }

    impl CaptureDevice for ScriptedDevice {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            assert!(
                !self.released.load(Ordering::SeqCst),
                "read after release"
            );
            let n = self.grabs.fetch_add(1, Ordering::SeqCst) + 1;
            thread::sleep(Duration::from_millis(1));
            if self.fail_every.is_some_and(|k| n % k == 0) {
                return Err(CaptureError::ReadFailed("scripted failure".into()));
            }
            let index = self.next_index;
            self.next_index += 1;
            Ok(Frame::new(vec![(index % 256) as u8; 8 * 8 * 3], 8, 8, 3, index))
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    /// Never produces a frame.
    struct DeadDevice;

    impl CaptureDevice for DeadDevice {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            Err(CaptureError::ReadFailed("no signal".into()))
        }

        fn release(&mut self) {}
    }

    fn wait_for_frame(source: &ThreadedFrameSource, min_index: usize) -> Frame {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(f) = source.read() {
                if f.index() >= min_index {
                    return f;
                }
            }
            assert!(Instant::now() < deadline, "timed out waiting for frame");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_read_returns_published_frames() {
        let (device, _, _) = ScriptedDevice::new(None);
        let mut source = ThreadedFrameSource::start(Box::new(device));

        let frame = wait_for_frame(&source, 3);
        assert!(frame.index() >= 3);
        assert!(frame.data().iter().all(|&v| v == (frame.index() % 256) as u8));

        source.release();
    }

    #[test]
    fn test_failed_grabs_are_skipped() {
        let (device, grabs, _) = ScriptedDevice::new(Some(2));
        let mut source = ThreadedFrameSource::start(Box::new(device));

        let frame = wait_for_frame(&source, 5);
        assert!(frame.index() >= 5);
        assert!(grabs.load(Ordering::SeqCst) > frame.index());

        source.release();
    }

    #[test]
    fn test_dead_device_is_never_ready() {
        let mut source = ThreadedFrameSource::start(Box::new(DeadDevice));
        thread::sleep(Duration::from_millis(30));
        assert!(source.read().is_none());
        source.release();
    }

    #[test]
    fn test_release_stops_thread_and_releases_device() {
        let (device, grabs, released) = ScriptedDevice::new(None);
        let mut source = ThreadedFrameSource::start(Box::new(device));
        wait_for_frame(&source, 1);

        source.release();
        assert!(released.load(Ordering::SeqCst));
        source.release();

        let after = grabs.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(grabs.load(Ordering::SeqCst), after);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (device, _, released) = ScriptedDevice::new(None);
        let mut source = ThreadedFrameSource::start(Box::new(device));
        source.release();
        source.release();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_releases_device() {
        let (device, _, released) = ScriptedDevice::new(None);
        {
            let _source = ThreadedFrameSource::start(Box::new(device));
        }
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_read_hands_out_copies() {
        let (device, _, _) = ScriptedDevice::new(None);
        let mut source = ThreadedFrameSource::start(Box::new(device));
        let mut frame = wait_for_frame(&source, 0);
        frame.data_mut().fill(255);
        source.release();

        let latest = source.read().unwrap();
        let expected = (latest.index() % 256) as u8;
        assert!(latest.data().iter().all(|&v| v == expected));
    }
}
