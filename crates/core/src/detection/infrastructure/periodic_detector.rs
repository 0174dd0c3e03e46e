use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Decorator that runs the inner detector every N iterations and serves the
/// cached result in between.
///
/// The cache is at most N-1 iterations stale. If the inner detector fails,
/// the error is returned and the previous cache is kept, so the caller can
/// fall back to [`PeriodicDetector::cached`].
pub struct PeriodicDetector {
    inner: Box<dyn ObjectDetector>,
    interval: usize,
    counter: usize,
    cached: Vec<Detection>,
}

impl PeriodicDetector {
    pub fn new(inner: Box<dyn ObjectDetector>, interval: usize) -> Result<Self, &'static str> {
        if interval < 1 {
            return Err("interval must be >= 1");
        }
        Ok(Self {
            inner,
            interval,
            counter: 0,
            cached: Vec::new(),
        })
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Whether the next call to `detect` will run inference.
    pub fn is_due(&self) -> bool {
        self.counter % self.interval == 0
    }

    /// The most recent detection result; empty before the first run.
    pub fn cached(&self) -> &[Detection] {
        &self.cached
    }
}

impl ObjectDetector for PeriodicDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let due = self.is_due();
        self.counter = self.counter.wrapping_add(1);

        if due {
            self.cached = self.inner.detect(frame)?;
        }
        Ok(self.cached.clone())
    }
}
