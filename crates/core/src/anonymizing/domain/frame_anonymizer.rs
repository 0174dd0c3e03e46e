use crate::anonymizing::domain::anonymize_settings::AnonymizeSettings;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for obscuring detected regions within a frame.
///
/// Implementations modify the frame in-place, in detection order, so the
/// last region wins where regions overlap.
pub trait FrameAnonymizer: Send {
    fn anonymize(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
        settings: &AnonymizeSettings,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
