use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Destination for processed frames, so pipelines can emit output without
/// depending on a specific codec or file format.
pub trait FrameSink: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &StreamMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes pending output. Calling it on a closed sink is a no-op.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
