/// Geometry and nominal rate of a live frame stream.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl StreamMetadata {
    /// Integer frame rate for encoders; falls back to 30 when unknown.
    pub fn fps_or_default(&self) -> i32 {
        let fps = self.fps.round() as i32;
        if fps <= 0 {
            30
        } else {
            fps
        }
    }
}
