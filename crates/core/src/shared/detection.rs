use crate::shared::region::Region;

/// COCO class index for "person".
pub const PERSON_CLASS_ID: usize = 0;

/// One detected object: box, class and score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub region: Region,
    pub class_id: usize,
    pub confidence: f32,
}

impl Detection {
    pub fn new(region: Region, class_id: usize, confidence: f32) -> Self {
        Self {
            region,
            class_id,
            confidence,
        }
    }

    pub fn is_person(&self) -> bool {
        self.class_id == PERSON_CLASS_ID
    }
}

/// Keeps only person detections, preserving order.
pub fn persons(detections: &[Detection]) -> Vec<Detection> {
    detections.iter().filter(|d| d.is_person()).copied().collect()
}
