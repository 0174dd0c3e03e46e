use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, open};

use crate::detection::domain::color_range::{rgb_to_hsv, BlobColor, HsvRange};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::constants::DEFAULT_MIN_BLOB_AREA;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Radius of the square structuring element (2 → 5x5 under `LInf`).
const KERNEL_RADIUS: u8 = 2;

/// Finds blobs of one color preset by HSV thresholding.
///
/// Pipeline: threshold → open → dilate → outer contours → area filter →
/// bounding boxes. Every blob is reported with the preset's class id and
/// confidence 1.0.
pub struct ColorBlobDetector {
    color: BlobColor,
    ranges: Vec<HsvRange>,
    min_area: f64,
}

impl ColorBlobDetector {
    pub fn new(color: BlobColor, min_area: f64) -> Self {
        Self {
            color,
            ranges: color.ranges(),
            min_area,
        }
    }

    pub fn color(&self) -> BlobColor {
        self.color
    }

    /// Binary mask (0 or 255) of pixels inside any of the preset's ranges.
    pub fn threshold(&self, frame: &Frame) -> GrayImage {
        let width = frame.width();
        let data = frame.data();
        let channels = frame.channels() as usize;
        GrayImage::from_fn(width, frame.height(), |x, y| {
            let i = (y as usize * width as usize + x as usize) * channels;
            let hsv = rgb_to_hsv(data[i], data[i + 1], data[i + 2]);
            let hit = self.ranges.iter().any(|r| r.contains(hsv));
            image::Luma([if hit { 255 } else { 0 }])
        })
    }

    /// Thresholded mask after 5x5 open and dilate.
    pub fn mask(&self, frame: &Frame) -> GrayImage {
        let raw = self.threshold(frame);
        let opened = open(&raw, Norm::LInf, KERNEL_RADIUS);
        dilate(&opened, Norm::LInf, KERNEL_RADIUS)
    }

    /// Blobs found in an already-computed mask.
    pub fn blobs_in_mask(&self, mask: &GrayImage) -> Vec<Detection> {
        find_contours::<i32>(mask)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| contour_area(c) > self.min_area)
            .filter_map(bounding_rect)
            .map(|region| Detection::new(region, self.color.class_id(), 1.0))
            .collect()
    }
}

impl Default for ColorBlobDetector {
    fn default() -> Self {
        Self::new(BlobColor::Green, DEFAULT_MIN_BLOB_AREA)
    }
}

impl ObjectDetector for ColorBlobDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self.blobs_in_mask(&self.mask(frame)))
    }
}

/// Zeroes every pixel whose mask value is 0 (`bitwise_and(frame, frame, mask)`).
pub fn apply_mask(frame: &mut Frame, mask: &GrayImage) {
    let channels = frame.channels() as usize;
    for (px, m) in frame.data_mut().chunks_exact_mut(channels).zip(mask.as_raw()) {
        if *m == 0 {
            px.fill(0);
        }
    }
}

/// Polygon area of a contour by the shoelace formula.
fn contour_area(contour: &Contour<i32>) -> f64 {
    let pts = &contour.points;
    if pts.len() < 3 {
        return 0.0;
    }
    let twice: i64 = pts
        .iter()
        .zip(pts.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Axis-aligned box covering every contour point, extent inclusive.
fn bounding_rect(contour: &Contour<i32>) -> Option<Region> {
    let first = contour.points.first()?;
    let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        x1 = x1.min(p.x);
        y1 = y1.min(p.y);
        x2 = x2.max(p.x);
        y2 = y2.max(p.y);
    }
    Some(Region::new(x1, y1, x2 + 1, y2 + 1))
}
