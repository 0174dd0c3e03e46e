//! YOLOv8-style object detector using ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference, class argmax, confidence
//! filtering and per-class NMS for COCO exports whose single output has the
//! shape `[1, 4 + classes, anchors]`.
use std::path::Path;

use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::onnx_session::{open_session, square_input_size};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Box coordinates occupy the first four rows of every anchor column.
const BOX_VALUES: usize = 4;

/// Object detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f32,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;
        let input_size = square_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded detection model {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 || shape[1] <= BOX_VALUES {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_predictions(data, shape[1], shape[2], self.confidence);
        let kept = nms(&mut raw, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .map(|d| {
                let [x1, y1, x2, y2] = letterbox.unmap(&d.bbox);
                Detection::new(
                    Region::new(
                        x1.round() as i32,
                        y1.round() as i32,
                        x2.round() as i32,
                        y2.round() as i32,
                    ),
                    d.class_id,
                    d.confidence,
                )
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed model coordinates back to frame coordinates.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, bbox: &[f64; 4]) -> [f64; 4] {
        let px = self.pad_x as f64;
        let py = self.pad_y as f64;
        [
            (bbox[0] - px) / self.scale,
            (bbox[1] - py) / self.scale,
            (bbox[2] - px) / self.scale,
            (bbox[3] - py) / self.scale,
        ]
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns the NCHW float32 tensor and the mapping needed to undo it.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    /// `[x1, y1, x2, y2]` in letterbox coordinates.
    bbox: [f64; 4],
    class_id: usize,
    confidence: f32,
}

/// Decodes a `[features, anchors]` prediction block (batch dimension
/// stripped). Each anchor column is `[cx, cy, w, h, score_0 .. score_C]`;
/// the best-scoring class is kept if it reaches `min_confidence`.
fn parse_predictions(
    data: &[f32],
    num_features: usize,
    num_anchors: usize,
    min_confidence: f32,
) -> Vec<RawDetection> {
    let mut dets = Vec::new();
    if num_features <= BOX_VALUES || data.len() < num_features * num_anchors {
        return dets;
    }
    let at = |feature: usize, anchor: usize| data[feature * num_anchors + anchor];

    for a in 0..num_anchors {
        let (class_id, confidence) = (BOX_VALUES..num_features)
            .map(|f| (f - BOX_VALUES, at(f, a)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if confidence < min_confidence {
            continue;
        }

        let cx = at(0, a) as f64;
        let cy = at(1, a) as f64;
        let w = at(2, a) as f64;
        let h = at(3, a) as f64;
        dets.push(RawDetection {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            class_id,
            confidence,
        });
    }
    dets
}

/// Greedy per-class NMS: sort by confidence descending, suppress boxes of the
/// same class that overlap a kept box.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if bbox_iou(&dets[i].bbox, &dets[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(bbox: [f64; 4], class_id: usize, confidence: f32) -> RawDetection {
        RawDetection {
            bbox,
            class_id,
            confidence,
        }
    }

    /// Builds a `[4 + classes, anchors]` block from per-anchor columns.
    fn predictions(columns: &[Vec<f32>]) -> (Vec<f32>, usize, usize) {
        let features = columns[0].len();
        let anchors = columns.len();
        let mut data = vec![0.0; features * anchors];
        for (a, col) in columns.iter().enumerate() {
            for (f, v) in col.iter().enumerate() {
                data[f * anchors + a] = *v;
            }
        }
        (data, features, anchors)
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, content 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 0.01);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_pads_with_gray() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        let y = lb.pad_y as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, 1]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 40,
        };
        let back = lb.unmap(&[20.0, 60.0, 120.0, 240.0]);
        assert_eq!(back, [10.0, 10.0, 60.0, 100.0]);
    }

    #[test]
    fn test_parse_predictions_takes_best_class() {
        // Two classes; anchor scores class 1 highest
        let (data, f, a) = predictions(&[vec![50.0, 50.0, 20.0, 40.0, 0.2, 0.7]]);
        let dets = parse_predictions(&data, f, a, 0.5);

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_relative_eq!(dets[0].confidence, 0.7);
        assert_eq!(dets[0].bbox, [40.0, 30.0, 60.0, 70.0]);
    }

    #[test]
    fn test_parse_predictions_filters_by_confidence() {
        let (data, f, a) = predictions(&[
            vec![10.0, 10.0, 4.0, 4.0, 0.9, 0.0],
            vec![30.0, 30.0, 4.0, 4.0, 0.3, 0.1],
            vec![50.0, 50.0, 4.0, 4.0, 0.0, 0.55],
        ]);
        let dets = parse_predictions(&data, f, a, 0.5);

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[1].class_id, 1);
    }

    #[test]
    fn test_parse_predictions_rejects_short_buffer() {
        assert!(parse_predictions(&[0.0; 10], 6, 4, 0.1).is_empty());
        assert!(parse_predictions(&[0.0; 16], 4, 4, 0.1).is_empty());
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let mut dets = vec![
            raw([0.0, 0.0, 100.0, 100.0], 0, 0.9),
            raw([5.0, 5.0, 105.0, 105.0], 0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let mut dets = vec![
            raw([0.0, 0.0, 100.0, 100.0], 0, 0.9),
            raw([5.0, 5.0, 105.0, 105.0], 2, 0.8),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_nms_confidence_ordering() {
        let mut dets = vec![
            raw([0.0, 0.0, 100.0, 100.0], 0, 0.5),
            raw([2.0, 2.0, 102.0, 102.0], 0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<RawDetection> = Vec::new();
        assert!(nms(&mut dets, 0.3).is_empty());
    }

    #[test]
    fn test_bbox_iou() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(bbox_iou(&b, &b), 1.0);
        assert_eq!(bbox_iou(&b, &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }
}
