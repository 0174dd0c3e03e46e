pub mod box_overlay;
pub mod color_blob_detector;
pub mod onnx_session;
pub mod onnx_yolo_detector;
pub mod periodic_detector;
