pub mod color_range;
pub mod object_detector;
