pub mod anonymize_stream_use_case;
pub mod color_blob_use_case;
pub mod frame_outputs;
pub mod frame_processor;
pub mod pipeline_logger;
pub mod stream_controls;
