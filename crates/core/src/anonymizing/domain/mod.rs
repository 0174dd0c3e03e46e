pub mod anonymize_settings;
pub mod frame_anonymizer;
