pub mod cpu_region_anonymizer;
pub mod gaussian;
pub mod pixelate;
