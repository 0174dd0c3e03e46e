pub mod capture_device;
pub mod frame_slot;
