pub mod settings_tab;
pub mod stream_tab;
