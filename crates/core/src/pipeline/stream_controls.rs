use crate::anonymizing::domain::anonymize_settings::{AnonymizeMode, AnonymizeSettings};

/// User-adjustable state read once per processing iteration.
///
/// The headless loop builds one from command-line flags; the desktop app
/// keeps one in its state and hands a copy to every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamControls {
    pub running: bool,
    pub anonymize: bool,
    pub settings: AnonymizeSettings,
}

impl StreamControls {
    pub fn new(mode: AnonymizeMode, intensity: u32) -> Self {
        Self {
            running: true,
            anonymize: true,
            settings: AnonymizeSettings::new(mode, intensity),
        }
    }
}

impl Default for StreamControls {
    fn default() -> Self {
        Self {
            running: true,
            anonymize: true,
            settings: AnonymizeSettings::default(),
        }
    }
}
