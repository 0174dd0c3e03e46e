use std::fmt;
use std::str::FromStr;

use crate::shared::constants::{DEFAULT_INTENSITY, MAX_INTENSITY, MIN_INTENSITY};

/// How a detected region is obscured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnonymizeMode {
    #[default]
    Pixelate,
    Blur,
    Blackbox,
}

impl AnonymizeMode {
    pub const ALL: &[AnonymizeMode] = &[
        AnonymizeMode::Pixelate,
        AnonymizeMode::Blur,
        AnonymizeMode::Blackbox,
    ];
}

impl fmt::Display for AnonymizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnonymizeMode::Pixelate => write!(f, "pixelate"),
            AnonymizeMode::Blur => write!(f, "blur"),
            AnonymizeMode::Blackbox => write!(f, "blackbox"),
        }
    }
}

impl FromStr for AnonymizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnonymizeMode::ALL
            .iter()
            .copied()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mode '{s}' (expected pixelate, blur or blackbox)"))
    }
}

/// Mode and strength for one anonymization call.
///
/// Intensity is the pixelation grid size or the blur kernel size; it is
/// always kept within `MIN_INTENSITY..=MAX_INTENSITY`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnonymizeSettings {
    pub mode: AnonymizeMode,
    intensity: u32,
}

impl AnonymizeSettings {
    pub fn new(mode: AnonymizeMode, intensity: u32) -> Self {
        Self {
            mode,
            intensity: intensity.clamp(MIN_INTENSITY, MAX_INTENSITY),
        }
    }

    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: u32) {
        self.intensity = intensity.clamp(MIN_INTENSITY, MAX_INTENSITY);
    }

    /// Gaussian kernel size: the intensity forced odd (even V becomes V + 1).
    pub fn blur_kernel_size(&self) -> usize {
        (self.intensity | 1) as usize
    }
}

impl Default for AnonymizeSettings {
    fn default() -> Self {
        Self::new(AnonymizeMode::default(), DEFAULT_INTENSITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5, 5)]
    #[case(10, 11)]
    #[case(15, 15)]
    #[case(50, 51)]
    fn test_blur_kernel_forced_odd(#[case] intensity: u32, #[case] expected: usize) {
        let settings = AnonymizeSettings::new(AnonymizeMode::Blur, intensity);
        assert_eq!(settings.blur_kernel_size(), expected);
    }

    #[rstest]
    #[case(0, MIN_INTENSITY)]
    #[case(4, MIN_INTENSITY)]
    #[case(20, 20)]
    #[case(500, MAX_INTENSITY)]
    fn test_intensity_is_clamped(#[case] requested: u32, #[case] expected: u32) {
        let mut settings = AnonymizeSettings::new(AnonymizeMode::Pixelate, requested);
        assert_eq!(settings.intensity(), expected);
        settings.set_intensity(requested);
        assert_eq!(settings.intensity(), expected);
    }

    #[test]
    fn test_mode_parse_and_display() {
        for mode in AnonymizeMode::ALL {
            assert_eq!(mode.to_string().parse::<AnonymizeMode>().unwrap(), *mode);
        }
        assert_eq!("BLUR".parse::<AnonymizeMode>().unwrap(), AnonymizeMode::Blur);
        assert!("smudge".parse::<AnonymizeMode>().is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = AnonymizeSettings::default();
        assert_eq!(settings.mode, AnonymizeMode::Pixelate);
        assert_eq!(settings.intensity(), DEFAULT_INTENSITY);
    }
}
