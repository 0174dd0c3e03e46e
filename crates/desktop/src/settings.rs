use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use camguard_core::anonymizing::domain::anonymize_settings::AnonymizeMode;
use camguard_core::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_CONFIDENCE, DEFAULT_INFERENCE_INTERVAL, DEFAULT_INTENSITY,
};

/// Persisted form of the anonymization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Pixelate,
    Blur,
    Blackbox,
}

impl Mode {
    pub const ALL: &[Mode] = &[Mode::Pixelate, Mode::Blur, Mode::Blackbox];
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Pixelate => write!(f, "Pixelate"),
            Mode::Blur => write!(f, "Blur"),
            Mode::Blackbox => write!(f, "Black box"),
        }
    }
}

impl From<Mode> for AnonymizeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Pixelate => AnonymizeMode::Pixelate,
            Mode::Blur => AnonymizeMode::Blur,
            Mode::Blackbox => AnonymizeMode::Blackbox,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::System, Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::System => write!(f, "System"),
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: Mode,
    pub intensity: u32,
    pub interval: u32,
    /// Detection confidence in percent.
    pub confidence: u32,
    pub camera_index: u32,
    pub model_path: Option<PathBuf>,
    pub model_url: Option<String>,
    pub appearance: Appearance,
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Pixelate,
            intensity: DEFAULT_INTENSITY,
            interval: DEFAULT_INFERENCE_INTERVAL as u32,
            confidence: (DEFAULT_CONFIDENCE * 100.0).round() as u32,
            camera_index: DEFAULT_CAMERA_INDEX,
            model_path: None,
            model_url: None,
            appearance: Appearance::System,
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("CamGuard").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            self.save_to(&path);
        }
    }

    /// Reads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::warn!("Could not save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Could not serialize settings: {e}"),
        }
    }

    pub fn confidence_fraction(&self) -> f32 {
        self.confidence.min(100) as f32 / 100.0
    }
}
