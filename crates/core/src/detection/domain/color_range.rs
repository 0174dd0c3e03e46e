use std::fmt;
use std::str::FromStr;

/// Inclusive HSV bounds in OpenCV's 8-bit convention
/// (hue 0-180, saturation and value 0-255).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// Named color presets for blob detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlobColor {
    Green,
    Yellow,
    Red,
    White,
}

impl BlobColor {
    pub const ALL: &[BlobColor] = &[
        BlobColor::Green,
        BlobColor::Yellow,
        BlobColor::Red,
        BlobColor::White,
    ];

    /// Threshold ranges for the preset. Red straddles hue 0, so it takes two.
    pub fn ranges(self) -> Vec<HsvRange> {
        match self {
            BlobColor::Green => vec![HsvRange::new([35, 50, 50], [85, 255, 255])],
            BlobColor::Yellow => vec![HsvRange::new([20, 100, 100], [30, 255, 255])],
            BlobColor::Red => vec![
                HsvRange::new([0, 120, 70], [10, 255, 255]),
                HsvRange::new([170, 120, 70], [180, 255, 255]),
            ],
            BlobColor::White => vec![HsvRange::new([0, 0, 200], [180, 40, 255])],
        }
    }

    /// Box color used when annotating blobs of this preset (RGB).
    pub fn overlay_rgb(self) -> [u8; 3] {
        match self {
            BlobColor::Green => [0, 255, 0],
            BlobColor::Yellow => [255, 255, 0],
            BlobColor::Red => [255, 0, 0],
            BlobColor::White => [255, 255, 255],
        }
    }

    pub fn class_id(self) -> usize {
        self as usize
    }

    /// Caption drawn above each annotated blob.
    pub fn label(self) -> &'static str {
        match self {
            BlobColor::Green => "Green Object",
            BlobColor::Yellow => "Yellow Object",
            BlobColor::Red => "Red Object",
            BlobColor::White => "White Object",
        }
    }
}

impl fmt::Display for BlobColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobColor::Green => write!(f, "green"),
            BlobColor::Yellow => write!(f, "yellow"),
            BlobColor::Red => write!(f, "red"),
            BlobColor::White => write!(f, "white"),
        }
    }
}

impl FromStr for BlobColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlobColor::ALL
            .iter()
            .copied()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown color '{s}' (expected green, yellow, red or white)"))
    }
}

/// Converts one RGB pixel to 8-bit HSV the way OpenCV's `COLOR_RGB2HSV` does.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let s = if max > 0.0 { 255.0 * diff / max } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / diff
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h8 = (h / 2.0).round() as u32 % 180;
    [h8 as u8, s.round() as u8, max as u8]
}
