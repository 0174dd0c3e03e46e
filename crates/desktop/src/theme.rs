use iced::color;
use iced::theme::Palette;
use iced::{Color, Theme};

use crate::settings::Appearance;

/// Resolve the iced Theme from appearance + high_contrast settings.
pub fn resolve_theme(appearance: Appearance, high_contrast: bool) -> Theme {
    let is_dark = match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => detect_system_dark_mode(),
    };
    Theme::custom("CamGuard", palette(is_dark, high_contrast))
}

fn palette(is_dark: bool, high_contrast: bool) -> Palette {
    let (background, text) = match (is_dark, high_contrast) {
        (true, false) => (color!(0x17, 0x19, 0x1c), color!(0xd4, 0xd7, 0xdb)),
        (false, false) => (color!(0xf4, 0xf5, 0xf6), color!(0x1f, 0x22, 0x25)),
        (true, true) => (color!(0x00, 0x00, 0x00), color!(0xff, 0xff, 0xff)),
        (false, true) => (color!(0xff, 0xff, 0xff), color!(0x00, 0x00, 0x00)),
    };
    Palette {
        background,
        text,
        primary: if is_dark {
            color!(0x4f, 0xb2, 0x86)
        } else {
            color!(0x1f, 0x8a, 0x5b)
        },
        success: color!(0x34, 0xc7, 0x59),
        warning: color!(0xf0, 0xa2, 0x02),
        danger: color!(0xe5, 0x48, 0x4d),
    }
}

/// Secondary text color for hints and the status line.
pub fn muted_color(theme: &Theme) -> Color {
    let text = theme.palette().text;
    Color { a: 0.6, ..text }
}

fn detect_system_dark_mode() -> bool {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("defaults")
            .args(["read", "-g", "AppleInterfaceStyle"])
            .output()
            .map(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .trim()
                    .eq_ignore_ascii_case("dark")
            })
            .unwrap_or(true)
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}
