use iced::widget::{button, checkbox, column, pick_list, row, slider, text, text_input, Space};
use iced::{Alignment, Element};

use crate::app::{scaled, Message, Phase};
use crate::settings::{Appearance, Settings};

pub fn view<'a>(settings: &'a Settings, phase: Phase) -> Element<'a, Message> {
    let fs = settings.font_scale;
    let size = scaled(13.0, fs);
    let heading = scaled(16.0, fs);

    let model_path = settings
        .model_path
        .as_deref()
        .and_then(|p| p.to_str())
        .unwrap_or("");
    let model_url = settings.model_url.as_deref().unwrap_or("");

    let hint = if phase == Phase::Idle {
        ""
    } else {
        "Detection and camera changes apply the next time the stream starts."
    };

    column![
        text("Detection").size(heading),
        Space::new().height(8),
        row![
            text("Run every").size(size),
            slider(1..=10, settings.interval, Message::IntervalChanged),
            text(format!("{} frame(s)", settings.interval)).size(size),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        row![
            text("Confidence").size(size),
            slider(10..=95, settings.confidence, Message::ConfidenceChanged).step(5u32),
            text(format!("{}%", settings.confidence)).size(size),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        Space::new().height(8),
        text("Model file (leave empty to use the cache)").size(size),
        text_input("yolov8n.onnx", model_path)
            .on_input(Message::ModelPathChanged)
            .size(size),
        text("Download URL when the model is not cached").size(size),
        text_input("https://...", model_url)
            .on_input(Message::ModelUrlChanged)
            .size(size),
        Space::new().height(16),
        text("Camera").size(heading),
        Space::new().height(8),
        row![
            text("Index").size(size),
            slider(0..=9, settings.camera_index, Message::CameraIndexChanged),
            text(settings.camera_index.to_string()).size(size),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        text(hint).size(scaled(11.0, fs)),
        Space::new().height(16),
        text("Appearance").size(heading),
        Space::new().height(8),
        row![
            text("Theme").size(size),
            pick_list(Appearance::ALL, Some(settings.appearance), Message::AppearanceChanged)
                .text_size(size),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        checkbox(settings.high_contrast)
            .label("High contrast")
            .on_toggle(Message::HighContrastChanged)
            .text_size(size),
        row![
            text("Font size").size(size),
            slider(0.8..=1.5, settings.font_scale, Message::FontScaleChanged).step(0.05),
            text(format!("{:.0}%", settings.font_scale * 100.0)).size(size),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        Space::new().height(20),
        button(text("Restore defaults").size(size))
            .on_press(Message::RestoreDefaults)
            .style(button::secondary),
    ]
    .spacing(6)
    .into()
}
