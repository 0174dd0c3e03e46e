use iced::widget::{button, checkbox, column, container, image, pick_list, row, slider, text, Space};
use iced::{Alignment, ContentFit, Element, Length};

use camguard_core::shared::constants::{MAX_INTENSITY, MIN_INTENSITY};

use crate::app::{scaled, Message, Phase};
use crate::settings::{Mode, Settings};

const PREVIEW_HEIGHT: f32 = 400.0;

pub struct StreamView<'a> {
    pub settings: &'a Settings,
    pub anonymize: bool,
    pub phase: Phase,
    pub preview: Option<&'a image::Handle>,
    pub persons: usize,
}

pub fn view(v: StreamView<'_>) -> Element<'_, Message> {
    let fs = v.settings.font_scale;

    let run_button = match v.phase {
        Phase::Idle => button(text("Start").size(scaled(13.0, fs)))
            .on_press(Message::Start)
            .style(button::primary),
        Phase::Loading | Phase::Streaming => button(text("Stop").size(scaled(13.0, fs)))
            .on_press(Message::Stop)
            .style(button::danger),
    }
    .padding([6, 18]);

    let controls = row![
        run_button,
        checkbox(v.anonymize)
            .label("Anonymize people")
            .on_toggle(Message::AnonymizeToggled)
            .text_size(scaled(13.0, fs)),
        pick_list(Mode::ALL, Some(v.settings.mode), Message::ModeChanged)
            .text_size(scaled(13.0, fs)),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    let label = match v.settings.mode {
        Mode::Pixelate => "Grid size",
        Mode::Blur => "Blur size",
        Mode::Blackbox => "Intensity",
    };
    let intensity = row![
        text(label).size(scaled(13.0, fs)),
        slider(
            MIN_INTENSITY..=MAX_INTENSITY,
            v.settings.intensity,
            Message::IntensityChanged
        ),
        text(v.settings.intensity.to_string()).size(scaled(13.0, fs)),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    let preview: Element<'_, Message> = match v.preview {
        Some(handle) => image(handle.clone())
            .width(Length::Fill)
            .height(PREVIEW_HEIGHT)
            .content_fit(ContentFit::Contain)
            .into(),
        None => container(text(placeholder(v.phase)).size(scaled(13.0, fs)))
            .width(Length::Fill)
            .height(PREVIEW_HEIGHT)
            .center_x(Length::Fill)
            .center_y(PREVIEW_HEIGHT)
            .style(container::bordered_box)
            .into(),
    };

    let people = if v.phase == Phase::Streaming && v.anonymize {
        format!("People in view: {}", v.persons)
    } else {
        String::new()
    };

    column![
        controls,
        Space::new().height(12),
        intensity,
        Space::new().height(12),
        preview,
        Space::new().height(6),
        text(people).size(scaled(12.0, fs)),
    ]
    .spacing(0)
    .into()
}

fn placeholder(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Press Start to open the camera",
        Phase::Loading => "Loading model and camera...",
        Phase::Streaming => "Waiting for the first frame...",
    }
}
