use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use iced::widget::{button, column, container, image, row, scrollable, text};
use iced::{window, Element, Length, Subscription, Task, Theme};

use camguard_core::capture::domain::capture_device::CameraConfig;
use camguard_core::pipeline::pipeline_logger::NullPipelineLogger;
use camguard_core::pipeline::stream_controls::StreamControls;
use camguard_core::shared::frame::Frame;

use crate::settings::{Appearance, Mode, Settings};
use crate::tabs;
use crate::theme;
use crate::workers::session_loader::{self, LoaderMessage, LoaderParams, StreamSession};

/// Roughly 30 redraws per second while a stream is active.
const TICK_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Stream,
    Settings,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Stream, Tab::Settings];

    fn label(self) -> &'static str {
        match self {
            Tab::Stream => "Stream",
            Tab::Settings => "Settings",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    Start,
    Stop,
    Tick,
    AnonymizeToggled(bool),
    ModeChanged(Mode),
    IntensityChanged(u32),
    IntervalChanged(u32),
    ConfidenceChanged(u32),
    CameraIndexChanged(u32),
    ModelPathChanged(String),
    ModelUrlChanged(String),
    RestoreDefaults,
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
    PollSystemTheme,
    CloseRequested(window::Id),
}

/// Where the stream is in its lifecycle, as shown to the tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Streaming,
}

enum StreamState {
    Idle,
    Loading {
        rx: Receiver<LoaderMessage>,
        cancelled: Arc<AtomicBool>,
    },
    Streaming(StreamSession),
}

pub struct App {
    active_tab: Tab,
    pub settings: Settings,
    controls: StreamControls,
    state: StreamState,
    preview: Option<image::Handle>,
    status: String,
    last_index: Option<usize>,
    persons: usize,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let controls = controls_from(&settings);
        (
            Self {
                active_tab: Tab::Stream,
                settings,
                controls,
                state: StreamState::Idle,
                preview: None,
                status: "Idle".to_string(),
                last_index: None,
                persons: 0,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::Start => self.start_stream(),
            Message::Stop => {
                self.stop_stream();
                self.status = "Stopped".to_string();
            }
            Message::Tick => {
                self.poll_loader();
                self.poll_frame();
            }
            Message::AnonymizeToggled(enabled) => {
                self.controls.anonymize = enabled;
            }
            Message::ModeChanged(mode) => {
                self.settings.mode = mode;
                self.controls.settings.mode = mode.into();
                self.settings.save();
            }
            Message::IntensityChanged(val) => {
                self.settings.intensity = val;
                self.controls.settings.set_intensity(val);
                self.settings.save();
            }
            Message::IntervalChanged(val) => {
                self.settings.interval = val.max(1);
                self.settings.save();
            }
            Message::ConfidenceChanged(val) => {
                self.settings.confidence = val;
                self.settings.save();
            }
            Message::CameraIndexChanged(val) => {
                self.settings.camera_index = val;
                self.settings.save();
            }
            Message::ModelPathChanged(path) => {
                self.settings.model_path = non_empty(path).map(PathBuf::from);
                self.settings.save();
            }
            Message::ModelUrlChanged(url) => {
                self.settings.model_url = non_empty(url);
                self.settings.save();
            }
            Message::RestoreDefaults => {
                let defaults = Settings::default();
                self.settings = Settings {
                    appearance: self.settings.appearance,
                    high_contrast: self.settings.high_contrast,
                    font_scale: self.settings.font_scale,
                    ..defaults
                };
                self.controls = StreamControls {
                    running: self.controls.running,
                    ..controls_from(&self.settings)
                };
                self.settings.save();
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
            Message::PollSystemTheme => {
                // Theme is resolved fresh in theme() on every render,
                // so just requesting a redraw is enough.
            }
            Message::CloseRequested(_) => {
                self.stop_stream();
                self.settings.save();
                return iced::exit();
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;

        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let label = text(tab.label()).size(scaled(13.0, fs));
                let btn = button(label)
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        let content: Element<'_, Message> = match self.active_tab {
            Tab::Stream => tabs::stream_tab::view(tabs::stream_tab::StreamView {
                settings: &self.settings,
                anonymize: self.controls.anonymize,
                phase: self.phase(),
                preview: self.preview.as_ref(),
                persons: self.persons,
            }),
            Tab::Settings => tabs::settings_tab::view(&self.settings, self.phase()),
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        let status_line = container(
            text(&self.status)
                .size(scaled(11.0, fs))
                .style(|theme: &Theme| text::Style {
                    color: Some(theme::muted_color(theme)),
                }),
        )
        .width(Length::Fill)
        .padding([4, 16]);

        column![tab_bar, tab_content, status_line]
            .spacing(0)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let mut subs = vec![window::close_requests().map(Message::CloseRequested)];
        if self.phase() != Phase::Idle {
            subs.push(iced::time::every(TICK_INTERVAL).map(|_| Message::Tick));
        }
        if self.settings.appearance == Appearance::System {
            subs.push(iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme));
        }
        Subscription::batch(subs)
    }

    fn phase(&self) -> Phase {
        match self.state {
            StreamState::Idle => Phase::Idle,
            StreamState::Loading { .. } => Phase::Loading,
            StreamState::Streaming(_) => Phase::Streaming,
        }
    }

    fn start_stream(&mut self) {
        if self.phase() != Phase::Idle {
            return;
        }
        let params = LoaderParams {
            camera: CameraConfig {
                index: self.settings.camera_index,
                ..CameraConfig::default()
            },
            model_path: self.settings.model_path.clone(),
            model_url: self.settings.model_url.clone(),
            confidence: self.settings.confidence_fraction(),
            interval: self.settings.interval.max(1) as usize,
        };
        let (rx, cancelled) = session_loader::spawn(params);
        self.state = StreamState::Loading { rx, cancelled };
        self.controls.running = true;
        self.status = "Starting camera...".to_string();
    }

    /// Stops loading or streaming and releases the camera.
    fn stop_stream(&mut self) {
        match std::mem::replace(&mut self.state, StreamState::Idle) {
            StreamState::Loading { cancelled, .. } => cancelled.store(true, Ordering::Relaxed),
            StreamState::Streaming(mut session) => session.source.release(),
            StreamState::Idle => {}
        }
        self.controls.running = false;
        self.last_index = None;
        self.preview = None;
        self.persons = 0;
    }

    fn poll_loader(&mut self) {
        let StreamState::Loading { rx, .. } = &self.state else {
            return;
        };

        let mut outcome = None;
        while let Ok(msg) = rx.try_recv() {
            match msg {
                LoaderMessage::DownloadProgress(done, total) => {
                    self.status = download_status(done, total);
                }
                LoaderMessage::Ready(session) => {
                    outcome = Some(Ok(session));
                    break;
                }
                LoaderMessage::Error(e) => {
                    outcome = Some(Err(e));
                    break;
                }
                LoaderMessage::Cancelled => {}
            }
        }

        match outcome {
            Some(Ok(session)) => {
                self.status = format!(
                    "Streaming {}x{} (detection every {} frames)",
                    session.metadata.width,
                    session.metadata.height,
                    session.processor.interval()
                );
                self.state = StreamState::Streaming(session);
            }
            Some(Err(e)) => {
                log::error!("Could not start stream: {e}");
                self.state = StreamState::Idle;
                self.controls.running = false;
                self.status = format!("Error: {e}");
            }
            None => {}
        }
    }

    fn poll_frame(&mut self) {
        if !self.controls.running {
            return;
        }
        let StreamState::Streaming(session) = &mut self.state else {
            return;
        };
        let Some(frame) = session.source.read() else {
            return;
        };
        if self.last_index == Some(frame.index()) {
            return;
        }
        self.last_index = Some(frame.index());

        match session
            .processor
            .process(frame, &self.controls, &mut NullPipelineLogger)
        {
            Ok(processed) => {
                self.persons = processed.persons.len();
                self.preview = Some(to_handle(&processed.frame));
            }
            Err(e) => {
                log::error!("Processing failed: {e}");
                self.stop_stream();
                self.status = format!("Error: {e}");
            }
        }
    }
}

fn controls_from(settings: &Settings) -> StreamControls {
    StreamControls {
        running: false,
        ..StreamControls::new(settings.mode.into(), settings.intensity)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn download_status(done: u64, total: u64) -> String {
    if total > 0 {
        format!(
            "Downloading person detection model... {}%",
            done * 100 / total
        )
    } else {
        format!("Downloading person detection model... {done} bytes")
    }
}

fn to_handle(frame: &Frame) -> image::Handle {
    image::Handle::from_rgba(frame.width(), frame.height(), frame.to_rgba())
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camguard_core::anonymizing::domain::anonymize_settings::AnonymizeMode;

    #[test]
    fn test_controls_follow_settings_but_start_stopped() {
        let settings = Settings {
            mode: Mode::Blackbox,
            intensity: 3,
            ..Settings::default()
        };
        let controls = controls_from(&settings);
        assert!(!controls.running);
        assert!(controls.anonymize);
        assert_eq!(controls.settings.mode, AnonymizeMode::Blackbox);
        assert_eq!(controls.settings.intensity(), 5);
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(
            non_empty(" /tmp/m.onnx ".to_string()),
            Some("/tmp/m.onnx".to_string())
        );
    }

    #[test]
    fn test_download_status() {
        assert_eq!(
            download_status(50, 200),
            "Downloading person detection model... 25%"
        );
        assert_eq!(
            download_status(1024, 0),
            "Downloading person detection model... 1024 bytes"
        );
    }

    #[test]
    fn test_scaled_rounds() {
        assert_eq!(scaled(13.0, 1.0), 13.0);
        assert_eq!(scaled(13.0, 1.5), 20.0);
    }
}
