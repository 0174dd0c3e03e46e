use std::sync::Arc;
use std::time::Duration;

use iced::keyboard::{self, key, Key};
use iced::widget::{container, image, text};
use iced::{Element, Length, Subscription, Task};

use camguard_core::shared::frame::Frame;
use camguard_core::video::infrastructure::live_view_sink::LiveFeed;

/// How often the window checks the feed for a new frame.
const POLL_INTERVAL: Duration = Duration::from_millis(15);

#[derive(Debug, Clone)]
enum Message {
    Poll,
    Quit,
}

/// On-screen view of a running pipeline.
///
/// Closes on `q`, Escape or the window's close button, and on its own
/// once the pipeline finishes the feed.
struct LiveWindow {
    feed: Arc<LiveFeed>,
    preview: Option<image::Handle>,
    shown: Option<usize>,
}

impl LiveWindow {
    fn new(feed: Arc<LiveFeed>) -> Self {
        Self {
            feed,
            preview: None,
            shown: None,
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Poll => {
                if self.feed.is_finished() {
                    return iced::exit();
                }
                if let Some(frame) = self.feed.latest() {
                    if self.shown != Some(frame.index()) {
                        self.shown = Some(frame.index());
                        self.preview = Some(to_handle(&frame));
                    }
                }
                Task::none()
            }
            Message::Quit => iced::exit(),
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let body: Element<'_, Message> = match &self.preview {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .content_fit(iced::ContentFit::Contain)
                .into(),
            None => text("Waiting for camera...").into(),
        };
        container(body)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(POLL_INTERVAL).map(|_| Message::Poll),
            keyboard::listen().filter_map(quit_request),
        ])
    }
}

fn quit_request(event: keyboard::Event) -> Option<Message> {
    match event {
        keyboard::Event::KeyPressed { key, .. } if is_quit_key(&key) => Some(Message::Quit),
        _ => None,
    }
}

fn is_quit_key(key: &Key) -> bool {
    match key.as_ref() {
        Key::Character(c) => c.eq_ignore_ascii_case("q"),
        Key::Named(key::Named::Escape) => true,
        _ => false,
    }
}

fn to_handle(frame: &Frame) -> image::Handle {
    image::Handle::from_rgba(frame.width(), frame.height(), frame.to_rgba())
}

/// Shows `feed` in a window until the user quits or the feed finishes.
///
/// Blocks the calling thread, which must be the main thread.
pub fn show(title: &'static str, feed: Arc<LiveFeed>, width: u32, height: u32) -> iced::Result {
    iced::application(
        move || LiveWindow::new(feed.clone()),
        LiveWindow::update,
        LiveWindow::view,
    )
    .title(title)
    .subscription(LiveWindow::subscription)
    .window(iced::window::Settings {
        size: iced::Size::new(width as f32, height as f32),
        ..Default::default()
    })
    .run()
}
