use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Border thickness in pixels, grown outward from the box edge.
pub const BOX_THICKNESS: i32 = 2;

/// Pixel height of blob captions.
pub const LABEL_SCALE: f32 = 18.0;

/// Gap between a caption's baseline and the top edge of its box.
pub const LABEL_GAP: i32 = 10;

static LABEL_FONT: &[u8] = include_bytes!("../../../assets/FiraSans-Regular.ttf");

type RgbCanvas<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

fn rgb_canvas(frame: &mut Frame) -> Result<RgbCanvas<'_>, Box<dyn std::error::Error>> {
    if frame.channels() != 3 {
        return Err(format!("cannot draw on a {}-channel frame", frame.channels()).into());
    }
    let (width, height) = (frame.width(), frame.height());
    Ok(ImageBuffer::from_raw(width, height, frame.data_mut())
        .ok_or("Frame buffer does not match its dimensions")?)
}

/// Draws a hollow rectangle around every detection, in place.
///
/// Boxes are clipped by the canvas; zero-sized boxes are skipped.
pub fn draw_boxes(
    frame: &mut Frame,
    detections: &[Detection],
    color: [u8; 3],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut canvas = rgb_canvas(frame)?;

    for det in detections {
        let r = det.region;
        if r.width() <= 0 || r.height() <= 0 {
            continue;
        }
        for offset in 0..BOX_THICKNESS {
            let rect = Rect::at(r.x1 - offset, r.y1 - offset).of_size(
                (r.width() + offset * 2) as u32,
                (r.height() + offset * 2) as u32,
            );
            draw_hollow_rect_mut(&mut canvas, rect, Rgb(color));
        }
    }
    Ok(())
}

/// Writes `text` above every detection, baseline `LABEL_GAP` pixels over
/// the box's top-left corner. Captions running off the canvas are clipped.
pub fn draw_labels(
    frame: &mut Frame,
    detections: &[Detection],
    text: &str,
    color: [u8; 3],
) -> Result<(), Box<dyn std::error::Error>> {
    if detections.is_empty() {
        return Ok(());
    }
    let font = FontRef::try_from_slice(LABEL_FONT)?;
    let scale = PxScale::from(LABEL_SCALE);
    let ascent = font.as_scaled(scale).ascent().round() as i32;
    let mut canvas = rgb_canvas(frame)?;

    for det in detections {
        let r = det.region;
        if r.width() <= 0 || r.height() <= 0 {
            continue;
        }
        let top = r.y1 - LABEL_GAP - ascent;
        draw_text_mut(&mut canvas, Rgb(color), r.x1, top, scale, &font, text);
    }
    Ok(())
}
