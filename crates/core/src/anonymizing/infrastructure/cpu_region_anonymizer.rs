use std::cell::RefCell;

use crate::anonymizing::domain::anonymize_settings::{AnonymizeMode, AnonymizeSettings};
use crate::anonymizing::domain::frame_anonymizer::FrameAnonymizer;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::gaussian;
use super::pixelate::pixelate_in_place;

/// CPU anonymizer that pixelates, blurs or blacks out each detection box.
///
/// Boxes are clamped to the frame first and empty ones skipped. Scratch
/// buffers and the Gaussian kernel for the last-used size are cached across
/// calls.
pub struct CpuRegionAnonymizer {
    roi_buf: RefCell<Vec<u8>>,
    blur_temp: RefCell<Vec<f32>>,
    cell_sums: RefCell<Vec<u32>>,
    kernel: RefCell<Vec<f32>>,
}

impl CpuRegionAnonymizer {
    pub fn new() -> Self {
        Self {
            roi_buf: RefCell::new(Vec::new()),
            blur_temp: RefCell::new(Vec::new()),
            cell_sums: RefCell::new(Vec::new()),
            kernel: RefCell::new(Vec::new()),
        }
    }

    fn ensure_kernel(&self, kernel_size: usize) {
        let mut kernel = self.kernel.borrow_mut();
        if kernel.len() != kernel_size {
            *kernel = gaussian::gaussian_kernel_1d(kernel_size);
        }
    }
}

impl Default for CpuRegionAnonymizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnonymizer for CpuRegionAnonymizer {
    fn anonymize(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
        settings: &AnonymizeSettings,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if detections.is_empty() {
            return Ok(());
        }
        let fw = frame.width() as usize;
        let fh = frame.height();
        let channels = frame.channels() as usize;

        if settings.mode == AnonymizeMode::Blur {
            self.ensure_kernel(settings.blur_kernel_size());
        }

        let data = frame.data_mut();
        for det in detections {
            let Some(rect) = det.region.clamp(fw as u32, fh) else {
                continue;
            };

            if settings.mode == AnonymizeMode::Blackbox {
                for row in 0..rect.h {
                    let offset = ((rect.y + row) * fw + rect.x) * channels;
                    data[offset..offset + rect.w * channels].fill(0);
                }
                continue;
            }

            let mut roi = self.roi_buf.borrow_mut();
            gaussian::extract_roi(data, fw, channels, rect, &mut roi);

            match settings.mode {
                AnonymizeMode::Pixelate => pixelate_in_place(
                    &mut roi,
                    rect.w,
                    rect.h,
                    channels,
                    settings.intensity() as usize,
                    &mut self.cell_sums.borrow_mut(),
                ),
                AnonymizeMode::Blur => gaussian::separable_gaussian_blur_with_kernel(
                    &mut roi,
                    rect.w,
                    rect.h,
                    channels,
                    &self.kernel.borrow(),
                    &mut self.blur_temp.borrow_mut(),
                ),
                AnonymizeMode::Blackbox => {}
            }

            gaussian::write_roi_back(data, &roi, fw, channels, rect);
        }

        Ok(())
    }
}
