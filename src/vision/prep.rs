use image::{imageops, RgbImage};

use crate::settings::FrameSettings;

/// Mirror, crop and smooth a raw capture before color conversion.
#[derive(Debug, Clone)]
pub struct FramePrep {
    settings: FrameSettings,
}

impl FramePrep {
    pub fn new(settings: FrameSettings) -> Self {
        Self { settings }
    }

    pub fn prepare(&self, frame: &RgbImage) -> RgbImage {
        let mirrored = if self.settings.mirror {
            imageops::flip_horizontal(frame)
        } else {
            frame.clone()
        };

        // crop_imm clamps the region to the frame, so a short capture yields a
        // smaller (possibly empty) image instead of panicking.
        let cropped = match self.settings.crop {
            Some(region) => {
                imageops::crop_imm(&mirrored, region.x, region.y, region.width, region.height)
                    .to_image()
            }
            None => mirrored,
        };

        if self.settings.blur_sigma > 0.0 && cropped.width() > 0 && cropped.height() > 0 {
            imageproc::filter::gaussian_blur_f32(&cropped, self.settings.blur_sigma)
        } else {
            cropped
        }
    }
}
