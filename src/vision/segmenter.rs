use image::{GrayImage, Luma};
use imageproc::{distance_transform::Norm, morphology};

use crate::channels::HsvRange;
use crate::vision::hsv::HsvImage;

pub const MASK_ON: u8 = 255;

/// Thresholds an HSV frame into a binary mask and removes speckle.
///
/// Cleanup is an opening followed by a closing, each equivalent to two
/// passes of a 5x5 square: chaining two 5x5 erosions is one 9x9 erosion,
/// which is a chessboard-distance radius of 4.
#[derive(Debug, Clone, Copy)]
pub struct ColorSegmenter {
    cleanup_radius: u8,
}

impl Default for ColorSegmenter {
    fn default() -> Self {
        Self::with_kernel(5, 2)
    }
}

impl ColorSegmenter {
    /// `kernel` is the side of the square structuring element, `iterations`
    /// how many times it is applied in each of opening and closing.
    pub fn with_kernel(kernel: u8, iterations: u8) -> Self {
        Self {
            cleanup_radius: (kernel / 2).saturating_mul(iterations),
        }
    }

    pub fn threshold(&self, hsv: &HsvImage, range: &HsvRange) -> GrayImage {
        GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
            if range.contains(hsv.get(x, y)) {
                Luma([MASK_ON])
            } else {
                Luma([0])
            }
        })
    }

    pub fn segment(&self, hsv: &HsvImage, range: &HsvRange) -> GrayImage {
        let raw = self.threshold(hsv, range);
        if self.cleanup_radius == 0 || raw.width() == 0 || raw.height() == 0 {
            return raw;
        }
        let opened = morphology::open(&raw, Norm::LInf, self.cleanup_radius);
        morphology::close(&opened, Norm::LInf, self.cleanup_radius)
    }
}
