//! 8-bit HSV in the convention the calibration table is expressed in:
//! H is degrees halved into `0..=179`, S and V span `0..=255`.

use image::{Rgb, RgbImage};

/// An image whose three channels hold H, S and V instead of R, G and B.
#[derive(Debug, Clone)]
pub struct HsvImage(RgbImage);

impl HsvImage {
    pub fn from_rgb(frame: &RgbImage) -> Self {
        let mut out = RgbImage::new(frame.width(), frame.height());
        for (src, dst) in frame.pixels().zip(out.pixels_mut()) {
            *dst = Rgb(rgb_to_hsv(src.0));
        }
        Self(out)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        self.0.get_pixel(x, y).0
    }
}

pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 360 degrees halves to 180, which wraps back to red at 0.
    let h = ((h / 2.0).round() as u32 % 180) as u8;
    [h, s.round() as u8, max as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    }

    #[test]
    fn greys_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn orange_falls_in_default_orange_band() {
        let [h, s, v] = rgb_to_hsv([255, 120, 0]);
        assert!((4..=25).contains(&h), "hue {h}");
        assert_eq!((s, v), (255, 255));
    }

    #[test]
    fn near_red_magenta_wraps_below_180() {
        let [h, _, _] = rgb_to_hsv([255, 0, 1]);
        assert!(h < 180);
    }

    #[test]
    fn image_conversion_is_per_pixel() {
        let mut frame = RgbImage::new(2, 1);
        frame.put_pixel(1, 0, Rgb([0, 0, 255]));
        let hsv = HsvImage::from_rgb(&frame);
        assert_eq!(hsv.get(0, 0), [0, 0, 0]);
        assert_eq!(hsv.get(1, 0), [120, 255, 255]);
    }
}
