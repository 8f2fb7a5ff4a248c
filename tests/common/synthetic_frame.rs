use image::{Rgb, RgbImage};

pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const ORANGE: Rgb<u8> = Rgb([255, 120, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Raw camera frame size the default crop is laid out for.
pub const RAW_WIDTH: u32 = 640;
pub const RAW_HEIGHT: u32 = 480;

/// Default crop window on the mirrored frame.
const CROP_X: u32 = 116;
const CROP_Y: u32 = 0;
pub const CROP_WIDTH: u32 = 314;
pub const CROP_HEIGHT: u32 = 352;

/// In-crop x positions with room for a float and its blur halo.
pub const ORANGE_X: u32 = 60;
pub const BLUE_X: u32 = 175;
pub const GREEN_X: u32 = 270;

pub fn black_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::new(width, height)
}

/// Paint a filled disc; pixels outside the image are skipped.
pub fn paint_disc(img: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
    let r2 = radius * radius;
    for y in (cy - radius).max(0)..=(cy + radius).min(img.height() as i64 - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(img.width() as i64 - 1) {
            if (x - cx).pow(2) + (y - cy).pow(2) <= r2 {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Raw-frame coordinates that land on `(x, y)` after mirroring and the
/// default crop.
pub fn raw_point_for_cropped(x: u32, y: u32) -> (i64, i64) {
    assert!(
        x < CROP_WIDTH && y < CROP_HEIGHT,
        "({x}, {y}) lies outside the {CROP_WIDTH}x{CROP_HEIGHT} crop"
    );
    let mirrored_x = x + CROP_X;
    let raw_x = RAW_WIDTH - 1 - mirrored_x;
    (raw_x as i64, (y + CROP_Y) as i64)
}

/// A raw 640x480 frame with floats placed in cropped coordinates.
pub fn raw_frame_with(floats: &[(u32, u32, Rgb<u8>)]) -> RgbImage {
    let mut img = black_frame(RAW_WIDTH, RAW_HEIGHT);
    for &(x, y, color) in floats {
        let (rx, ry) = raw_point_for_cropped(x, y);
        paint_disc(&mut img, rx, ry, 15, color);
    }
    img
}
