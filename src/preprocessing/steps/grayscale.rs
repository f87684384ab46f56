use crate::error::PrepError;
use image::{DynamicImage, GrayImage, Luma};

/// Rec. 709 luma weights, scaled by 10000
const LUMA_R: u32 = 2126;
const LUMA_G: u32 = 7152;
const LUMA_B: u32 = 722;
const LUMA_SCALE: u32 = 10_000;

/// Convert to a single luminance plane
///
/// Transparent regions are composited onto white paper first, so they end
/// up as background rather than ink. Reading the color channels and ignoring
/// alpha, as a browser canvas readback does, would turn fully transparent
/// pixels black and mark the border of every transparent region as ink.
pub fn apply(image: &DynamicImage) -> Result<GrayImage, PrepError> {
    let rgba = image.to_rgba8();

    let gray = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Luma([luma(flatten(r, a), flatten(g, a), flatten(b, a))])
    });

    Ok(gray)
}

/// Blend a channel over white by its alpha
fn flatten(channel: u8, alpha: u8) -> u32 {
    let (c, a) = (channel as u32, alpha as u32);
    (c * a + 255 * (255 - a) + 127) / 255
}

fn luma(r: u32, g: u32, b: u32) -> u8 {
    let weighted = LUMA_R * r + LUMA_G * g + LUMA_B * b;
    ((weighted + LUMA_SCALE / 2) / LUMA_SCALE).min(255) as u8
}
