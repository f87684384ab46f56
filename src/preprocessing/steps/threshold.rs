use super::integral::IntegralTable;
use crate::error::PrepError;
use crate::preprocessing::raster::{BinaryImage, INK, PAPER};
use image::{GrayImage, Luma};

/// Local windows span this fraction of the image width
const WINDOW_DIVISOR: u32 = 16;

/// Side length of the local window for an image `width` pixels wide
pub fn window_size(width: u32) -> u32 {
    (width / WINDOW_DIVISOR).max(1)
}

/// Adaptive (Bradley-Roth) binarization
///
/// A pixel is ink when it is darker than `mean * (1 - ratio)`, where `mean`
/// is the average luminance of the window centred on it, clamped to the
/// image. Uneven lighting shifts the local mean along with the pixel, so a
/// shadowed page still separates cleanly. Uniform regions never produce ink.
pub fn apply(
    gray: &GrayImage,
    table: &IntegralTable,
    ratio: f64,
) -> Result<BinaryImage, PrepError> {
    let (width, height) = gray.dimensions();
    if (table.width(), table.height()) != (width, height) {
        return Err(PrepError::Compute(format!(
            "integral table is {}x{} but image is {}x{}",
            table.width(),
            table.height(),
            width,
            height
        )));
    }
    if width == 0 || height == 0 {
        return Err(PrepError::Compute(format!(
            "cannot threshold empty image {}x{}",
            width, height
        )));
    }

    let half = window_size(width) / 2;
    let factor = 1.0 - ratio;

    let binary = GrayImage::from_fn(width, height, |x, y| {
        let x1 = x.saturating_sub(half);
        let y1 = y.saturating_sub(half);
        let x2 = (x + half).min(width - 1);
        let y2 = (y + half).min(height - 1);

        // Never zero: the window always holds at least the pixel itself
        let count = ((x2 - x1 + 1) as u64 * (y2 - y1 + 1) as u64) as f64;
        let mean = table.window_sum(x1, y1, x2, y2) as f64 / count;

        let pixel = gray.get_pixel(x, y).0[0] as f64;
        if pixel < mean * factor {
            Luma([INK])
        } else {
            Luma([PAPER])
        }
    });

    BinaryImage::from_gray(binary)
}
