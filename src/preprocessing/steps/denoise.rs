use crate::error::PrepError;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;

/// Light Gaussian blur to suppress sensor and JPEG speckle
/// A sub-pixel sigma leaves stroke edges intact; `sigma <= 0` skips the pass
pub fn apply(gray: &GrayImage, sigma: f32) -> Result<GrayImage, PrepError> {
    if sigma <= 0.0 {
        return Ok(gray.clone());
    }
    if !sigma.is_finite() {
        return Err(PrepError::Compute(format!("invalid blur sigma {}", sigma)));
    }
    Ok(gaussian_blur_f32(gray, sigma))
}
