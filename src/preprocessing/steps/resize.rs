use crate::error::PrepError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Dimensions that fit `width` x `height` inside a `max_size` square
///
/// The longer side becomes `max_size` and the shorter one is scaled by the
/// same ratio, rounded, never below one pixel. Images that already fit are
/// left at their own size; nothing is upscaled.
pub fn target_dimensions(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_size {
        return (width, height);
    }

    let ratio = max_size as f64 / longer as f64;
    let scale = |side: u32| -> u32 {
        if side == longer {
            max_size
        } else {
            ((side as f64 * ratio).round() as u32).clamp(1, max_size)
        }
    };

    (scale(width), scale(height))
}

/// Downsample so the longer side does not exceed `max_size`
pub fn apply(image: DynamicImage, max_size: u32) -> Result<DynamicImage, PrepError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PrepError::Decode(format!(
            "cannot resize degenerate image {}x{}",
            width, height
        )));
    }

    let (new_width, new_height) = target_dimensions(width, height, max_size);
    if (new_width, new_height) == (width, height) {
        return Ok(image);
    }

    tracing::debug!(
        "Resizing {}x{} -> {}x{}",
        width,
        height,
        new_width,
        new_height
    );
    Ok(image.resize_exact(new_width, new_height, FilterType::Lanczos3))
}
