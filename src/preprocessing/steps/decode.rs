use crate::error::PrepError;
use image::{DynamicImage, GenericImageView, ImageFormat};

/// Decode uploaded bytes into an image
///
/// The declared media type picks the decoder when it names a known format.
/// Unknown or wrong declarations fall back to sniffing the bytes.
pub fn apply(data: &[u8], mime_type: Option<&str>) -> Result<DynamicImage, PrepError> {
    if data.is_empty() {
        return Err(PrepError::Decode("empty upload".to_string()));
    }

    let declared = mime_type.and_then(ImageFormat::from_mime_type);

    let image = match declared {
        Some(format) => image::load_from_memory_with_format(data, format).or_else(|e| {
            tracing::warn!(
                "Declared {:?} did not decode ({}), sniffing format instead",
                format,
                e
            );
            image::load_from_memory(data)
        }),
        None => image::load_from_memory(data),
    }
    .map_err(|e| PrepError::Decode(e.to_string()))?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PrepError::Decode(format!(
            "degenerate image dimensions {}x{}",
            width, height
        )));
    }

    tracing::debug!(width, height, "Decoded image");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decodes_png_with_declared_type() {
        let bytes = png_bytes(ImageBuffer::from_pixel(12, 7, Rgb([10, 20, 30])));
        let img = apply(&bytes, Some("image/png")).unwrap();
        assert_eq!(img.dimensions(), (12, 7));
    }

    #[test]
    fn test_wrong_declared_type_falls_back_to_sniffing() {
        let bytes = png_bytes(ImageBuffer::from_pixel(5, 5, Rgb([0, 0, 0])));
        let img = apply(&bytes, Some("image/jpeg")).unwrap();
        assert_eq!(img.dimensions(), (5, 5));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = apply(b"definitely not an image", Some("image/png"));
        assert!(matches!(result, Err(PrepError::Decode(_))));
    }

    #[test]
    fn test_empty_upload_is_decode_error() {
        assert!(matches!(apply(&[], None), Err(PrepError::Decode(_))));
    }
}
