use crate::config::OutputFormat;
use crate::error::PrepError;
use crate::preprocessing::raster::{BinaryImage, EncodedImage};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// Serialize the binarized image for transport
///
/// JPEG carries the single luminance plane. PNG carries the expanded
/// R=G=B=sentinel form with an opaque alpha channel.
pub fn apply(binary: &BinaryImage, format: OutputFormat) -> Result<EncodedImage, PrepError> {
    match format {
        OutputFormat::Jpeg { .. } => encode_raw(
            binary.width(),
            binary.height(),
            binary.as_gray().as_raw(),
            ExtendedColorType::L8,
            format,
        ),
        OutputFormat::Png => {
            let rgba = binary.to_rgba();
            encode_raw(
                rgba.width(),
                rgba.height(),
                rgba.as_raw(),
                ExtendedColorType::Rgba8,
                format,
            )
        }
    }
}

/// Compress a raw buffer of `width * height * channels` samples
pub fn encode_raw(
    width: u32,
    height: u32,
    samples: &[u8],
    color: ExtendedColorType,
    format: OutputFormat,
) -> Result<EncodedImage, PrepError> {
    let channels = color.channel_count() as usize;
    let expected = width as usize * height as usize * channels;
    if width == 0 || height == 0 || samples.len() != expected {
        return Err(PrepError::Encode(format!(
            "buffer of {} samples does not match {}x{}x{}",
            samples.len(),
            width,
            height,
            channels
        )));
    }

    let mut bytes = Vec::new();
    let result = match format {
        OutputFormat::Jpeg { quality } => JpegEncoder::new_with_quality(&mut bytes, quality)
            .write_image(samples, width, height, color),
        OutputFormat::Png => PngEncoder::new(&mut bytes).write_image(samples, width, height, color),
    };
    result.map_err(|e| PrepError::Encode(e.to_string()))?;

    Ok(EncodedImage {
        bytes,
        mime_type: format.mime_type(),
        width,
        height,
    })
}
