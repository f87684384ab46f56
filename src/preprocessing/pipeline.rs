use crate::config::PipelineOptions;
use crate::error::PrepError;
use image::GenericImageView;
use serde::Serialize;
use std::time::Instant;

use super::raster::EncodedImage;
use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Encoded binary image (not serialized)
    #[serde(skip)]
    pub image: EncodedImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
    /// Fraction of output pixels classified as ink
    pub ink_ratio: f64,
    pub original_width: u32,
    pub original_height: u32,
}

/// Decode -> resize -> grayscale -> denoise -> integral -> threshold -> encode
///
/// Every step reads its input and returns a freshly owned output; a failure
/// anywhere aborts the whole run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Turn uploaded image bytes into an encoded, binarized image
    pub fn process(
        &self,
        data: &[u8],
        mime_type: Option<&str>,
    ) -> Result<PreprocessingResult, PrepError> {
        let start = Instant::now();
        let mut timings = Vec::new();
        let opts = &self.options;

        let decoded = run_step("decode", &mut timings, || {
            steps::decode::apply(data, mime_type)
        })?;
        let (original_width, original_height) = decoded.dimensions();

        let resized = run_step("resize", &mut timings, || {
            steps::resize::apply(decoded, opts.max_size)
        })?;
        let gray = run_step("grayscale", &mut timings, || {
            steps::grayscale::apply(&resized)
        })?;
        drop(resized);

        let denoised = run_step("denoise", &mut timings, || {
            steps::denoise::apply(&gray, opts.blur_sigma)
        })?;
        let table = run_step("integral", &mut timings, || {
            steps::integral::apply(&denoised)
        })?;
        let binary = run_step("threshold", &mut timings, || {
            steps::threshold::apply(&denoised, &table, opts.threshold_ratio)
        })?;
        let encoded = run_step("encode", &mut timings, || {
            steps::encode::apply(&binary, opts.output)
        })?;

        let result = PreprocessingResult {
            image: encoded,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
            ink_ratio: binary.ink_ratio(),
            original_width,
            original_height,
        };

        tracing::debug!(
            "Preprocessed {}x{} -> {}x{} in {}ms (ink {:.3})",
            original_width,
            original_height,
            result.image.width,
            result.image.height,
            result.total_time_ms,
            result.ink_ratio
        );

        Ok(result)
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> Result<T, PrepError>
where
    F: FnOnce() -> Result<T, PrepError>,
{
    let step_start = Instant::now();
    let result = step_fn().map_err(|e| {
        tracing::debug!("Step {} failed: {}", name, e);
        e
    })?;
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(img: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn lossless() -> Pipeline {
        Pipeline::new(PipelineOptions {
            output: OutputFormat::Png,
            ..Default::default()
        })
    }

    fn decode_output(result: &PreprocessingResult) -> GrayImage {
        image::load_from_memory(&result.image.bytes)
            .unwrap()
            .to_luma8()
    }

    #[test]
    fn test_pipeline_records_every_step() {
        let bytes = png(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            30,
            Rgb([200, 190, 180]),
        )));
        let result = Pipeline::new(PipelineOptions::default())
            .process(&bytes, Some("image/png"))
            .unwrap();

        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["decode", "resize", "grayscale", "denoise", "integral", "threshold", "encode"]
        );
        assert_eq!(result.image.mime_type, "image/jpeg");
        assert_eq!((result.original_width, result.original_height), (40, 30));
    }

    #[test]
    fn test_large_photo_is_downscaled() {
        let bytes = png(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            2000,
            1000,
            Luma([230]),
        )));
        let result = lossless().process(&bytes, None).unwrap();
        assert_eq!((result.image.width, result.image.height), (1024, 512));
        assert_eq!(result.ink_ratio, 0.0);
    }

    #[test]
    fn test_black_row_survives_full_pipeline() {
        let mut img = GrayImage::from_pixel(64, 64, Luma([255]));
        for x in 0..64 {
            img.put_pixel(x, 32, Luma([0]));
        }
        let bytes = png(DynamicImage::ImageLuma8(img));

        let result = lossless().process(&bytes, Some("image/png")).unwrap();
        let out = decode_output(&result);

        for (x, y, p) in out.enumerate_pixels() {
            let expected = if y == 32 { 0 } else { 255 };
            assert_eq!(p.0[0], expected, "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn test_output_is_strictly_binary() {
        let img = RgbImage::from_fn(120, 80, |x, y| {
            Rgb([(x * 2) as u8, (y * 3) as u8, ((x + y) % 256) as u8])
        });
        let bytes = png(DynamicImage::ImageRgb8(img));

        let result = lossless().process(&bytes, None).unwrap();
        let out = decode_output(&result);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_undecodable_input_aborts() {
        let result = lossless().process(b"\x89PNG but not really", Some("image/png"));
        assert!(matches!(result, Err(PrepError::Decode(_))));
    }
}
