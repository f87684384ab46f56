use crate::error::PrepError;
use base64::{engine::general_purpose, Engine as _};
use image::{GrayImage, Rgba, RgbaImage};

/// Luminance of a pixel classified as ink
pub const INK: u8 = 0;
/// Luminance of a pixel classified as paper
pub const PAPER: u8 = 255;

/// Single-channel image whose every sample is either [`INK`] or [`PAPER`]
#[derive(Debug, Clone)]
pub struct BinaryImage {
    pixels: GrayImage,
}

impl BinaryImage {
    /// Wrap a luminance buffer, rejecting any intermediate value
    pub fn from_gray(pixels: GrayImage) -> Result<Self, PrepError> {
        if let Some(value) = pixels.as_raw().iter().find(|&&v| v != INK && v != PAPER) {
            return Err(PrepError::Compute(format!(
                "binary image contains non-sentinel value {}",
                value
            )));
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    #[cfg(test)]
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] == INK
    }

    /// Expand to four channels: R=G=B=sentinel, fully opaque
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            let v = self.pixels.get_pixel(x, y).0[0];
            Rgba([v, v, v, 255])
        })
    }

    /// Fraction of pixels classified as ink, 0.0 for an empty image
    pub fn ink_ratio(&self) -> f64 {
        let total = self.pixels.as_raw().len();
        if total == 0 {
            return 0.0;
        }
        let ink = self.pixels.as_raw().iter().filter(|&&v| v == INK).count();
        ink as f64 / total as f64
    }
}

/// Compressed image ready for transport
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Standard base64 of the compressed bytes, without a `data:` URI prefix
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_from_gray_rejects_intermediate_values() {
        let mut img = GrayImage::from_pixel(4, 4, Luma([PAPER]));
        img.put_pixel(1, 1, Luma([128]));
        assert!(matches!(
            BinaryImage::from_gray(img),
            Err(PrepError::Compute(_))
        ));
    }

    #[test]
    fn test_ink_ratio_counts_ink_pixels() {
        let mut img = GrayImage::from_pixel(4, 4, Luma([PAPER]));
        for x in 0..4 {
            img.put_pixel(x, 0, Luma([INK]));
        }
        let binary = BinaryImage::from_gray(img).unwrap();
        assert!((binary.ink_ratio() - 0.25).abs() < 1e-9);
        assert!(binary.is_ink(2, 0));
        assert!(!binary.is_ink(2, 1));
    }

    #[test]
    fn test_to_rgba_repeats_sentinel_with_full_alpha() {
        let img = GrayImage::from_fn(6, 5, |x, y| {
            if (x + y) % 3 == 0 {
                Luma([INK])
            } else {
                Luma([PAPER])
            }
        });
        let binary = BinaryImage::from_gray(img).unwrap();
        let rgba = binary.to_rgba();

        assert_eq!(rgba.dimensions(), (6, 5));
        for (x, y, p) in rgba.enumerate_pixels() {
            let [r, g, b, a] = p.0;
            assert!(r == INK || r == PAPER);
            assert_eq!((g, b, a), (r, r, 255), "pixel ({}, {})", x, y);
            assert_eq!(r == INK, binary.is_ink(x, y));
        }
    }

    #[test]
    fn test_base64_has_no_data_uri_prefix() {
        let encoded = EncodedImage {
            bytes: vec![0xff, 0xd8, 0xff],
            mime_type: "image/jpeg",
            width: 1,
            height: 1,
        };
        let b64 = encoded.to_base64();
        assert_eq!(b64, "/9j/");
        assert!(!b64.starts_with("data:"));
    }
}
