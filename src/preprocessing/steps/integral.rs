use crate::error::PrepError;
use image::GrayImage;

/// Summed-area table over a luminance plane
///
/// `at(x, y)` is the sum of every sample in the rectangle `(0, 0)..=(x, y)`.
/// Sums are `i64`, wide enough for any `u32 x u32` image of 8-bit samples.
#[derive(Debug, Clone)]
pub struct IntegralTable {
    width: u32,
    height: u32,
    sums: Vec<i64>,
}

impl IntegralTable {
    /// Build the table in a single row-major pass
    pub fn build(gray: &GrayImage) -> Result<Self, PrepError> {
        let (width, height) = gray.dimensions();
        let (w, h) = (width as usize, height as usize);
        let samples = gray.as_raw();

        if samples.len() != w * h {
            return Err(PrepError::Compute(format!(
                "luminance plane has {} samples, expected {}x{}",
                samples.len(),
                width,
                height
            )));
        }

        let mut sums = vec![0i64; w * h];
        for y in 0..h {
            let mut row_sum = 0i64;
            for x in 0..w {
                row_sum += samples[y * w + x] as i64;
                let above = if y == 0 { 0 } else { sums[(y - 1) * w + x] };
                sums[y * w + x] = row_sum + above;
            }
        }

        Ok(Self {
            width,
            height,
            sums,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Prefix sum at `(x, y)`, zero when either coordinate is negative
    #[inline]
    pub fn at(&self, x: i64, y: i64) -> i64 {
        if x < 0 || y < 0 {
            return 0;
        }
        debug_assert!(x < self.width as i64 && y < self.height as i64);
        self.sums[y as usize * self.width as usize + x as usize]
    }

    /// Sum over the inclusive rectangle `(x1, y1)..=(x2, y2)`
    #[inline]
    pub fn window_sum(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> i64 {
        let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
        self.at(x2, y2) - self.at(x2, y1 - 1) - self.at(x1 - 1, y2) + self.at(x1 - 1, y1 - 1)
    }
}

/// Build the integral table for the thresholding step
pub fn apply(gray: &GrayImage) -> Result<IntegralTable, PrepError> {
    IntegralTable::build(gray)
}
