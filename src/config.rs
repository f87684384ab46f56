use crate::error::PrepError;
use crate::Args;
use std::time::Duration;

/// Upper bound on the longer image side after resizing
pub const DEFAULT_MAX_SIZE: u32 = 1024;
/// Relative darkness margin a pixel needs below its local mean to count as ink
pub const DEFAULT_THRESHOLD_RATIO: f64 = 0.15;
/// Gaussian sigma of the denoise pass, in pixels
pub const DEFAULT_BLUR_SIGMA: f32 = 0.5;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Compressed format the binarized image is serialized to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
}

impl OutputFormat {
    /// Parse from a CLI/env string ("jpeg", "jpg", "png")
    pub fn parse(s: &str, jpeg_quality: u8) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg {
                quality: jpeg_quality,
            }),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Tunables of the preprocessing pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub max_size: u32,
    pub threshold_ratio: f64,
    pub blur_sigma: f32,
    pub output: OutputFormat,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
            blur_sigma: DEFAULT_BLUR_SIGMA,
            output: OutputFormat::default(),
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> Result<(), PrepError> {
        if self.max_size == 0 {
            return Err(PrepError::InvalidRequest(
                "max size must be at least 1 pixel".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.threshold_ratio) {
            return Err(PrepError::InvalidRequest(format!(
                "threshold ratio must be in [0, 1), got {}",
                self.threshold_ratio
            )));
        }
        if !self.blur_sigma.is_finite() {
            return Err(PrepError::InvalidRequest(
                "blur sigma must be finite".to_string(),
            ));
        }
        if let OutputFormat::Jpeg { quality } = self.output {
            if !(1..=100).contains(&quality) {
                return Err(PrepError::InvalidRequest(format!(
                    "jpeg quality must be in 1..=100, got {}",
                    quality
                )));
            }
        }
        Ok(())
    }
}

/// Scoring backend connection settings
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub url: String,
    pub timeout: Duration,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub pipeline: PipelineOptions,
    pub scoring: Option<ScoringConfig>,
}

impl TryFrom<Args> for Config {
    type Error = PrepError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let output = OutputFormat::parse(&args.output_format, args.jpeg_quality).ok_or_else(
            || {
                PrepError::InvalidRequest(format!(
                    "unsupported output format: {}",
                    args.output_format
                ))
            },
        )?;

        let pipeline = PipelineOptions {
            max_size: args.max_size,
            threshold_ratio: args.threshold,
            blur_sigma: args.blur_sigma,
            output,
        };
        pipeline.validate()?;

        let scoring = args
            .scoring_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| ScoringConfig {
                url,
                timeout: Duration::from_secs(args.scoring_timeout_secs),
            });

        Ok(Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            pipeline,
            scoring,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_are_valid() {
        let args = Args::parse_from(["handwriting-prep-server"]);
        let config = Config::try_from(args).unwrap();
        assert_eq!(config.pipeline, PipelineOptions::default());
        assert!(config.scoring.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let args = Args::parse_from(["handwriting-prep-server", "--threshold", "1.5"]);
        assert!(Config::try_from(args).is_err());
    }

    #[test]
    fn test_parses_png_output_and_scoring_url() {
        let args = Args::parse_from([
            "handwriting-prep-server",
            "--output-format",
            "PNG",
            "--scoring-url",
            "http://127.0.0.1:8080/api/analyze",
        ]);
        let config = Config::try_from(args).unwrap();
        assert_eq!(config.pipeline.output, OutputFormat::Png);
        assert_eq!(
            config.scoring.map(|s| s.url),
            Some("http://127.0.0.1:8080/api/analyze".to_string())
        );
    }

    #[test]
    fn test_rejects_zero_jpeg_quality() {
        let options = PipelineOptions {
            output: OutputFormat::Jpeg { quality: 0 },
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
