use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod preprocessing;
mod scoring;
mod server;

#[derive(Parser, Debug)]
#[command(name = "handwriting-prep-server")]
#[command(about = "Preprocesses handwriting photos into clean binarized images for scoring")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "PREP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PREP_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "PREP_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Longest side of the processed image in pixels (smaller images are not upscaled)
    #[arg(long, env = "PREP_MAX_SIZE", default_value_t = config::DEFAULT_MAX_SIZE)]
    pub max_size: u32,

    /// Darkness margin below the local mean for a pixel to count as ink
    #[arg(long, env = "PREP_THRESHOLD", default_value_t = config::DEFAULT_THRESHOLD_RATIO)]
    pub threshold: f64,

    /// Gaussian denoise sigma in pixels (0 disables denoising)
    #[arg(long, env = "PREP_BLUR_SIGMA", default_value_t = config::DEFAULT_BLUR_SIGMA)]
    pub blur_sigma: f32,

    /// Output image format (jpeg, png)
    #[arg(long, env = "PREP_OUTPUT_FORMAT", default_value = "jpeg")]
    pub output_format: String,

    /// JPEG quality (1-100) when the output format is jpeg
    #[arg(long, env = "PREP_JPEG_QUALITY", default_value_t = config::DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Scoring backend endpoint; /analyze is disabled when unset
    #[arg(long, env = "PREP_SCORING_URL")]
    pub scoring_url: Option<String>,

    /// Timeout for a single scoring request in seconds
    #[arg(long, env = "PREP_SCORING_TIMEOUT_SECS", default_value = "60")]
    pub scoring_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::try_from(args)?;

    tracing::info!(
        "Starting handwriting-prep-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
