use crate::config::{Config, PipelineOptions};
use crate::error::PrepError;
use crate::preprocessing::{Pipeline, PreprocessingResult};
use crate::scoring::{HandwritingAnalysis, HttpScoringService, ScoringService};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub scoring: Option<Arc<dyn ScoringService>>,
    pub config: Arc<Config>,
}

/// Preprocessing response
#[derive(Serialize)]
pub struct PreprocessResponse {
    /// Base64 of the encoded image, no data URI prefix
    pub image: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// Fraction of output pixels classified as ink
    pub ink_ratio: f64,
    pub processing_time_ms: u64,
    pub preprocessing: PreprocessingResult,
}

/// Scoring response
#[derive(Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub analysis: HandwritingAnalysis,
    pub processing_time_ms: u64,
    pub preprocessing: PreprocessingResult,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Pipeline settings as reported by /info
#[derive(Serialize)]
pub struct PipelineInfo {
    pub max_size: u32,
    pub threshold_ratio: f64,
    pub blur_sigma: f32,
    pub output_mime_type: String,
}

impl From<&PipelineOptions> for PipelineInfo {
    fn from(options: &PipelineOptions) -> Self {
        Self {
            max_size: options.max_size,
            threshold_ratio: options.threshold_ratio,
            blur_sigma: options.blur_sigma,
            output_mime_type: options.output.mime_type().to_string(),
        }
    }
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub max_file_size_bytes: usize,
    pub pipeline: PipelineInfo,
    pub scoring_backend: Option<String>,
}

/// Uploaded file pulled out of a multipart form
struct Upload {
    data: Bytes,
    content_type: Option<String>,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let scoring = config
        .scoring
        .as_ref()
        .map(|s| Arc::new(HttpScoringService::new(s)) as Arc<dyn ScoringService>);
    if scoring.is_none() {
        tracing::warn!("No scoring backend configured, /analyze is disabled");
    }

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(config.pipeline)),
        scoring,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Build the router with all routes and layers
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/preprocess", post(handle_preprocess))
        .route("/analyze", post(handle_analyze))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle preprocessing requests
async fn handle_preprocess(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PreprocessResponse>, PrepError> {
    let start = Instant::now();
    let upload = read_upload(multipart, state.config.max_file_size).await?;

    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || {
        pipeline.process(&upload.data, upload.content_type.as_deref())
    })
    .await
    .map_err(|e| PrepError::Internal(format!("Preprocessing task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Preprocessed {}x{} -> {}x{} in {}ms, ink ratio: {:.3}",
        result.original_width,
        result.original_height,
        result.image.width,
        result.image.height,
        processing_time_ms,
        result.ink_ratio
    );

    Ok(Json(PreprocessResponse {
        image: result.image.to_base64(),
        mime_type: result.image.mime_type.to_string(),
        width: result.image.width,
        height: result.image.height,
        ink_ratio: result.ink_ratio,
        processing_time_ms,
        preprocessing: result,
    }))
}

/// Handle scoring requests: preprocess, then forward to the backend
async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, PrepError> {
    let start = Instant::now();
    let scoring = state.scoring.clone().ok_or(PrepError::ScoringUnavailable)?;
    let upload = read_upload(multipart, state.config.max_file_size).await?;

    let pipeline = state.pipeline.clone();
    let (preprocessing, analysis) = tokio::task::spawn_blocking(move || {
        let preprocessing = pipeline.process(&upload.data, upload.content_type.as_deref())?;
        let analysis = scoring.analyze(&preprocessing.image)?;
        Ok::<_, PrepError>((preprocessing, analysis))
    })
    .await
    .map_err(|e| PrepError::Internal(format!("Scoring task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Analysis completed in {}ms (preprocessing {}ms), score: {:.1}, passing: {}",
        processing_time_ms,
        preprocessing.total_time_ms,
        analysis.score,
        analysis.is_passing
    );

    Ok(Json(AnalyzeResponse {
        analysis,
        processing_time_ms,
        preprocessing,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_file_size_bytes: state.config.max_file_size,
        pipeline: PipelineInfo::from(state.pipeline.options()),
        scoring_backend: state.scoring.as_ref().map(|s| s.name().to_string()),
    })
}

/// Pull the `file` field out of a multipart form
async fn read_upload(mut multipart: Multipart, max_file_size: usize) -> Result<Upload, PrepError> {
    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PrepError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() == Some("file") {
            content_type = field.content_type().map(|s| s.to_string());
            file_data = Some(field.bytes().await.map_err(|e| {
                PrepError::InvalidRequest(format!("Failed to read file data: {}", e))
            })?);
        }
    }

    let data = file_data.ok_or(PrepError::MissingFile)?;

    if data.len() > max_file_size {
        return Err(PrepError::ImageTooLarge {
            size: data.len(),
            max: max_file_size,
        });
    }

    if let Some(mime) = content_type.as_deref() {
        if !mime.starts_with("image/") {
            tracing::warn!("Received file with content type: {}", mime);
        }
    }

    Ok(Upload { data, content_type })
}
