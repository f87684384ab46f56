use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Could not read image: {0}")]
    Decode(String),

    #[error("Preprocessing invariant violated: {0}")]
    Compute(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No scoring backend configured")]
    ScoringUnavailable,

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrepError {
    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            PrepError::Decode(_) => "DECODE_ERROR",
            PrepError::Compute(_) => "COMPUTE_ERROR",
            PrepError::Encode(_) => "ENCODE_ERROR",
            PrepError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            PrepError::MissingFile => "MISSING_FILE",
            PrepError::InvalidRequest(_) => "INVALID_REQUEST",
            PrepError::ScoringUnavailable => "SCORING_UNAVAILABLE",
            PrepError::Scoring(_) => "SCORING_ERROR",
            PrepError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PrepError::Decode(_) => StatusCode::BAD_REQUEST,
            PrepError::Compute(_) | PrepError::Encode(_) | PrepError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PrepError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PrepError::MissingFile | PrepError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PrepError::ScoringUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PrepError::Scoring(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for PrepError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::warn!(code = self.code(), "{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}
