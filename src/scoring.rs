//! Scoring backend interface
//!
//! The model that grades handwriting lives behind an HTTP endpoint. This
//! module only ships the preprocessed image to it and validates the answer.

use crate::config::ScoringConfig;
use crate::error::PrepError;
use crate::preprocessing::EncodedImage;
use serde::{Deserialize, Serialize};

/// Scores at or above this mark count as passing
pub const PASSING_SCORE: f64 = 80.0;

/// Analysis returned by the scoring backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandwritingAnalysis {
    pub score: f64,
    pub is_passing: bool,
    pub feedback: Vec<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

impl HandwritingAnalysis {
    fn validate(&self) -> Result<(), PrepError> {
        if !self.score.is_finite() || !(0.0..=100.0).contains(&self.score) {
            return Err(PrepError::Scoring(format!(
                "backend returned score {} outside 0-100",
                self.score
            )));
        }
        if self.is_passing != (self.score >= PASSING_SCORE) {
            tracing::warn!(
                score = self.score,
                is_passing = self.is_passing,
                "Backend pass flag disagrees with score"
            );
        }
        Ok(())
    }
}

/// Trait every scoring backend implements
pub trait ScoringService: Send + Sync {
    /// Returns the backend identifier
    fn name(&self) -> &'static str;

    /// Grade a preprocessed image. Blocking; call from a blocking context
    fn analyze(&self, image: &EncodedImage) -> Result<HandwritingAnalysis, PrepError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoringRequest<'a> {
    image: String,
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct ScoringErrorBody {
    error: String,
}

/// Scoring backend reached over HTTP with a JSON body
pub struct HttpScoringService {
    agent: ureq::Agent,
    url: String,
}

impl HttpScoringService {
    pub fn new(config: &ScoringConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        tracing::info!("Scoring backend: {}", config.url);

        Self {
            agent,
            url: config.url.clone(),
        }
    }
}

impl ScoringService for HttpScoringService {
    fn name(&self) -> &'static str {
        "http"
    }

    fn analyze(&self, image: &EncodedImage) -> Result<HandwritingAnalysis, PrepError> {
        let request = ScoringRequest {
            image: image.to_base64(),
            mime_type: image.mime_type,
        };

        let mut response = self
            .agent
            .post(&self.url)
            .send_json(&request)
            .map_err(|e| PrepError::Scoring(format!("Failed to reach scoring backend: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .body_mut()
                .read_json::<ScoringErrorBody>()
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("Scoring backend returned {}", status));
            return Err(PrepError::Scoring(message));
        }

        let analysis: HandwritingAnalysis = response
            .body_mut()
            .read_json()
            .map_err(|e| PrepError::Scoring(format!("Malformed scoring response: {}", e)))?;
        analysis.validate()?;

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::time::Duration;

    fn sample_image() -> EncodedImage {
        EncodedImage {
            bytes: vec![1, 2, 3],
            mime_type: "image/jpeg",
            width: 1,
            height: 1,
        }
    }

    async fn spawn_backend(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/analyze", addr)
    }

    async fn analyze_against(url: String) -> Result<HandwritingAnalysis, PrepError> {
        let service = HttpScoringService::new(&ScoringConfig {
            url,
            timeout: Duration::from_secs(5),
        });
        tokio::task::spawn_blocking(move || service.analyze(&sample_image()))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sends_base64_and_parses_analysis() {
        let app = Router::new().route(
            "/api/analyze",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["image"], "AQID");
                assert_eq!(body["mimeType"], "image/jpeg");
                Json(serde_json::json!({
                    "score": 86,
                    "isPassing": true,
                    "feedback": ["round letters"],
                    "strengths": ["no joins"],
                    "improvements": []
                }))
            }),
        );
        let url = spawn_backend(app).await;

        let analysis = analyze_against(url).await.unwrap();
        assert_eq!(analysis.score, 86.0);
        assert!(analysis.is_passing);
        assert_eq!(analysis.strengths, vec!["no joins".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_error_payload_becomes_scoring_error() {
        let app = Router::new().route(
            "/api/analyze",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "model overloaded" })),
                )
            }),
        );
        let url = spawn_backend(app).await;

        match analyze_against(url).await {
            Err(PrepError::Scoring(message)) => assert_eq!(message, "model overloaded"),
            other => panic!("expected scoring error, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_out_of_range_score_is_rejected() {
        let app = Router::new().route(
            "/api/analyze",
            post(|| async {
                Json(serde_json::json!({
                    "score": 140,
                    "isPassing": true,
                    "feedback": [],
                    "strengths": [],
                    "improvements": []
                }))
            }),
        );
        let url = spawn_backend(app).await;

        assert!(matches!(
            analyze_against(url).await,
            Err(PrepError::Scoring(_))
        ));
    }
}
