/// Scoring oracle client: the single entry point for embedding and batch-match calls.
///
/// The oracle is an external collaborator. Every call can fail or hang, so callers
/// never use it directly on a hot path; they wrap it in `fallback::with_fallback`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::resume::ExperienceLevel;

const MAX_RETRIES: u32 = 2;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Oracle error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    #[error("Oracle unavailable after {retries} retries")]
    Unavailable { retries: u32 },
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleJob {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMatchRequest {
    pub resume_text: String,
    pub jobs: Vec<OracleJob>,
    pub ats_score: f64,
    pub experience_level: ExperienceLevel,
    pub years_of_experience: u32,
}

/// One entry of a batch-match response, aligned by position with the request's `jobs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleMatch {
    pub match_score: f64,
    #[serde(default)]
    pub semantic_similarity: Option<f64>,
    #[serde(default)]
    pub match_level: Option<String>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub methodology: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchMatchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub matches: Vec<OracleMatch>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OracleErrorBody {
    error: String,
}

/// Embedding and batch-scoring operations. Implemented over HTTP in production
/// and by in-test fakes.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// One embedding per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError>;

    async fn batch_match(
        &self,
        request: &BatchMatchRequest,
    ) -> Result<BatchMatchResponse, OracleError>;
}

#[derive(Clone)]
pub struct HttpScoringOracle {
    client: Client,
    base_url: String,
}

impl HttpScoringOracle {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OracleError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POSTs `body` to `path`, retrying 5xx and transport errors with exponential backoff.
    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OracleError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<OracleError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                // 250ms, 500ms
                let delay = Duration::from_millis(250 * (1 << (attempt - 1)));
                warn!(
                    "Oracle call to {} failed (attempt {}), retrying after {}ms",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(OracleError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(OracleError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OracleErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(OracleError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            debug!("Oracle call to {} returned {} bytes", path, bytes.len());
            return serde_json::from_slice(&bytes)
                .map_err(|e| OracleError::Malformed(e.to_string()));
        }

        Err(last_error.unwrap_or(OracleError::Unavailable {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl ScoringOracle for HttpScoringOracle {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError> {
        let response: EmbedResponse = self.post("/embed", &EmbedRequest { texts }).await?;

        if response.embeddings.len() != texts.len() {
            return Err(OracleError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    async fn batch_match(
        &self,
        request: &BatchMatchRequest,
    ) -> Result<BatchMatchResponse, OracleError> {
        self.post("/batch-match", request).await
    }
}

/// The oracle reports similarity either as a fraction or as a percentage.
pub fn normalize_similarity(raw: f64) -> f64 {
    let value = if raw > 1.0 { raw / 100.0 } else { raw };
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_request_wire_shape() {
        let request = BatchMatchRequest {
            resume_text: "text".to_string(),
            jobs: vec![OracleJob {
                title: "Dev".to_string(),
                description: "Rust".to_string(),
            }],
            ats_score: 81.0,
            experience_level: ExperienceLevel::Senior,
            years_of_experience: 8,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["resumeText"], "text");
        assert_eq!(value["jobs"][0]["description"], "Rust");
        assert_eq!(value["atsScore"], 81.0);
        assert_eq!(value["experienceLevel"], "senior");
        assert_eq!(value["yearsOfExperience"], 8);
    }

    #[test]
    fn test_batch_response_tolerates_missing_fields() {
        let response: BatchMatchResponse = serde_json::from_value(json!({
            "success": true,
            "matches": [{"matchScore": 72.5}]
        }))
        .unwrap();

        assert!(response.success);
        assert_eq!(response.matches.len(), 1);
        assert!(response.matches[0].reasons.is_empty());
        assert!(response.matches[0].semantic_similarity.is_none());

        let empty: BatchMatchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!empty.success);
        assert!(empty.matches.is_empty());
    }

    #[test]
    fn test_normalize_similarity() {
        assert_eq!(normalize_similarity(0.42), 0.42);
        assert_eq!(normalize_similarity(87.0), 0.87);
        assert_eq!(normalize_similarity(-0.3), 0.0);
        assert_eq!(normalize_similarity(250.0), 1.0);
    }
}
