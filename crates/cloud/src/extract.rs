//! Archive extraction function client.
//!
//! Archives are never unpacked by the worker itself; a separate serverless
//! function owns that. The worker POSTs one request per archive and gets a
//! `{success, message}` verdict back. A scripted fake stands in for the
//! function in pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CloudError;

/// One extraction invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRequest {
    /// Bucket the archive lives in.
    pub bucket: String,
    pub key: String,
    /// Bucket the contents unpack into.
    pub target_bucket: String,
    /// Prefix in the target bucket the contents unpack under.
    pub target_prefix: String,
}

/// Verdict from the extraction function.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Ask the function to unpack one archive. An `Err` is a transport
    /// problem; a returned outcome with `success: false` is the function
    /// declining the archive.
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, CloudError>;
}

/// HTTP client for the deployed extraction function.
#[derive(Debug, Clone)]
pub struct HttpExtractionClient {
    http: reqwest::Client,
    url: String,
}

impl HttpExtractionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Read the function URL from `ARKIVO_EXTRACTION_URL`.
    pub fn from_env() -> Result<Self, CloudError> {
        let url = std::env::var("ARKIVO_EXTRACTION_URL")
            .map_err(|_| CloudError::MissingConfig("ARKIVO_EXTRACTION_URL".into()))?;
        Ok(Self::new(url))
    }
}

#[async_trait]
impl ExtractionClient for HttpExtractionClient {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, CloudError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let outcome: ExtractionOutcome = response.json().await?;
        info!(
            key = %request.key,
            success = outcome.success,
            "extraction function answered"
        );
        Ok(outcome)
    }
}

/// Scripted [`ExtractionClient`] for tests: outcomes keyed by archive key,
/// unknown keys succeed.
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    outcomes: Mutex<HashMap<String, ExtractionOutcome>>,
    requests: Mutex<Vec<ExtractionRequest>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, key: &str, success: bool, message: &str) {
        self.outcomes.lock().expect("extractor lock").insert(
            key.to_string(),
            ExtractionOutcome {
                success,
                message: message.to_string(),
            },
        );
    }

    /// Archive keys extracted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("extractor lock")
            .iter()
            .map(|r| r.key.clone())
            .collect()
    }

    /// Full requests received so far, in call order.
    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests.lock().expect("extractor lock").clone()
    }
}

#[async_trait]
impl ExtractionClient for ScriptedExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, CloudError> {
        self.requests
            .lock()
            .expect("extractor lock")
            .push(request.clone());
        Ok(self
            .outcomes
            .lock()
            .expect("extractor lock")
            .get(&request.key)
            .cloned()
            .unwrap_or(ExtractionOutcome {
                success: true,
                message: String::new(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parses_with_and_without_message() {
        let full: ExtractionOutcome =
            serde_json::from_str(r#"{"success": true, "message": "12 files"}"#).unwrap();
        assert!(full.success);
        assert_eq!(full.message, "12 files");

        let bare: ExtractionOutcome = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!bare.success);
        assert!(bare.message.is_empty());
    }

    #[tokio::test]
    async fn scripted_extractor_replays_outcomes() {
        let fake = ScriptedExtractor::new();
        fake.script("events/EVT-001/old.zip", false, "corrupt archive");

        let req = ExtractionRequest {
            bucket: "staging".into(),
            key: "events/EVT-001/old.zip".into(),
            target_bucket: "archive-media".into(),
            target_prefix: "media/EVT-001/audio_main/".into(),
        };
        let outcome = fake.extract(&req).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(fake.calls(), vec!["events/EVT-001/old.zip"]);
    }

    #[test]
    fn missing_url_is_missing_config() {
        std::env::remove_var("ARKIVO_EXTRACTION_URL");
        assert!(matches!(
            HttpExtractionClient::from_env(),
            Err(CloudError::MissingConfig(_))
        ));
    }
}
