//! Client for the hosted OCR.space parse API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::recognizer::{OcrBackend, OcrError};

const DEFAULT_ENDPOINT: &str = "https://api.ocr.space/parse/image";
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Configuration for the remote recognizer.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_key: String,
    /// OCR.space language code. Its codes differ from Tesseract's
    /// (`fre`/`ara`/`eng` rather than `fra+ara+eng`).
    pub language: String,
    /// Hard cap on each HTTP request, connect included.
    pub timeout: Duration,
    /// Total attempts per recognition, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RemoteConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: "fre".to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

pub struct RemoteRecognizer {
    config: RemoteConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteRecognizer {
    pub fn new(config: RemoteConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, endpoint: DEFAULT_ENDPOINT.to_string(), client })
    }

    async fn call_once(&self, image_bytes: &[u8], language: &str) -> Result<String, OcrError> {
        let file = reqwest::multipart::Part::bytes(image_bytes.to_vec())
            .file_name("document.png")
            .mime_str("image/png")?;
        let form = reqwest::multipart::Form::new()
            .text("apikey", self.config.api_key.clone())
            .text("language", language.to_string())
            .text("isOverlayRequired", "false")
            .part("file", file);

        let resp = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(OcrError::UpstreamStatus(status.as_u16()));
        }

        let body: ParseResponse = resp.json().await?;
        parsed_text(body)
    }
}

#[async_trait]
impl OcrBackend for RemoteRecognizer {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        self.recognize_with_language(image_bytes, None).await
    }

    async fn recognize_with_language(
        &self,
        image_bytes: &[u8],
        language: Option<&str>,
    ) -> Result<String, OcrError> {
        let language = language.unwrap_or(&self.config.language);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!("OCR API attempt {attempt} ({} bytes)", image_bytes.len());
            match self.call_once(image_bytes, language).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.config.max_attempts && is_transient(&err) => {
                    let delay = backoff_delay(self.config.base_delay, attempt);
                    warn!("OCR API attempt {attempt} failed ({err}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Network-level failures and upstream 5xx are retried; an error the API
/// reported on the document itself is not.
fn is_transient(err: &OcrError) -> bool {
    match err {
        OcrError::Transport(_) => true,
        OcrError::UpstreamStatus(status) => *status >= 500,
        _ => false,
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

// ── API response types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    error_message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

/// The API returns `ErrorMessage` as either a string or an array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn join(&self) -> String {
        match self {
            ErrorMessage::One(s) => s.clone(),
            ErrorMessage::Many(v) => v.join("; "),
        }
    }
}

fn parsed_text(body: ParseResponse) -> Result<String, OcrError> {
    if body.is_errored_on_processing {
        let msg = body
            .error_message
            .map(|m| m.join())
            .unwrap_or_else(|| "unspecified processing error".to_string());
        return Err(OcrError::Remote(msg));
    }
    body.parsed_results
        .into_iter()
        .next()
        .map(|r| r.parsed_text)
        .ok_or_else(|| OcrError::Remote("response had no parsed results".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_body() {
        let body: ParseResponse = serde_json::from_str(
            r#"{
                "ParsedResults": [
                    { "ParsedText": "CARTE NATIONALE\r\nMARIE CURIE", "FileParseExitCode": 1 }
                ],
                "OCRExitCode": 1,
                "IsErroredOnProcessing": false
            }"#,
        )
        .unwrap();
        assert_eq!(
            parsed_text(body).unwrap(),
            "CARTE NATIONALE\r\nMARIE CURIE"
        );
    }

    #[test]
    fn processing_error_surfaces_upstream_message() {
        let body: ParseResponse = serde_json::from_str(
            r#"{
                "IsErroredOnProcessing": true,
                "ErrorMessage": ["Invalid API key", "E101"]
            }"#,
        )
        .unwrap();
        let err = parsed_text(body).unwrap_err();
        assert!(matches!(&err, OcrError::Remote(m) if m == "Invalid API key; E101"));
    }

    #[test]
    fn error_message_accepts_plain_string() {
        let body: ParseResponse = serde_json::from_str(
            r#"{ "IsErroredOnProcessing": true, "ErrorMessage": "Timed out" }"#,
        )
        .unwrap();
        assert!(matches!(parsed_text(body).unwrap_err(), OcrError::Remote(m) if m == "Timed out"));
    }

    #[test]
    fn empty_results_are_an_error() {
        let body: ParseResponse =
            serde_json::from_str(r#"{ "IsErroredOnProcessing": false }"#).unwrap();
        assert!(parsed_text(body).is_err());
    }

    #[test]
    fn only_network_and_5xx_errors_retry() {
        assert!(is_transient(&OcrError::UpstreamStatus(500)));
        assert!(is_transient(&OcrError::UpstreamStatus(503)));
        assert!(!is_transient(&OcrError::UpstreamStatus(403)));
        assert!(!is_transient(&OcrError::Remote("bad document".into())));
        assert!(!is_transient(&OcrError::Engine("boom".into())));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 20), MAX_BACKOFF);
    }
}
