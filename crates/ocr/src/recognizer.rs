use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("OCR API returned HTTP {0}")]
    UpstreamStatus(u16),
    #[error("OCR API error: {0}")]
    Remote(String),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
/// Implementations accept raw PNG/JPEG image bytes and return the recognized text.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;

    /// Recognize with a per-request language hint. Backends that cannot
    /// switch languages ignore the hint.
    async fn recognize_with_language(
        &self,
        image_bytes: &[u8],
        language: Option<&str>,
    ) -> Result<String, OcrError> {
        let _ = language;
        self.recognize(image_bytes).await
    }
}

#[async_trait]
impl<T: OcrBackend + ?Sized> OcrBackend for Arc<T> {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(image_bytes).await
    }

    async fn recognize_with_language(
        &self,
        image_bytes: &[u8],
        language: Option<&str>,
    ) -> Result<String, OcrError> {
        (**self).recognize_with_language(image_bytes, language).await
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string and counts invocations. Useful for testing the
/// pipeline and the HTTP layer without an engine installed.
pub struct MockRecognizer {
    text: String,
    calls: AtomicUsize,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), calls: AtomicUsize::new(0) }
    }

    /// How many times `recognize` has run.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrBackend for MockRecognizer {
    async fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use async_trait::async_trait;
    use docscan_core::EngineConfig;
    use leptess::{LepTess, Variable};

    /// Local Tesseract binding. A fresh engine handle is created per call:
    /// the handle is not safe to share across concurrent invocations, so
    /// none outlives a single recognition.
    pub struct TesseractRecognizer {
        config: EngineConfig,
    }

    impl TesseractRecognizer {
        pub fn new(config: EngineConfig) -> Self {
            Self { config }
        }

        fn recognize_sync(&self, image_bytes: &[u8], language: &str) -> Result<String, OcrError> {
            let data_path = self.config.data_path.as_ref().and_then(|p| p.to_str());
            let mut lt = LepTess::new(data_path, language)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::UserDefinedDpi, &self.config.dpi.to_string())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            if self.config.preserve_interword_spaces {
                lt.set_variable(Variable::PreserveInterwordSpaces, "1")
                    .map_err(|e| OcrError::Engine(e.to_string()))?;
            }
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }

    #[async_trait]
    impl OcrBackend for TesseractRecognizer {
        async fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            self.recognize_sync(image_bytes, &self.config.languages)
        }

        async fn recognize_with_language(
            &self,
            image_bytes: &[u8],
            language: Option<&str>,
        ) -> Result<String, OcrError> {
            self.recognize_sync(image_bytes, language.unwrap_or(&self.config.languages))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_preset_text() {
        let r = MockRecognizer::new("CARTE NATIONALE\nMARIE CURIE");
        assert_eq!(
            r.recognize(b"fake image data").await.unwrap(),
            "CARTE NATIONALE\nMARIE CURIE"
        );
    }

    #[tokio::test]
    async fn mock_counts_calls_and_ignores_language() {
        let r = MockRecognizer::new("hello");
        assert_eq!(r.calls(), 0);
        assert_eq!(r.recognize(b"anything").await.unwrap(), "hello");
        assert_eq!(
            r.recognize_with_language(b"", Some("fra")).await.unwrap(),
            "hello"
        );
        assert_eq!(r.calls(), 2);
    }

    #[tokio::test]
    async fn arc_backend_forwards() {
        let r: Arc<dyn OcrBackend> = Arc::new(MockRecognizer::new("via arc"));
        assert_eq!(r.recognize(b"x").await.unwrap(), "via arc");
    }
}
