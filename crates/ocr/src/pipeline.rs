use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use docscan_core::{DocumentFields, FieldRuleSet};

use crate::extract::Extractor;
use crate::normalize;
use crate::preprocess::{self, PreprocessError, PreprocessStrategy};
use crate::recognizer::{OcrBackend, OcrError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The result of one pipeline run over a single uploaded image.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Normalized text. Raw OCR output is never surfaced or persisted.
    pub text: String,
    pub fields: DocumentFields,
    /// Completion timestamp, assigned here and never by the client.
    pub processed_at: DateTime<Utc>,
}

/// Linear orchestration: preprocess → recognize → normalize → extract.
/// A failure at any stage aborts the run; there is no retry, resume, or
/// partial-result emission at this level.
pub struct DocumentPipeline<R: OcrBackend> {
    recognizer: R,
    strategy: PreprocessStrategy,
    extractor: Extractor,
}

impl<R: OcrBackend> DocumentPipeline<R> {
    pub fn new(recognizer: R, strategy: PreprocessStrategy, rule_set: FieldRuleSet) -> Self {
        Self { recognizer, strategy, extractor: Extractor::new(rule_set) }
    }

    /// Process one uploaded image. `language` overrides the backend's
    /// configured language hint for this request only.
    pub async fn process_bytes(
        &self,
        data: &[u8],
        language: Option<&str>,
    ) -> Result<PipelineRun, PipelineError> {
        let image = preprocess::prepare_for_ocr(data, self.strategy)?;
        debug!("preprocessed {} -> {} bytes ({})", data.len(), image.len(), self.strategy);

        let raw = self.recognizer.recognize_with_language(&image, language).await?;
        let text = normalize::normalize(&raw);
        let fields = self.extractor.extract(&text);

        Ok(PipelineRun { text, fields, processed_at: Utc::now() })
    }
}
