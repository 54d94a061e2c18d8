use anyhow::{bail, Context};
use docscan_core::{EngineConfig, FieldRuleSet};
use docscan_ocr::{OcrBackend, PreprocessStrategy, RemoteConfig, RemoteRecognizer};
use std::path::PathBuf;
use std::sync::Arc;

/// Runtime configuration, assembled from the environment once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub backend: BackendKind,
    pub engine: EngineConfig,
    /// OCR.space key, required when `backend` is `Remote`.
    pub remote_api_key: Option<String>,
    /// OCR.space language code (their codes differ from Tesseract's).
    pub remote_language: String,
    pub strategy: PreprocessStrategy,
    pub rule_set: FieldRuleSet,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Tesseract,
    Remote,
    Mock,
}

impl std::str::FromStr for BackendKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tesseract" => Ok(BackendKind::Tesseract),
            "remote" => Ok(BackendKind::Remote),
            "mock" => Ok(BackendKind::Mock),
            other => Err(format!("Unknown OCR backend: '{other}'")),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut engine = EngineConfig::default();
        if let Ok(languages) = std::env::var("DOCSCAN_OCR_LANGUAGES") {
            engine.languages = languages;
        }
        if let Ok(path) = std::env::var("DOCSCAN_TESSDATA") {
            engine.data_path = Some(PathBuf::from(path));
        }
        if let Ok(dpi) = std::env::var("DOCSCAN_OCR_DPI") {
            engine.dpi = dpi.parse().context("DOCSCAN_OCR_DPI must be an integer")?;
        }

        Ok(Self {
            bind_addr: env_or("DOCSCAN_BIND", "0.0.0.0:3000"),
            db_path: PathBuf::from(env_or("DOCSCAN_DB", "data/docscan.db")),
            backend: env_or("DOCSCAN_OCR_BACKEND", "tesseract")
                .parse()
                .map_err(anyhow::Error::msg)?,
            engine,
            remote_api_key: std::env::var("OCRSPACE_API_KEY").ok(),
            remote_language: env_or("DOCSCAN_REMOTE_LANGUAGE", "fre"),
            strategy: env_or("DOCSCAN_PREPROCESS", "sharpen")
                .parse()
                .map_err(anyhow::Error::msg)?,
            rule_set: env_or("DOCSCAN_RULE_SET", "standard")
                .parse()
                .map_err(anyhow::Error::msg)?,
            max_upload_bytes: env_or("DOCSCAN_MAX_UPLOAD_BYTES", "20971520")
                .parse()
                .context("DOCSCAN_MAX_UPLOAD_BYTES must be an integer")?,
        })
    }

    /// Build the OCR backend this deployment was configured for.
    pub fn build_recognizer(&self) -> anyhow::Result<Arc<dyn OcrBackend>> {
        match self.backend {
            BackendKind::Mock => Ok(Arc::new(docscan_ocr::MockRecognizer::new(""))),
            BackendKind::Remote => {
                let Some(api_key) = self.remote_api_key.clone() else {
                    bail!("OCRSPACE_API_KEY is required for the remote OCR backend");
                };
                let config =
                    RemoteConfig::new(api_key).with_language(self.remote_language.clone());
                Ok(Arc::new(RemoteRecognizer::new(config)?))
            }
            #[cfg(feature = "tesseract")]
            BackendKind::Tesseract => Ok(Arc::new(
                docscan_ocr::recognizer::tesseract_backend::TesseractRecognizer::new(
                    self.engine.clone(),
                ),
            )),
            #[cfg(not(feature = "tesseract"))]
            BackendKind::Tesseract => {
                bail!(
                    "built without the `tesseract` feature; rebuild with \
                     `--features tesseract` or set DOCSCAN_OCR_BACKEND=remote"
                )
            }
        }
    }
}
