use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tesseract engine configuration, passed to the pipeline at construction
/// time instead of living in a hardcoded filesystem path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the `*.traineddata` models. `None` lets the engine
    /// fall back to its compiled-in default search path.
    pub data_path: Option<PathBuf>,
    /// Language hint in Tesseract's `+`-joined form.
    pub languages: String,
    /// Resolution hint for images without embedded DPI metadata.
    pub dpi: u32,
    /// Keep runs of spaces between words instead of collapsing them.
    pub preserve_interword_spaces: bool,
}

/// The three language models the service ships hints for.
pub const DEFAULT_LANGUAGES: &str = "fra+ara+eng";

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            languages: DEFAULT_LANGUAGES.to_string(),
            dpi: 300,
            preserve_interword_spaces: true,
        }
    }
}

impl EngineConfig {
    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        self.languages = languages.into();
        self
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }
}
