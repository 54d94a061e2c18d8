pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod remote;

pub use extract::Extractor;
pub use normalize::normalize;
pub use pipeline::{DocumentPipeline, PipelineError, PipelineRun};
pub use preprocess::{prepare_for_ocr, PreprocessError, PreprocessStrategy};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use remote::{RemoteConfig, RemoteRecognizer};
