mod cache;
mod whisper;

pub use cache::ModelCache;
pub use whisper::{
    Transcriber, WhisperError, WhisperModel, download_model, is_model_downloaded, model_path,
    models_dir,
};

use crate::transcript::TranscriptResult;

/// Seam between the pipeline and the speech model.
///
/// Input is 16kHz mono f32 samples; output is the full transcript with
/// ordered timed segments.
pub trait SpeechEngine: Send + Sync {
    fn transcribe(&self, samples: &[f32]) -> Result<TranscriptResult, WhisperError>;
}
