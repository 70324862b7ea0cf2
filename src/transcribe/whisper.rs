//! Whisper.cpp integration: model download, loading, and transcription.

use std::fs::{self, File};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::SpeechEngine;
use crate::audio::WHISPER_SAMPLE_RATE;
use crate::transcript::{Segment, TranscriptResult};

/// Available Whisper model sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhisperModel {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl WhisperModel {
    /// On-disk filename of the ggml weights
    pub fn filename(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "ggml-tiny.bin",
            WhisperModel::Base => "ggml-base.bin",
            WhisperModel::Small => "ggml-small.bin",
            WhisperModel::Medium => "ggml-medium.bin",
            WhisperModel::Large => "ggml-large-v3.bin",
        }
    }

    /// Hugging Face URL for this model
    pub fn hf_url(&self) -> String {
        format!(
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}",
            self.filename()
        )
    }

    /// Approximate model size in MB
    pub fn size_mb(&self) -> u64 {
        match self {
            WhisperModel::Tiny => 75,
            WhisperModel::Base => 142,
            WhisperModel::Small => 466,
            WhisperModel::Medium => 1500,
            WhisperModel::Large => 3100,
        }
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WhisperModel::Tiny => "tiny",
            WhisperModel::Base => "base",
            WhisperModel::Small => "small",
            WhisperModel::Medium => "medium",
            WhisperModel::Large => "large",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(WhisperModel::Tiny),
            "base" => Ok(WhisperModel::Base),
            "small" => Ok(WhisperModel::Small),
            "medium" => Ok(WhisperModel::Medium),
            "large" => Ok(WhisperModel::Large),
            _ => Err(format!(
                "Unknown model: {}. Use tiny, base, small, medium, or large",
                s
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum WhisperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to download model: {0}")]
    Download(String),
    #[error("Failed to initialize Whisper: {0}")]
    Init(String),
    #[error("Transcription failed: {0}")]
    Transcription(String),
}

/// Get the models directory path
pub fn models_dir() -> PathBuf {
    PathBuf::from("models").join("whisper")
}

/// Get the path to a specific model file
pub fn model_path(model: WhisperModel) -> PathBuf {
    models_dir().join(model.filename())
}

/// Check if a model is already downloaded
pub fn is_model_downloaded(model: WhisperModel) -> bool {
    let path = model_path(model);
    if !path.exists() {
        return false;
    }

    // Reject obviously truncated downloads (less than half the expected size)
    if let Ok(metadata) = fs::metadata(&path) {
        let expected_bytes = model.size_mb() * 1024 * 1024;
        return metadata.len() >= expected_bytes / 2;
    }

    false
}

/// Download a Whisper model from Hugging Face.
///
/// Idempotent: returns immediately when a plausible copy already exists.
/// Blocking; callers inside the runtime go through `spawn_blocking`.
pub fn download_model(model: WhisperModel) -> Result<PathBuf, WhisperError> {
    let path = model_path(model);

    if is_model_downloaded(model) {
        info!("Model {} already downloaded at {:?}", model, path);
        return Ok(path);
    }

    fs::create_dir_all(models_dir())?;

    info!(
        "Downloading Whisper {} model (~{}MB)...",
        model,
        model.size_mb()
    );

    let url = model.hf_url();

    let mut response = reqwest::blocking::Client::new()
        .get(&url)
        .send()
        .map_err(|e| WhisperError::Download(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(WhisperError::Download(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    let total_size = response.content_length().unwrap_or(0);

    let pb = indicatif::ProgressBar::new(total_size);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    // Stream into a temp file, rename into place once complete
    let temp_path = path.with_extension("bin.tmp");
    let file = File::create(&temp_path)?;
    let mut writer = pb.wrap_write(file);

    response
        .copy_to(&mut writer)
        .map_err(|e| WhisperError::Download(format!("Failed to read response: {}", e)))?;

    pb.finish_with_message("Download complete");

    fs::rename(&temp_path, &path)?;

    info!("Model downloaded to {:?}", path);

    Ok(path)
}

/// Whisper transcriber
pub struct Transcriber {
    ctx: WhisperContext,
    model: WhisperModel,
    /// Language hint (None = auto-detect)
    language: Option<String>,
    n_threads: i32,
}

impl Transcriber {
    /// Create a transcriber with language auto-detection.
    pub fn new(model: WhisperModel) -> Result<Self, WhisperError> {
        Self::with_language(model, None)
    }

    /// Create a transcriber with an explicit language hint (e.g. "en", "fr").
    pub fn with_language(
        model: WhisperModel,
        language: Option<String>,
    ) -> Result<Self, WhisperError> {
        // Ensure model is downloaded
        let path = download_model(model)?;

        info!("Loading Whisper {} model...", model);

        let ctx = WhisperContext::new_with_params(
            path.to_str().ok_or_else(|| {
                WhisperError::Init(format!("Non-UTF8 model path: {:?}", path))
            })?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| WhisperError::Init(format!("Failed to load model: {}", e)))?;

        let n_threads = std::thread::available_parallelism()
            .map(|p| p.get() as i32)
            .unwrap_or(4);

        info!("Whisper model loaded (using {} threads)", n_threads);

        Ok(Self {
            ctx,
            model,
            language,
            n_threads,
        })
    }

    pub fn model(&self) -> WhisperModel {
        self.model
    }
}

impl SpeechEngine for Transcriber {
    fn transcribe(&self, samples: &[f32]) -> Result<TranscriptResult, WhisperError> {
        let start_time = std::time::Instant::now();
        let audio_secs = samples.len() as f32 / WHISPER_SAMPLE_RATE as f32;

        info!(
            "Transcribing {} samples ({:.1}s of audio)",
            samples.len(),
            audio_secs
        );

        // Greedy sampling: beam search is 2-3x slower for little gain here
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_n_threads(self.n_threads);
        params.set_token_timestamps(false);
        params.set_language(Some(self.language.as_deref().unwrap_or("auto")));
        params.set_translate(false);

        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| WhisperError::Transcription(format!("Failed to create state: {}", e)))?;

        state
            .full(params, samples)
            .map_err(|e| WhisperError::Transcription(format!("Inference failed: {}", e)))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| WhisperError::Transcription(format!("Failed to get segments: {}", e)))?;

        let mut segments = Vec::new();

        for i in 0..num_segments {
            let start_ts = state.full_get_segment_t0(i).map_err(|e| {
                WhisperError::Transcription(format!("Failed to get start time: {}", e))
            })?;
            let end_ts = state.full_get_segment_t1(i).map_err(|e| {
                WhisperError::Transcription(format!("Failed to get end time: {}", e))
            })?;
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| WhisperError::Transcription(format!("Failed to get text: {}", e)))?;

            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }

            // Timestamps are in centiseconds
            segments.push(Segment {
                start_secs: start_ts as f64 / 100.0,
                end_secs: end_ts as f64 / 100.0,
                text,
            });
        }

        let language = state
            .full_lang_id_from_state()
            .ok()
            .and_then(|id| whisper_rs::get_lang_str(id).map(|s| s.to_string()));

        let elapsed = start_time.elapsed().as_secs_f32();
        info!(
            "Transcribed in {:.1}s ({:.1}x realtime): {} segments",
            elapsed,
            audio_secs / elapsed.max(0.001),
            segments.len()
        );

        Ok(TranscriptResult::from_segments(segments, language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("tiny".parse::<WhisperModel>().unwrap(), WhisperModel::Tiny);
        assert_eq!("SMALL".parse::<WhisperModel>().unwrap(), WhisperModel::Small);
        assert!("invalid".parse::<WhisperModel>().is_err());
    }

    #[test]
    fn test_model_roundtrip_display() {
        for model in [
            WhisperModel::Tiny,
            WhisperModel::Base,
            WhisperModel::Small,
            WhisperModel::Medium,
            WhisperModel::Large,
        ] {
            assert_eq!(model.to_string().parse::<WhisperModel>().unwrap(), model);
        }
    }

    #[test]
    fn test_model_paths() {
        assert!(
            model_path(WhisperModel::Tiny)
                .to_str()
                .unwrap()
                .contains("ggml-tiny.bin")
        );
    }

    #[test]
    fn test_hf_url_matches_filename() {
        let url = WhisperModel::Large.hf_url();
        assert!(url.ends_with("ggml-large-v3.bin"));
        assert!(url.starts_with("https://huggingface.co/"));
    }
}
