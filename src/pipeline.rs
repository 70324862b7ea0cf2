//! The end-to-end pipeline: samples -> transcript -> optional chapters -> files.
//!
//! Failures are passthrough: whatever the speech engine or the chat API
//! reports is surfaced to the caller unchanged, nothing is retried, and no
//! partial results are written.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::chapters::{self, ChapterError, ChapterOutput};
use crate::llm::{DEFAULT_CHAT_MODEL, OPENAI_API_BASE};
use crate::transcribe::{SpeechEngine, WhisperError};
use crate::transcript::ExportFormat;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Select at least one output (transcript or chapters)")]
    NothingRequested,
    #[error(transparent)]
    Transcribe(#[from] WhisperError),
    #[error(transparent)]
    Chapters(#[from] ChapterError),
    #[error("Transcription task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat-completion settings carried through the pipeline.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub want_transcript: bool,
    pub want_chapters: bool,
    pub format: ExportFormat,
    pub chat: ChatSettings,
}

/// Rendered pipeline results.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Transcript rendered in the requested format, if requested
    pub transcript: Option<String>,
    /// Chapter text plus format-check outcome, if requested
    pub chapters: Option<ChapterOutput>,
    /// Language the engine detected
    pub language: Option<String>,
}

/// Run the pipeline in memory.
///
/// Transcription runs on the blocking pool (whisper inference is CPU-bound);
/// the chapter call stays on the async runtime.
pub async fn process(
    engine: Arc<dyn SpeechEngine>,
    samples: Vec<f32>,
    request: &PipelineRequest,
) -> Result<PipelineOutput, PipelineError> {
    if !request.want_transcript && !request.want_chapters {
        return Err(PipelineError::NothingRequested);
    }

    let result =
        tokio::task::spawn_blocking(move || engine.transcribe(&samples)).await??;

    let transcript = request
        .want_transcript
        .then(|| result.export(request.format));

    let chapters = if request.want_chapters {
        Some(
            chapters::generate(
                request.chat.api_key.as_deref(),
                &request.chat.model,
                &request.chat.base_url,
                &result,
            )
            .await?,
        )
    } else {
        None
    };

    Ok(PipelineOutput {
        transcript,
        chapters,
        language: result.language,
    })
}

/// Run the pipeline and write the requested outputs under `output_dir`.
///
/// Files are only written after every requested stage succeeded, so a
/// failing stage leaves no partial output behind.
pub async fn process_to_files(
    engine: Arc<dyn SpeechEngine>,
    samples: Vec<f32>,
    request: &PipelineRequest,
    output_dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, PipelineError> {
    let output = process(engine, samples, request).await?;

    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    if let Some(transcript) = &output.transcript {
        let path = output_dir.join(format!(
            "{}_transcript.{}",
            stem,
            request.format.extension()
        ));
        std::fs::write(&path, transcript)?;
        info!("Transcript saved to {:?}", path);
        written.push(path);
    }

    if let Some(chapters) = &output.chapters {
        let path = output_dir.join(format!("{}_chapters.txt", stem));
        std::fs::write(&path, &chapters.text)?;
        info!("Chapters saved to {:?}", path);
        written.push(path);
    }

    Ok(written)
}
