//! Web form mode: a single-page upload form plus a JSON processing endpoint.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::audio::{self, AudioError};
use crate::chapters::ChapterError;
use crate::pipeline::{self, ChatSettings, PipelineError, PipelineRequest};
use crate::transcribe::{ModelCache, SpeechEngine, WhisperError, WhisperModel};
use crate::transcript::ExportFormat;

/// Generous cap for podcast-length uploads
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub struct AppState {
    /// Server-side chat settings; an uploaded key takes precedence
    pub chat: ChatSettings,
    /// Whisper model size used for all requests
    pub model: WhisperModel,
    pub models: ModelCache,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/process", post(process_audio))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Model(#[from] WhisperError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Internal task failure: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Audio(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::NothingRequested) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::Chapters(ChapterError::MissingApiKey)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    /// Stem of the uploaded filename, for naming the downloads
    pub file_stem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// HTML checkbox values and friends
fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

async fn process_audio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut want_transcript = false;
    let mut want_chapters = false;
    let mut api_key: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "audio" => {
                let filename = field.file_name().unwrap_or("audio").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Upload failed: {}", e)))?;
                upload = Some((filename, bytes.to_vec()));
            }
            "transcript" => {
                let value = field.text().await.unwrap_or_default();
                want_transcript = is_checked(&value);
            }
            "chapters" => {
                let value = field.text().await.unwrap_or_default();
                want_chapters = is_checked(&value);
            }
            "api_key" => {
                let value = field.text().await.unwrap_or_default();
                let value = value.trim().to_string();
                if !value.is_empty() {
                    api_key = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = upload
        .ok_or_else(|| ApiError::BadRequest("No audio file uploaded".to_string()))?;

    let file_stem = Path::new(&filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio")
        .to_string();
    let extension = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_string());

    info!(
        "Processing upload '{}' ({} bytes, transcript={}, chapters={})",
        filename,
        bytes.len(),
        want_transcript,
        want_chapters
    );

    // Decode and model load are CPU/disk heavy, keep them off the runtime
    let samples =
        tokio::task::spawn_blocking(move || audio::decode_bytes(bytes, extension.as_deref()))
            .await??;

    let model = state.model;
    let loader_state = state.clone();
    let engine: Arc<dyn SpeechEngine> =
        tokio::task::spawn_blocking(move || loader_state.models.get_or_load(model)).await??;

    let request = PipelineRequest {
        want_transcript,
        want_chapters,
        format: ExportFormat::Text,
        chat: ChatSettings {
            api_key: api_key.or_else(|| state.chat.api_key.clone()),
            model: state.chat.model.clone(),
            base_url: state.chat.base_url.clone(),
        },
    };

    let output = pipeline::process(engine, samples, &request).await?;

    let warning = output.chapters.as_ref().and_then(|c| {
        (!c.format_ok).then(|| {
            "Chapter response did not match the expected 'HH:MM:SS - Title' format".to_string()
        })
    });

    Ok(Json(ProcessResponse {
        file_stem,
        transcript: output.transcript,
        chapters: output.chapters.map(|c| c.text),
        warning,
        language: output.language,
        processed_at: chrono::Utc::now(),
    }))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Podcast Transcript &amp; Chapter Generator</title>
<style>
  body { font-family: sans-serif; max-width: 40rem; margin: 3rem auto; padding: 0 1rem; }
  label { display: block; margin: 0.75rem 0; }
  #status { margin-top: 1rem; }
  .error { color: #b00020; }
  .warning { color: #8a6d00; }
</style>
</head>
<body>
<h1>Podcast Transcript &amp; Chapter Generator</h1>
<form id="form">
  <label>Audio file <input type="file" name="audio" accept="audio/*" required></label>
  <label><input type="checkbox" name="transcript" checked> Generate transcript</label>
  <label><input type="checkbox" name="chapters"> Generate chapters (requires API key)</label>
  <label>OpenAI API key <input type="password" name="api_key" autocomplete="off"></label>
  <button type="submit">Process audio</button>
</form>
<div id="status"></div>
<div id="downloads"></div>
<script>
const form = document.getElementById('form');
const status = document.getElementById('status');
const downloads = document.getElementById('downloads');

function offerDownload(name, text) {
  const a = document.createElement('a');
  a.href = URL.createObjectURL(new Blob([text], { type: 'text/plain' }));
  a.download = name;
  a.textContent = 'Download ' + name;
  a.style.display = 'block';
  downloads.appendChild(a);
}

form.addEventListener('submit', async (event) => {
  event.preventDefault();
  status.textContent = 'Processing... this can take a while.';
  status.className = '';
  downloads.textContent = '';
  try {
    const res = await fetch('/process', { method: 'POST', body: new FormData(form) });
    const data = await res.json();
    if (!res.ok) {
      status.textContent = data.error || ('Request failed: ' + res.status);
      status.className = 'error';
      return;
    }
    status.textContent = data.warning || 'Done.';
    status.className = data.warning ? 'warning' : '';
    if (data.transcript) offerDownload(data.file_stem + '_transcript.txt', data.transcript);
    if (data.chapters) offerDownload(data.file_stem + '_chapters.txt', data.chapters);
  } catch (err) {
    status.textContent = 'Request failed: ' + err;
    status.className = 'error';
  }
});
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_checked() {
        assert!(is_checked("on"));
        assert!(is_checked("true"));
        assert!(is_checked(" ON "));
        assert!(!is_checked(""));
        assert!(!is_checked("off"));
        assert!(!is_checked("false"));
    }

    #[test]
    fn test_config_errors_map_to_bad_request() {
        let err = ApiError::Pipeline(PipelineError::NothingRequested);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::Pipeline(PipelineError::Chapters(ChapterError::MissingApiKey));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::BadRequest("no file".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_errors_map_to_internal() {
        let err = ApiError::Pipeline(PipelineError::Transcribe(WhisperError::Transcription(
            "boom".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::Model(WhisperError::Download("offline".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_router_builds() {
        let state = Arc::new(AppState {
            chat: ChatSettings::default(),
            model: WhisperModel::Base,
            models: ModelCache::new(),
        });
        let _router = router(state);
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::BadRequest("No audio file uploaded".to_string());
        assert_eq!(err.to_string(), "No audio file uploaded");
    }
}
