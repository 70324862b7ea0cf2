use anyhow::Context as _;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod audio;
mod chapters;
mod config;
mod llm;
mod pipeline;
mod server;
mod transcribe;
mod transcript;

use config::AppConfig;
use pipeline::PipelineRequest;
use server::AppState;
use transcribe::{ModelCache, SpeechEngine, Transcriber, WhisperModel};
use transcript::ExportFormat;

#[derive(Parser)]
#[command(name = "podscribe", version, about = "Podcast transcript & chapter generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe an audio file and optionally generate AI chapters
    Transcribe {
        /// Audio file (wav, mp3, ...)
        audio: PathBuf,
        /// Whisper model size: tiny, base, small, medium, or large
        #[arg(long, default_value = "base")]
        model: WhisperModel,
        /// Also generate chapters (requires OPENAI_API_KEY)
        #[arg(long)]
        chapters: bool,
        /// Skip writing the transcript file
        #[arg(long)]
        no_transcript: bool,
        /// Transcript format: txt, srt, or vtt
        #[arg(long, default_value = "txt")]
        format: ExportFormat,
        /// Language hint (e.g. "en"); auto-detect when omitted
        #[arg(long)]
        language: Option<String>,
        /// Directory for the output files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Serve the web upload form
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
        /// Whisper model size used for uploads
        #[arg(long, default_value = "base")]
        model: WhisperModel,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Command::Transcribe {
            audio,
            model,
            chapters,
            no_transcript,
            format,
            language,
            output_dir,
        } => {
            run_transcribe(
                config,
                audio,
                model,
                chapters,
                no_transcript,
                format,
                language,
                output_dir,
            )
            .await
        }
        Command::Serve { bind, model } => run_serve(config, bind, model).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_transcribe(
    config: AppConfig,
    audio_path: PathBuf,
    model: WhisperModel,
    chapters: bool,
    no_transcript: bool,
    format: ExportFormat,
    language: Option<String>,
    output_dir: PathBuf,
) -> anyhow::Result<()> {
    let stem = audio_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio")
        .to_string();

    let decode_path = audio_path.clone();
    let samples = tokio::task::spawn_blocking(move || audio::load_audio(&decode_path))
        .await?
        .with_context(|| format!("Failed to load {:?}", audio_path))?;

    let engine = tokio::task::spawn_blocking(move || Transcriber::with_language(model, language))
        .await?
        .context("Failed to prepare the Whisper model")?;
    let engine: Arc<dyn SpeechEngine> = Arc::new(engine);

    let request = PipelineRequest {
        want_transcript: !no_transcript,
        want_chapters: chapters,
        format,
        chat: config.chat_settings(),
    };

    let written =
        pipeline::process_to_files(engine, samples, &request, &output_dir, &stem).await?;

    for path in &written {
        info!("Wrote {:?}", path);
    }

    Ok(())
}

async fn run_serve(config: AppConfig, bind: String, model: WhisperModel) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        chat: config.chat_settings(),
        model,
        models: ModelCache::new(),
    });

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    info!("Listening on http://{} (model: {})", bind, model);

    axum::serve(listener, server::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
