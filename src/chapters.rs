//! Chapter generation: timestamped transcript in, `HH:MM:SS - Title` lines out.
//!
//! The whole operation is one prompt-and-response round trip; the only logic
//! here is prompt assembly and a loose sanity check on the reply.

use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{ChatClient, LlmError};
use crate::transcript::TranscriptResult;

#[derive(Error, Debug)]
pub enum ChapterError {
    #[error("An API key is required to generate chapters")]
    MissingApiKey,
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Chapter text plus the outcome of the loose format check.
#[derive(Debug, Clone)]
pub struct ChapterOutput {
    /// Raw chapter text as returned by the model, trimmed
    pub text: String,
    /// Whether every line matched the expected `HH:MM:SS - Title` shape
    pub format_ok: bool,
}

/// Build the chapter prompt from a timestamped transcript.
pub fn build_chapter_prompt(transcript: &TranscriptResult) -> String {
    format!(
        "You are an expert podcast editor. Below is the transcript of an episode, \
         with timestamps. Analyze the content and split the episode into relevant \
         chapters. For each chapter, give the starting timestamp (HH:MM:SS format) \
         and a short title.\n\n\
         {}\n\n\
         Respond ONLY in this format, one line per chapter, with no text before or after:\n\
         HH:MM:SS - Chapter title",
        transcript.timestamped_text()
    )
}

/// Loose validation of the model's reply.
///
/// Every line longer than 11 characters must carry ` - ` right after an
/// `HH:MM:SS` prefix. Short lines pass; a mismatch is only worth a warning.
pub fn check_chapter_format(text: &str) -> bool {
    text.lines()
        .filter(|line| line.len() > 11)
        .all(|line| line.get(8..11) == Some(" - "))
}

/// Ask the chat API to segment the transcript into chapters.
///
/// The API key is checked before any client is built, so a missing key never
/// results in network traffic.
pub async fn generate(
    api_key: Option<&str>,
    model: &str,
    base_url: &str,
    transcript: &TranscriptResult,
) -> Result<ChapterOutput, ChapterError> {
    let api_key = match api_key {
        Some(key) if !key.trim().is_empty() => key,
        _ => return Err(ChapterError::MissingApiKey),
    };

    let prompt = build_chapter_prompt(transcript);
    info!(
        "Requesting chapters for {} segments ({} prompt chars)",
        transcript.segments.len(),
        prompt.len()
    );

    let client = ChatClient::new(api_key)
        .with_model(model)
        .with_base_url(base_url);

    let text = client.complete(&prompt).await?.trim().to_string();

    let format_ok = check_chapter_format(&text);
    if !format_ok {
        warn!("Chapter response did not match the expected 'HH:MM:SS - Title' format");
    }

    Ok(ChapterOutput { text, format_ok })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;

    fn transcript(segments: &[(f64, &str)]) -> TranscriptResult {
        TranscriptResult::from_segments(
            segments
                .iter()
                .map(|&(start, text)| Segment {
                    start_secs: start,
                    end_secs: start + 1.0,
                    text: text.to_string(),
                })
                .collect(),
            None,
        )
    }

    #[test]
    fn test_prompt_block_is_order_preserving() {
        let t = transcript(&[(0.0, "a"), (5.0, "b")]);
        assert_eq!(t.timestamped_text(), "[0:00:00] a\n[0:00:05] b\n");
    }

    #[test]
    fn test_prompt_contains_block_and_format_line() {
        let t = transcript(&[(0.0, "intro music"), (65.0, "first topic")]);
        let prompt = build_chapter_prompt(&t);

        assert!(prompt.contains("[0:00:00] intro music\n[0:01:05] first topic\n"));
        assert!(prompt.contains("HH:MM:SS - Chapter title"));
    }

    #[test]
    fn test_format_check_accepts_expected_lines() {
        let text = "00:00:00 - Introduction\n00:12:34 - Main topic\n01:02:03 - Wrap up";
        assert!(check_chapter_format(text));
    }

    #[test]
    fn test_format_check_flags_prose() {
        let text = "Here are the chapters you asked for:\n00:00:00 - Introduction";
        assert!(!check_chapter_format(text));
    }

    #[test]
    fn test_format_check_ignores_short_lines() {
        assert!(check_chapter_format("ok\n00:00:00 - Intro"));
        assert!(check_chapter_format(""));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let t = transcript(&[(0.0, "hello")]);

        let err = generate(None, "gpt-4o-mini", "http://localhost:1", &t)
            .await
            .unwrap_err();
        assert!(matches!(err, ChapterError::MissingApiKey));

        let err = generate(Some("   "), "gpt-4o-mini", "http://localhost:1", &t)
            .await
            .unwrap_err();
        assert!(matches!(err, ChapterError::MissingApiKey));
    }
}
