//! Transcript types and export formatters.
//!
//! Supports plain text, SRT, and WebVTT output.

use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;

/// A timed slice of recognized speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start_secs: f64,
    /// End time in seconds
    pub end_secs: f64,
    /// Transcribed text
    pub text: String,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Complete output of one transcription run.
///
/// Produced wholesale by the speech engine; segments arrive ordered by
/// start time and are never re-sorted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// All segment text joined with spaces
    pub full_text: String,
    /// Ordered timed segments
    pub segments: Vec<Segment>,
    /// Detected language, if the engine reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TranscriptResult {
    /// Build a result from segments, deriving `full_text`.
    pub fn from_segments(segments: Vec<Segment>, language: Option<String>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            full_text,
            segments,
            language,
        }
    }

    /// One `[H:MM:SS] text` line per segment, in order.
    ///
    /// This is the block handed to the chapter prompt.
    pub fn timestamped_text(&self) -> String {
        let mut output = String::new();
        for segment in &self.segments {
            let _ = writeln!(
                output,
                "[{}] {}",
                format_timestamp(segment.start_secs),
                segment.text
            );
        }
        output
    }

    /// Render in the requested export format.
    pub fn export(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Text => self.full_text.clone(),
            ExportFormat::Srt => self.to_srt(),
            ExportFormat::Vtt => self.to_vtt(),
        }
    }

    /// Export to SRT format
    pub fn to_srt(&self) -> String {
        let mut output = String::new();

        for (i, segment) in self.segments.iter().enumerate() {
            let _ = writeln!(output, "{}", i + 1);
            let _ = writeln!(
                output,
                "{} --> {}",
                format_srt_time(segment.start_secs),
                format_srt_time(segment.end_secs)
            );
            let _ = writeln!(output, "{}", segment.text);
            let _ = writeln!(output);
        }

        output
    }

    /// Export to WebVTT format
    pub fn to_vtt(&self) -> String {
        let mut output = String::from("WEBVTT\n\n");

        for (i, segment) in self.segments.iter().enumerate() {
            let _ = writeln!(output, "{}", i + 1);
            let _ = writeln!(
                output,
                "{} --> {}",
                format_vtt_time(segment.start_secs),
                format_vtt_time(segment.end_secs)
            );
            let _ = writeln!(output, "{}", segment.text);
            let _ = writeln!(output);
        }

        output
    }
}

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Plain text, no timestamps
    Text,
    /// SubRip subtitle format
    Srt,
    /// WebVTT subtitle format
    Vtt,
}

impl ExportFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Srt => "srt",
            ExportFormat::Vtt => "vtt",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Text),
            "srt" => Ok(ExportFormat::Srt),
            "vtt" | "webvtt" => Ok(ExportFormat::Vtt),
            _ => Err(format!("Unknown format: {}. Use txt, srt, or vtt", s)),
        }
    }
}

/// Format seconds as `H:MM:SS` with integer truncation.
///
/// Hours are not zero-padded: `0:00:00`, `1:01:01`.
pub fn format_timestamp(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{}:{:02}:{:02}", hours, mins, secs)
}

/// Format time for SRT (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0) as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

/// Format time for VTT (HH:MM:SS.mmm)
fn format_vtt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0) as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> TranscriptResult {
        TranscriptResult::from_segments(
            vec![
                Segment {
                    start_secs: 0.0,
                    end_secs: 2.5,
                    text: "Hello world".to_string(),
                },
                Segment {
                    start_secs: 2.5,
                    end_secs: 5.0,
                    text: "Goodbye".to_string(),
                },
            ],
            Some("en".to_string()),
        )
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00:00");
        assert_eq!(format_timestamp(5.0), "0:00:05");
        assert_eq!(format_timestamp(61.9), "0:01:01");
        assert_eq!(format_timestamp(3661.0), "1:01:01");
        assert_eq!(format_timestamp(36000.0), "10:00:00");
    }

    #[test]
    fn test_srt_time_format() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(1.5), "00:00:01,500");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
    }

    #[test]
    fn test_vtt_time_format() {
        assert_eq!(format_vtt_time(0.0), "00:00:00.000");
        assert_eq!(format_vtt_time(1.5), "00:00:01.500");
    }

    #[test]
    fn test_full_text_joined() {
        let result = sample_result();
        assert_eq!(result.full_text, "Hello world Goodbye");
    }

    #[test]
    fn test_timestamped_text() {
        let result = sample_result();
        assert_eq!(
            result.timestamped_text(),
            "[0:00:00] Hello world\n[0:00:02] Goodbye\n"
        );
    }

    #[test]
    fn test_srt_export() {
        let srt = sample_result().to_srt();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500\nHello world\n"));
        assert!(srt.contains("Goodbye"));
    }

    #[test]
    fn test_vtt_export() {
        let vtt = sample_result().to_vtt();
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.500"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("SRT".parse::<ExportFormat>().unwrap(), ExportFormat::Srt);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
