//! Audio decoding to the 16kHz mono f32 format Whisper expects.
//!
//! WAV files go through hound; everything else (mp3 and whatever symphonia
//! can probe) goes through symphonia.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::info;

use super::{WHISPER_SAMPLE_RATE, downmix_to_mono, resample_linear};

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read WAV: {0}")]
    Wav(#[from] hound::Error),
    #[error("Failed to decode audio: {0}")]
    Decode(String),
    #[error("No decodable audio track found")]
    NoTrack,
    #[error("Audio stream reports no sample rate")]
    NoSampleRate,
    #[error("No audio samples decoded")]
    Empty,
}

/// Load an audio file and prepare it for transcription.
///
/// Returns 16kHz mono samples normalized to [-1.0, 1.0].
pub fn load_audio(path: &Path) -> Result<Vec<f32>, AudioError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let (interleaved, sample_rate, channels) = match ext.as_deref() {
        Some("wav") => decode_wav(hound::WavReader::open(path)?)?,
        _ => decode_compressed(Box::new(File::open(path)?), ext.as_deref())?,
    };

    prepare(interleaved, sample_rate, channels)
}

/// Decode in-memory audio bytes (e.g. an upload) for transcription.
///
/// `extension` is a container hint taken from the original filename.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<Vec<f32>, AudioError> {
    let ext = extension.map(|e| e.to_ascii_lowercase());

    let (interleaved, sample_rate, channels) = match ext.as_deref() {
        Some("wav") => decode_wav(hound::WavReader::new(Cursor::new(bytes))?)?,
        _ => decode_compressed(Box::new(Cursor::new(bytes)), ext.as_deref())?,
    };

    prepare(interleaved, sample_rate, channels)
}

/// Downmix and resample decoded PCM to the Whisper input format.
fn prepare(
    interleaved: Vec<f32>,
    sample_rate: u32,
    channels: usize,
) -> Result<Vec<f32>, AudioError> {
    if interleaved.is_empty() {
        return Err(AudioError::Empty);
    }

    let mono = downmix_to_mono(&interleaved, channels);
    let samples = resample_linear(&mono, sample_rate, WHISPER_SAMPLE_RATE);

    info!(
        "Decoded {:.1}s of audio ({} Hz, {} ch) -> {} samples at {} Hz",
        mono.len() as f64 / sample_rate as f64,
        sample_rate,
        channels,
        samples.len(),
        WHISPER_SAMPLE_RATE
    );

    Ok(samples)
}

/// Read a WAV stream into interleaved f32 samples.
fn decode_wav<R: Read>(reader: hound::WavReader<R>) -> Result<(Vec<f32>, u32, usize), AudioError> {
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, sample_rate, channels))
}

/// Decode a compressed stream via symphonia into interleaved f32 samples.
fn decode_compressed(
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
) -> Result<(Vec<f32>, u32, usize), AudioError> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("unrecognized container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoTrack)?;
    let track_id = track.id;

    let sample_rate = track.codec_params.sample_rate.ok_or(AudioError::NoSampleRate)?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(format!("demux failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
                });
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            // Recoverable per-packet corruption, skip and keep going
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(AudioError::Decode(format!("decode failed: {}", e))),
        }
    }

    Ok((samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_wav_mono_16khz() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[0, 16384, -16384, 32767]);

        let samples = decode_bytes(bytes, Some("wav")).unwrap();

        assert_eq!(samples.len(), 4);
        assert!(samples[0].abs() < 1e-6);
        assert!((samples[1] - 0.5).abs() < 1e-3);
        assert!((samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_wav_stereo_is_downmixed() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        // L/R pairs mix to their average
        let bytes = wav_bytes(spec, &[16384, -16384, 8192, 8192]);

        let samples = decode_bytes(bytes, Some("wav")).unwrap();

        assert_eq!(samples.len(), 2);
        assert!(samples[0].abs() < 1e-3);
        assert!((samples[1] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decode_wav_resamples_to_16khz() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 32000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[1000; 3200]);

        let samples = decode_bytes(bytes, Some("wav")).unwrap();

        // 0.1s of audio stays 0.1s after resampling
        assert_eq!(samples.len(), 1600);
    }

    #[test]
    fn test_empty_audio_rejected() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[]);

        assert!(matches!(
            decode_bytes(bytes, Some("wav")),
            Err(AudioError::Empty)
        ));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let result = decode_bytes(vec![0u8; 64], Some("mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_audio(Path::new("does/not/exist.mp3")),
            Err(AudioError::Io(_))
        ));
        assert!(load_audio(Path::new("does/not/exist.wav")).is_err());
    }
}
