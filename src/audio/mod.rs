mod decode;
mod resample;

pub use decode::{AudioError, decode_bytes, load_audio};
pub use resample::{downmix_to_mono, resample_linear};

/// Whisper's required sample rate
pub const WHISPER_SAMPLE_RATE: u32 = 16000;
