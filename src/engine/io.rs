//! Audio file I/O
//!
//! Reads audio files into blobs (MIME type from the file extension), decodes
//! them through a [`DecoderRegistry`] and writes encoded WAV artifacts back to
//! disk. Also generates test tones.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::engine::buffer::{secs_to_frames, AudioBuffer};
use crate::engine::codec::{AudioBlob, DecoderRegistry};
use crate::engine::encoder::{encode_wav, EncodedAudio};
use crate::error::{RemixError, Result};

/// MIME type implied by a file extension
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "wav" | "wave" => Some("audio/wav"),
        "webm" => Some("audio/webm;codecs=opus"),
        "ogg" | "opus" => Some("audio/ogg;codecs=opus"),
        _ => None,
    }
}

/// Read a file into a blob
///
/// # Errors
/// * `Io` - the file cannot be read
/// * `Decode` - the extension does not map to a recognized audio type
pub fn read_blob(path: &Path) -> Result<AudioBlob> {
    let mime_type = mime_type_for_path(path).ok_or_else(|| RemixError::Decode {
        mime_type: "unknown".to_string(),
        reason: format!("unrecognized audio file extension: {}", path.display()),
        source: None,
    })?;
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), mime_type, "read audio file");
    Ok(AudioBlob::new(bytes, mime_type))
}

/// Read and decode an audio file
pub fn import_audio(path: &Path, decoders: &DecoderRegistry) -> Result<AudioBuffer> {
    let blob = read_blob(path)?;
    decoders.decode(&blob)
}

/// Write an encoded artifact to `path`
pub fn write_encoded(path: &Path, encoded: &EncodedAudio) -> Result<()> {
    fs::write(path, encoded.bytes())?;
    debug!(path = %path.display(), bytes = encoded.len(), "wrote audio file");
    Ok(())
}

/// Encode `buffer` as 16-bit WAV and write it to `path`
pub fn export_wav(buffer: &AudioBuffer, path: &Path) -> Result<EncodedAudio> {
    let encoded = encode_wav(buffer)?;
    write_encoded(path, &encoded)?;
    Ok(encoded)
}

/// Generate a mono sine test tone
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `amplitude` - Peak amplitude (linear)
/// * `duration_secs` - Duration of the tone in seconds
/// * `sample_rate` - Sample rate in Hz
pub fn generate_test_tone(
    frequency: f32,
    amplitude: f32,
    duration_secs: f64,
    sample_rate: u32,
) -> AudioBuffer {
    let frames = secs_to_frames(duration_secs, sample_rate);
    let angular_freq = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;

    let channel = (0..frames)
        .map(|i| amplitude * (angular_freq * i as f64).sin() as f32)
        .collect();

    AudioBuffer {
        samples: vec![channel],
        sample_rate,
    }
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    amplitude: f32,
    duration_secs: f64,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, amplitude, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, amplitude, duration_secs, sample_rate);

    AudioBuffer {
        samples: left.samples.into_iter().chain(right.samples).collect(),
        sample_rate,
    }
}
