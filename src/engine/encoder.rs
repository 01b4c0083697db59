//! WAV encoding
//!
//! Serializes a final buffer into a self-contained 16-bit PCM WAV blob with the
//! canonical 44-byte header. The layout is written field by field so the output is
//! byte-exact regardless of writer library defaults.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{RemixError, Result};

/// MIME type of every encoded artifact
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Size of the canonical RIFF/WAVE header
pub const WAV_HEADER_LEN: usize = 44;

/// Output bit depth
const BITS_PER_SAMPLE: u16 = 16;

/// WAVE_FORMAT_PCM
const PCM_FORMAT_CODE: u16 = 1;

/// Immutable encoded artifact handed to the upload layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl EncodedAudio {
    /// Encoded bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type (`audio/wav`)
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a successfully encoded artifact; the header alone is 44 bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 of the payload as lowercase hex, for upload integrity checks
    pub fn checksum(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Take ownership of the bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Convert a float sample to 16-bit PCM: `round(clamp(s, -1, 1) * 32767)`
///
/// NaN maps to 0.
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Encode a buffer as 16-bit PCM WAV
///
/// # Errors
/// * `InvalidFormat` - zero sample rate, no channels, more than 65535 channels, or a
///   payload too large for a RIFF container
pub fn encode_wav(buffer: &AudioBuffer) -> Result<EncodedAudio> {
    buffer.check_format()?;

    let channels = u16::try_from(buffer.num_channels())
        .map_err(|_| RemixError::invalid_format("too many channels for WAV"))?;
    let sample_rate = buffer.sample_rate;
    let block_align = channels as u32 * (BITS_PER_SAMPLE as u32 / 8);
    let byte_rate = sample_rate
        .checked_mul(block_align)
        .ok_or_else(|| RemixError::invalid_format("byte rate overflows 32 bits"))?;

    let data_len = (buffer.num_frames() as u64) * block_align as u64;
    if data_len + WAV_HEADER_LEN as u64 - 8 > u32::MAX as u64 {
        return Err(RemixError::invalid_format("audio too long for a WAV container"));
    }
    let data_len = data_len as u32;

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);

    // RIFF chunk descriptor
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&PCM_FORMAT_CODE.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&(block_align as u16).to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..buffer.num_frames() {
        for channel in &buffer.samples {
            bytes.extend_from_slice(&sample_to_i16(channel[frame]).to_le_bytes());
        }
    }

    debug!(
        frames = buffer.num_frames(),
        channels,
        sample_rate,
        bytes = bytes.len(),
        "encoded wav"
    );

    Ok(EncodedAudio {
        bytes,
        mime_type: WAV_MIME_TYPE,
    })
}
