//! Audio decoding
//!
//! Input blobs arrive as raw bytes tagged with a MIME type. Decoding is an injected
//! capability: the registry routes each blob to the first decoder that claims its
//! MIME type. WAV is decoded in-crate with hound; compressed capture formats
//! (webm/ogg Opus) are decoded by whatever the host platform registers.

use std::fmt;
use std::io::Cursor;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{RemixError, Result};

/// MIME types the remix flow accepts as input
pub const RECOGNIZED_INPUT_TYPES: &[&str] = &[
    "audio/webm",
    "audio/webm;codecs=opus",
    "audio/ogg;codecs=opus",
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
];

/// WAV MIME essences handled by [`WavDecoder`]
const WAV_ESSENCES: &[&str] = &["audio/wav", "audio/x-wav", "audio/wave", "audio/vnd.wave"];

// ============================================================================
// MIME type
// ============================================================================

/// A parsed audio MIME type such as `audio/webm;codecs=opus`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    /// Lowercased `type/subtype`
    pub essence: String,
    /// Value of the `codecs` parameter, if present
    pub codecs: Option<String>,
}

impl MimeType {
    /// Parse a MIME type string
    ///
    /// Parsing is case-insensitive and tolerant of whitespace and quoted parameter values.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

        let valid = essence
            .split_once('/')
            .map(|(ty, sub)| !ty.is_empty() && !sub.is_empty())
            .unwrap_or(false);
        if !valid {
            return Err(RemixError::Decode {
                mime_type: raw.to_string(),
                reason: "malformed MIME type".to_string(),
                source: None,
            });
        }

        let codecs = parts.find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("codecs")
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        });

        Ok(Self { essence, codecs })
    }

    /// Check if this is one of the types listed in [`RECOGNIZED_INPUT_TYPES`]
    pub fn is_recognized_input(&self) -> bool {
        let full = self.to_string();
        RECOGNIZED_INPUT_TYPES.iter().any(|t| *t == full) || self.is_wav()
    }

    /// Check if this is a WAV container
    pub fn is_wav(&self) -> bool {
        WAV_ESSENCES.contains(&self.essence.as_str())
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.codecs {
            Some(codecs) => write!(f, "{};codecs={}", self.essence, codecs),
            None => write!(f, "{}", self.essence),
        }
    }
}

// ============================================================================
// Audio blob
// ============================================================================

/// Encoded audio bytes plus their declared MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    bytes: Vec<u8>,
    mime_type: String,
}

impl AudioBlob {
    /// Create a blob from bytes and a MIME type string
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Raw encoded bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type, as given
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the encoded payload in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the blob carries no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// Decoders
// ============================================================================

/// Decoding capability: `bytes + mime type -> AudioBuffer`
///
/// Decoders are pure; they hold no device or platform state of their own.
pub trait Decoder: Send + Sync {
    /// Human-readable decoder name for logs
    fn name(&self) -> &'static str;

    /// Whether this decoder can handle the given MIME type
    fn supports(&self, mime: &MimeType) -> bool;

    /// Decode a complete payload
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer>;
}

/// Built-in WAV decoder (8/16/24/32-bit PCM and 32-bit float)
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn supports(&self, mime: &MimeType) -> bool {
        mime.is_wav()
    }

    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer> {
        decode_wav(bytes)
    }
}

/// Decode a WAV payload into a planar buffer
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| wav_error("failed to parse header", e))?;

    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(RemixError::Decode {
            mime_type: "audio/wav".to_string(),
            reason: format!(
                "invalid format: {} channels at {} Hz",
                spec.channels, spec.sample_rate
            ),
            source: None,
        });
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    AudioBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| wav_error("failed to read float samples", e)),
        SampleFormat::Int => {
            // Full scale is the largest positive code, matching the encoder
            let scale = match bits_per_sample {
                8 => 127.0,
                16 => 32767.0,
                24 => 8388607.0,
                32 => 2147483647.0,
                other => {
                    return Err(RemixError::Decode {
                        mime_type: "audio/wav".to_string(),
                        reason: format!("unsupported {}-bit integer audio", other),
                        source: None,
                    })
                }
            };

            if bits_per_sample <= 16 {
                reader
                    .samples::<i16>()
                    .map(|s| s.map(|v| (v as f32 / scale).max(-1.0)))
                    .collect::<std::result::Result<Vec<f32>, _>>()
                    .map_err(|e| wav_error("failed to read integer samples", e))
            } else {
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v as f64 / scale as f64).max(-1.0) as f32))
                    .collect::<std::result::Result<Vec<f32>, _>>()
                    .map_err(|e| wav_error("failed to read integer samples", e))
            }
        }
    }
}

fn wav_error(reason: &str, err: hound::Error) -> RemixError {
    RemixError::Decode {
        mime_type: "audio/wav".to_string(),
        reason: format!("{}: {}", reason, err),
        source: Some(Box::new(err)),
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Routes blobs to registered decoders by MIME type
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn Decoder>>,
}

impl DecoderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// Create a registry with the built-in WAV decoder
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WavDecoder));
        registry
    }

    /// Register a decoder. Later registrations take precedence.
    pub fn register(&mut self, decoder: Box<dyn Decoder>) {
        self.decoders.insert(0, decoder);
    }

    /// Find the decoder for a MIME type
    pub fn find(&self, mime: &MimeType) -> Option<&dyn Decoder> {
        self.decoders
            .iter()
            .find(|d| d.supports(mime))
            .map(|d| d.as_ref())
    }

    /// Decode a blob into a buffer
    ///
    /// # Errors
    /// * `Decode` - no decoder for the MIME type, corrupt payload, or no audio frames
    pub fn decode(&self, blob: &AudioBlob) -> Result<AudioBuffer> {
        let mime = MimeType::parse(blob.mime_type())?;

        if blob.is_empty() {
            return Err(RemixError::Decode {
                mime_type: mime.to_string(),
                reason: "blob is empty".to_string(),
                source: None,
            });
        }

        let decoder = self.find(&mime).ok_or_else(|| RemixError::Decode {
            mime_type: mime.to_string(),
            reason: "no decoder registered for this type".to_string(),
            source: None,
        })?;

        let buffer = decoder.decode(blob.bytes())?;
        if buffer.is_empty() {
            return Err(RemixError::Decode {
                mime_type: mime.to_string(),
                reason: "decoded audio contains no samples".to_string(),
                source: None,
            });
        }

        debug!(
            decoder = decoder.name(),
            mime = %mime,
            frames = buffer.num_frames(),
            channels = buffer.num_channels(),
            sample_rate = buffer.sample_rate,
            "decoded blob"
        );
        Ok(buffer)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
