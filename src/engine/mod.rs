//! Audio Engine Module
//!
//! Core engine including:
//! - Audio buffer management and format conversion
//! - Decoding, WAV encoding and file I/O
//! - Capture with live level metering
//! - Session state machine and the async remix pipeline

pub mod buffer;
pub mod capture;
pub mod codec;
pub mod encoder;
pub mod io;
pub mod pipeline;
pub mod resample;
pub mod session;

pub use buffer::{db_to_linear, linear_to_db, AudioBuffer, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
pub use capture::{ActiveCapture, CaptureDevice, Recorder};
pub use codec::{decode_wav, AudioBlob, Decoder, DecoderRegistry, MimeType, WavDecoder};
pub use encoder::{encode_wav, EncodedAudio, WAV_MIME_TYPE};
pub use io::{export_wav, generate_stereo_test_tone, generate_test_tone, import_audio, read_blob};
pub use pipeline::{CancelToken, RemixJob, RemixPipeline};
pub use session::{Phase, SessionEvent, SessionState};
