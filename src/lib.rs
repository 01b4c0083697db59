//! Remixer - Record-and-Remix Audio Engine
//!
//! Takes a recorded voice take and an existing clip and produces a remix:
//! 1. Capture - record the take while metering its input level
//! 2. Trim / Effect - optional offline processing of the take
//! 3. Mix - combine take, clip and extra tracks with gains, offsets and fades
//! 4. Encode - serialize the mix as a 16-bit PCM WAV artifact
//!
//! # Architecture
//!
//! The numeric core (`dsp`, `mixer`, `meter`, `engine::encoder`) is synchronous
//! and platform independent. Capture devices and compressed-format decoders are
//! injected through traits; the async pipeline in `engine::pipeline` sequences
//! the stages on a blocking pool with cancellation.

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod meter;
pub mod mixer;

pub use config::RemixConfig;
pub use engine::{AudioBuffer, EncodedAudio};
pub use error::{RemixError, Result};
