//! Trimmer
//!
//! Cuts `start_secs` from the head and `end_secs` from the tail of a buffer.
//! Offsets convert to frames by rounding, so the result holds
//! `frames - round(start * rate) - round(end * rate)` frames.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::buffer::secs_to_frames;
use crate::engine::AudioBuffer;
use crate::error::{RemixError, Result};

/// Seconds to cut from each end of a take
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrimRange {
    /// Seconds removed from the head
    pub start: f64,
    /// Seconds removed from the tail
    pub end: f64,
}

impl TrimRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Check the offsets are finite and non-negative
    ///
    /// The buffer length is only known after decoding; [`trim`] checks the rest.
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.start < 0.0 || self.end < 0.0 {
            return Err(RemixError::InvalidRange {
                start_secs: self.start,
                end_secs: self.end,
                duration_secs: f64::NAN,
            });
        }
        Ok(())
    }

    /// Apply this range to `buffer`
    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        trim(buffer, self.start, self.end)
    }
}

/// Copy `buffer` without its first `start_secs` and last `end_secs`
///
/// # Arguments
/// * `buffer` - Source audio; left untouched
/// * `start_secs` - Seconds removed from the head, `>= 0`
/// * `end_secs` - Seconds removed from the tail, `>= 0`
///
/// # Errors
/// `InvalidRange` when an offset is negative or not finite, or when the offsets
/// together leave no audio (`start + end >= duration`).
pub fn trim(buffer: &AudioBuffer, start_secs: f64, end_secs: f64) -> Result<AudioBuffer> {
    buffer.check_format()?;
    let duration_secs = buffer.duration_secs();

    let invalid = || RemixError::InvalidRange {
        start_secs,
        end_secs,
        duration_secs,
    };

    if !start_secs.is_finite() || !end_secs.is_finite() {
        return Err(invalid());
    }
    if start_secs < 0.0 || end_secs < 0.0 || start_secs + end_secs >= duration_secs {
        return Err(invalid());
    }

    let frames = buffer.num_frames();
    let head = secs_to_frames(start_secs, buffer.sample_rate);
    let tail = secs_to_frames(end_secs, buffer.sample_rate);
    let remaining = frames.saturating_sub(head).saturating_sub(tail);
    if remaining == 0 {
        // Rounding swallowed the last frame
        return Err(invalid());
    }

    debug!(head, tail, remaining, "trimming buffer");

    Ok(AudioBuffer {
        samples: buffer
            .samples
            .iter()
            .map(|channel| channel[head..head + remaining].to_vec())
            .collect(),
        sample_rate: buffer.sample_rate,
    })
}
