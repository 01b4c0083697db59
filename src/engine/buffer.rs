//! Audio Buffer
//!
//! The planar floating-point buffer that every pipeline stage consumes and produces.
//! A buffer is owned by exactly one stage at a time and moved to the next one.

use crate::error::{RemixError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default sample rate for rendered output (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default channel count for rendered output
pub const DEFAULT_CHANNELS: usize = 2;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Convert a duration in seconds to a whole number of frames at `sample_rate`
#[inline]
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> usize {
    (secs * sample_rate as f64).round().max(0.0) as usize
}

fn check_equal_lengths(samples: &[Vec<f32>]) -> Result<()> {
    let frames = samples.first().map(Vec::len).unwrap_or(0);
    if samples.iter().any(|ch| ch.len() != frames) {
        return Err(RemixError::invalid_format("channels have different lengths"));
    }
    Ok(())
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar audio buffer
///
/// Stores audio as non-interleaved 32-bit floating point samples.
/// Each channel is a separate `Vec<f32>` and all channels have the same length.
///
/// # Example
/// ```
/// use remixer::engine::AudioBuffer;
///
/// // One second of stereo silence at 48kHz
/// let buffer = AudioBuffer::new(48000, 2, 48000);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is frames
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed buffer with `num_frames` frames per channel
    pub fn new(num_frames: usize, num_channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_frames]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer of silence lasting `duration_secs`
    pub fn silence(duration_secs: f64, num_channels: usize, sample_rate: u32) -> Self {
        Self::new(
            secs_to_frames(duration_secs, sample_rate),
            num_channels,
            sample_rate,
        )
    }

    /// Build a buffer from per-channel sample vectors
    ///
    /// All channels must have the same length.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        check_equal_lengths(&samples)?;
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Number of interleaved channels
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(RemixError::invalid_format("channel count must be at least 1"));
        }

        if interleaved.len() % num_channels != 0 {
            return Err(RemixError::invalid_format(format!(
                "interleaved data length {} is not divisible by channel count {}",
                interleaved.len(),
                num_channels
            )));
        }

        let num_frames = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    ///
    /// Channels shorter than the first are padded with silence.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.num_channels();
        let num_frames = self.num_frames();

        let mut interleaved = Vec::with_capacity(num_channels * num_frames);
        for frame in 0..num_frames {
            for channel in &self.samples {
                interleaved.push(channel.get(frame).copied().unwrap_or(0.0));
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of frames (samples per channel)
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Get a sample, or None if out of bounds
    #[inline]
    pub fn get_sample(&self, channel: usize, frame: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(frame).copied())
    }

    /// Iterate over every sample of every channel
    pub fn iter_samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().flat_map(|ch| ch.iter().copied())
    }

    /// Check the buffer can be processed: a non-zero rate and at least one channel,
    /// all of the same length
    pub fn check_format(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(RemixError::invalid_format("sample rate must be greater than 0"));
        }
        if self.samples.is_empty() {
            return Err(RemixError::invalid_format("buffer has no channels"));
        }
        check_equal_lengths(&self.samples)
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.iter_samples().all(|s| s.is_finite())
    }

    /// Largest absolute sample value (linear)
    pub fn peak(&self) -> f32 {
        self.iter_samples().map(f32::abs).fold(0.0_f32, f32::max)
    }

    /// Root-mean-square level across all channels (linear)
    ///
    /// Returns 0.0 for empty buffers.
    pub fn rms(&self) -> f32 {
        let total = self.num_channels() * self.num_frames();
        if total == 0 {
            return 0.0;
        }

        let sum_squares: f64 = self.iter_samples().map(|s| (s as f64) * (s as f64)).sum();
        (sum_squares / total as f64).sqrt() as f32
    }

    /// Multiply every sample by a linear gain factor
    pub fn scale(&mut self, gain: f32) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Clamp all samples to [-1.0, 1.0]
    pub fn clamp(&mut self) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(0, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE)
    }
}

// ============================================================================
// Tests
// ============================================================================
