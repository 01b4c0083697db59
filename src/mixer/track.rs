//! Mixer inputs

use crate::engine::buffer::{secs_to_frames, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use crate::engine::AudioBuffer;
use crate::error::{RemixError, Result};

/// Largest gain a track may carry
pub const MAX_TRACK_GAIN: f32 = 2.0;

/// Longest start offset or fade a track may carry, in seconds (one hour)
pub const MAX_MIX_SECS: f64 = 3600.0;

/// One input to a mix
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Audio for this track, in any format
    pub buffer: AudioBuffer,
    /// Linear gain, 0 to 2
    pub gain: f32,
    /// Position of the track's first sample in the mix timeline
    pub start_offset_secs: f64,
    /// Linear ramp from silence at the track start
    pub fade_in_secs: f64,
    /// Linear ramp to silence at the track end
    pub fade_out_secs: f64,
}

impl Track {
    /// Track at unity gain, starting at zero with no fades
    pub fn new(buffer: AudioBuffer) -> Self {
        Self {
            buffer,
            gain: 1.0,
            start_offset_secs: 0.0,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
        }
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_offset(mut self, start_offset_secs: f64) -> Self {
        self.start_offset_secs = start_offset_secs;
        self
    }

    pub fn with_fades(mut self, fade_in_secs: f64, fade_out_secs: f64) -> Self {
        self.fade_in_secs = fade_in_secs;
        self.fade_out_secs = fade_out_secs;
        self
    }

    /// Track duration in seconds at its own sample rate
    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }

    /// End of the track's window in the mix timeline
    pub fn end_secs(&self) -> f64 {
        self.start_offset_secs + self.duration_secs()
    }

    /// Check the track's format, gain, offset and fades
    pub fn validate(&self) -> Result<()> {
        self.buffer.check_format()?;

        if !self.gain.is_finite() || !(0.0..=MAX_TRACK_GAIN).contains(&self.gain) {
            return Err(RemixError::invalid_parameter("gain", self.gain, "0.0 to 2.0"));
        }
        for (param, value) in [
            ("startOffset", self.start_offset_secs),
            ("fadeIn", self.fade_in_secs),
            ("fadeOut", self.fade_out_secs),
        ] {
            if !value.is_finite() || !(0.0..=MAX_MIX_SECS).contains(&value) {
                return Err(RemixError::invalid_parameter(param, value, "0 to 3600 seconds"));
            }
        }
        Ok(())
    }

    /// Per-frame gain envelope at `sample_rate` for `frames` frames
    ///
    /// Fade lengths are rounded to frames and clamped to the track length. Within
    /// the fade-in the gain rises as `gain * i / fade_in`; within the fade-out it
    /// falls as `gain * (frames - 1 - i) / fade_out`. Overlapping fades take the
    /// smaller of the two.
    pub(crate) fn envelope(&self, frames: usize, sample_rate: u32) -> impl Iterator<Item = f32> {
        let fade_in = secs_to_frames(self.fade_in_secs, sample_rate).min(frames);
        let fade_out = secs_to_frames(self.fade_out_secs, sample_rate).min(frames);
        let gain = self.gain;

        (0..frames).map(move |i| {
            let mut g = gain;
            if i < fade_in {
                g = g.min(gain * i as f32 / fade_in as f32);
            }
            let from_end = frames - 1 - i;
            if from_end < fade_out {
                g = g.min(gain * from_end as f32 / fade_out as f32);
            }
            g
        })
    }
}

/// Everything the mixer needs for one mixdown
#[derive(Debug, Clone, PartialEq)]
pub struct MixRequest {
    /// Tracks in order; must not be empty
    pub tracks: Vec<Track>,
    /// Output sample rate
    pub sample_rate: u32,
    /// Output channel count
    pub channels: usize,
}

impl MixRequest {
    /// Request at the default output format (48 kHz stereo)
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }

    pub fn with_format(mut self, sample_rate: u32, channels: usize) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self
    }

    /// Mix length: the latest track end
    pub fn duration_secs(&self) -> f64 {
        self.tracks
            .iter()
            .map(Track::end_secs)
            .fold(0.0, f64::max)
    }

    /// Check the request before any work is done
    ///
    /// # Errors
    /// * `EmptyMix` - no tracks
    /// * `InvalidFormat` - zero output rate or channels, or a track with either
    /// * `InvalidParameter` - a track's gain, offset or fades are out of range
    pub fn validate(&self) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(RemixError::EmptyMix);
        }
        if self.sample_rate == 0 {
            return Err(RemixError::invalid_format("output sample rate must be greater than 0"));
        }
        if self.channels == 0 {
            return Err(RemixError::invalid_format("output channel count must be at least 1"));
        }
        self.tracks.iter().try_for_each(Track::validate)
    }
}
