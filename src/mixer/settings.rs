//! Mix settings
//!
//! User-facing mix controls for the common case of one original clip and one
//! recorded take, and the conversion into a [`MixRequest`].

use serde::{Deserialize, Serialize};

use crate::engine::buffer::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use crate::engine::AudioBuffer;
use crate::error::{RemixError, Result};
use crate::mixer::track::{MixRequest, Track};

/// How the take is placed relative to the original
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MixMode {
    /// Both start at zero and play together
    #[default]
    Overlay,
    /// The take starts when the original ends
    Sequential,
}

/// Output sample rate and channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: usize,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl OutputFormat {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(RemixError::invalid_format("output sample rate must be greater than 0"));
        }
        if self.channels == 0 {
            return Err(RemixError::invalid_format("output channel count must be at least 1"));
        }
        Ok(())
    }
}

/// Volumes and placement for an original/take mix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MixSettings {
    /// Gain applied to the original clip (0-1)
    pub original_volume: f32,
    /// Gain applied to the recorded take (0-1)
    pub remix_volume: f32,
    pub mix_mode: MixMode,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            original_volume: 1.0,
            remix_volume: 1.0,
            mix_mode: MixMode::Overlay,
        }
    }
}

impl MixSettings {
    /// Check both volumes lie in [0, 1]
    pub fn validate(&self) -> Result<()> {
        for (param, value) in [
            ("originalVolume", self.original_volume),
            ("remixVolume", self.remix_volume),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(RemixError::invalid_parameter(param, value, "0.0 to 1.0"));
            }
        }
        Ok(())
    }

    /// Build the mix request for an original clip and a take
    ///
    /// `extra` tracks are appended unchanged after the two main tracks.
    pub fn build_request(
        &self,
        original: AudioBuffer,
        take: AudioBuffer,
        extra: Vec<Track>,
        format: OutputFormat,
    ) -> Result<MixRequest> {
        self.validate()?;
        format.validate()?;

        let take_offset = match self.mix_mode {
            MixMode::Overlay => 0.0,
            MixMode::Sequential => original.duration_secs(),
        };

        let mut tracks = Vec::with_capacity(2 + extra.len());
        tracks.push(Track::new(original).with_gain(self.original_volume));
        tracks.push(
            Track::new(take)
                .with_gain(self.remix_volume)
                .with_offset(take_offset),
        );
        tracks.extend(extra);

        Ok(MixRequest::new(tracks).with_format(format.sample_rate, format.channels))
    }
}
