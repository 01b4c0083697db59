//! Effect definitions
//!
//! The request type callers build, and the trait each offline effect implements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{RemixError, Result};

/// Offline effect rendering a whole buffer into a new one
///
/// Implementations never touch their input; the rendered buffer has the same
/// channel count and sample rate, and is at least as long as the input.
pub trait Effect {
    /// Effect type identifier used in logs and errors
    fn effect_type(&self) -> &'static str;

    /// Check parameters are inside their allowed domains
    fn validate(&self) -> Result<()>;

    /// Frames appended after the input to let the effect ring out
    fn tail_frames(&self, sample_rate: u32) -> usize;

    /// Render the effect. Callers validate first.
    fn render(&self, input: &AudioBuffer) -> AudioBuffer;
}

/// Voice transformation flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoiceKind {
    /// Ring modulation against a fixed low carrier; flattens pitch into a buzzy monotone
    Robot,
    /// Pitch shifted up
    Chipmunk,
    /// Pitch shifted down
    Deep,
    /// Band-limited to the 300-3400 Hz telephone band
    Telephone,
}

impl VoiceKind {
    /// All supported kinds
    pub const ALL: [VoiceKind; 4] = [
        VoiceKind::Robot,
        VoiceKind::Chipmunk,
        VoiceKind::Deep,
        VoiceKind::Telephone,
    ];

    /// Configuration name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceKind::Robot => "robot",
            VoiceKind::Chipmunk => "chipmunk",
            VoiceKind::Deep => "deep",
            VoiceKind::Telephone => "telephone",
        }
    }
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceKind {
    type Err = RemixError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        VoiceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| RemixError::UnsupportedEffect {
                kind: format!("voiceFilter/{}", s.trim()),
            })
    }
}

/// Echo parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoParams {
    /// Delay between repeats in seconds (> 0)
    pub delay_secs: f32,
    /// Feedback amount (0 to <1)
    pub feedback: f32,
    /// Level of the echoes added to the dry signal (0-1)
    pub wet_level: f32,
}

impl Default for EchoParams {
    fn default() -> Self {
        Self {
            delay_secs: 0.3,
            feedback: 0.4,
            wet_level: 0.5,
        }
    }
}

/// Reverb parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    /// Room size: 0 (small) to 1 (hall)
    pub room_size: f32,
    /// Damping: 0 (bright) to 1 (dark)
    pub damping: f32,
    /// Level of the reverberated signal added to the dry signal (0-1)
    pub wet_level: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.3,
        }
    }
}

/// Voice filter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Transformation to apply
    pub kind: VoiceKind,
    /// Effect strength: 0 is identity, 1 is the full effect
    pub intensity: f32,
}

/// A single effect to apply to a track
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EffectRequest {
    /// Pass through unchanged
    #[default]
    None,
    Echo(EchoParams),
    Reverb(ReverbParams),
    VoiceFilter(VoiceParams),
}

impl EffectRequest {
    /// Configuration name of the requested effect
    pub fn kind_name(&self) -> &'static str {
        match self {
            EffectRequest::None => "none",
            EffectRequest::Echo(_) => "echo",
            EffectRequest::Reverb(_) => "reverb",
            EffectRequest::VoiceFilter(_) => "voiceFilter",
        }
    }
}

/// Require `value` to lie in [0, 1]
pub(crate) fn check_unit(param: &str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RemixError::invalid_parameter(param, value, "0.0 to 1.0"))
    }
}
