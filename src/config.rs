//! Remix configuration
//!
//! JSON configuration (camelCase keys) for a remix: output format, mix
//! settings, the take's effect and trim, and meter thresholds. Every section
//! is optional and falls back to its defaults.
//!
//! ```json
//! {
//!   "output": { "sampleRate": 48000, "channels": 2 },
//!   "mix": { "originalVolume": 0.8, "remixVolume": 1.0, "mixMode": "overlay" },
//!   "effect": { "kind": "echo", "delay": 0.3, "feedback": 0.4, "wetLevel": 0.5 },
//!   "trim": { "start": 0.5, "end": 0.0 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::{self, EchoParams, EffectRequest, ReverbParams, TrimRange, VoiceKind, VoiceParams};
use crate::engine::codec::AudioBlob;
use crate::engine::pipeline::RemixJob;
use crate::error::{RemixError, Result};
use crate::meter::MeterConfig;
use crate::mixer::{MixSettings, OutputFormat};

/// Default voice filter intensity when none is configured
const DEFAULT_VOICE_INTENSITY: f32 = 1.0;

/// Effect section as written in configuration
///
/// Only the fields of the selected `kind` are read; missing ones take the
/// effect's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectConfig {
    /// `none`, `echo`, `reverb` or `voiceFilter`
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet_level: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damping: Option<f32>,
    /// Voice filter flavour
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub voice_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            kind: "none".to_string(),
            delay: None,
            feedback: None,
            wet_level: None,
            room_size: None,
            damping: None,
            voice_type: None,
            intensity: None,
        }
    }
}

impl EffectConfig {
    /// Resolve into an effect request
    ///
    /// # Errors
    /// `UnsupportedEffect` for an unknown kind or voice type.
    pub fn to_request(&self) -> Result<EffectRequest> {
        let request = match self.kind.trim().to_ascii_lowercase().as_str() {
            "" | "none" => EffectRequest::None,
            "echo" => {
                let defaults = EchoParams::default();
                EffectRequest::Echo(EchoParams {
                    delay_secs: self.delay.unwrap_or(defaults.delay_secs),
                    feedback: self.feedback.unwrap_or(defaults.feedback),
                    wet_level: self.wet_level.unwrap_or(defaults.wet_level),
                })
            }
            "reverb" => {
                let defaults = ReverbParams::default();
                EffectRequest::Reverb(ReverbParams {
                    room_size: self.room_size.unwrap_or(defaults.room_size),
                    damping: self.damping.unwrap_or(defaults.damping),
                    wet_level: self.wet_level.unwrap_or(defaults.wet_level),
                })
            }
            "voicefilter" | "voice_filter" | "voice" => {
                let kind: VoiceKind = self
                    .voice_type
                    .as_deref()
                    .ok_or_else(|| RemixError::UnsupportedEffect {
                        kind: "voiceFilter without a type".to_string(),
                    })?
                    .parse()?;
                EffectRequest::VoiceFilter(VoiceParams {
                    kind,
                    intensity: self.intensity.unwrap_or(DEFAULT_VOICE_INTENSITY),
                })
            }
            _ => {
                return Err(RemixError::UnsupportedEffect {
                    kind: self.kind.clone(),
                })
            }
        };
        Ok(request)
    }

    /// Configuration describing `request`
    pub fn from_request(request: &EffectRequest) -> Self {
        let mut config = Self {
            kind: request.kind_name().to_string(),
            ..Self::default()
        };
        match *request {
            EffectRequest::None => {}
            EffectRequest::Echo(p) => {
                config.delay = Some(p.delay_secs);
                config.feedback = Some(p.feedback);
                config.wet_level = Some(p.wet_level);
            }
            EffectRequest::Reverb(p) => {
                config.room_size = Some(p.room_size);
                config.damping = Some(p.damping);
                config.wet_level = Some(p.wet_level);
            }
            EffectRequest::VoiceFilter(p) => {
                config.voice_type = Some(p.kind.to_string());
                config.intensity = Some(p.intensity);
            }
        }
        config
    }
}

/// Complete remix configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemixConfig {
    pub output: OutputFormat,
    pub mix: MixSettings,
    pub effect: EffectConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<TrimRange>,
    pub meter: MeterConfig,
}

impl RemixConfig {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// * `Io` - the file cannot be read
    /// * `Serialization` - the file is not valid configuration JSON
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every section, yielding the same errors processing would
    pub fn validate(&self) -> Result<()> {
        self.output.validate()?;
        self.mix.validate()?;
        dsp::validate(&self.effect.to_request()?)?;
        if let Some(trim) = &self.trim {
            trim.validate()?;
        }
        self.meter.validate()
    }

    /// Build a pipeline job for `original` and `take` from this configuration
    pub fn job(&self, original: AudioBlob, take: AudioBlob) -> Result<RemixJob> {
        self.validate()?;
        let mut job = RemixJob::new(original, take)
            .with_effect(self.effect.to_request()?)
            .with_settings(self.mix)
            .with_output(self.output);
        job.trim = self.trim;
        Ok(job)
    }
}
