//! Error handling for Remixer
//!
//! Every failure in the pipeline is returned to the caller; none of them abort the process.
//! The calling layer decides how to present them and whether to offer a retry.

use thiserror::Error;

use crate::engine::session::Phase;

/// Result type alias for Remixer operations
pub type Result<T> = std::result::Result<T, RemixError>;

/// Main error type for Remixer operations
#[derive(Error, Debug)]
pub enum RemixError {
    // Input Errors
    #[error("Cannot decode {mime_type} audio: {reason}")]
    Decode {
        mime_type: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Processing Errors
    #[error(
        "Invalid trim range: {start_secs:.3}s from start and {end_secs:.3}s from end of a {duration_secs:.3}s buffer"
    )]
    InvalidRange {
        start_secs: f64,
        end_secs: f64,
        duration_secs: f64,
    },

    #[error("Invalid parameter: {param} = {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: f64,
        expected: String,
    },

    #[error("Unsupported effect: {kind}")]
    UnsupportedEffect { kind: String },

    #[error("Cannot mix an empty track list")]
    EmptyMix,

    #[error("Invalid audio format: {reason}")]
    InvalidFormat { reason: String },

    #[error("DSP overflow: {effect} produced invalid audio (NaN/Inf)")]
    DspOverflow { effect: String },

    // Device Errors
    #[error("Capture device error: {reason}")]
    Device { reason: String },

    // Session Errors
    #[error("Cannot {event} while {from}")]
    InvalidTransition { from: Phase, event: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Processing error: {reason}")]
    Processing { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemixError {
    /// Shorthand for building an `InvalidParameter` error
    pub(crate) fn invalid_parameter(param: &str, value: impl Into<f64>, expected: &str) -> Self {
        RemixError::InvalidParameter {
            param: param.to_string(),
            value: value.into(),
            expected: expected.to_string(),
        }
    }

    /// Shorthand for building an `InvalidFormat` error
    pub(crate) fn invalid_format(reason: impl Into<String>) -> Self {
        RemixError::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            RemixError::Decode { .. } => "DECODE_ERROR",
            RemixError::InvalidRange { .. } => "INVALID_RANGE",
            RemixError::InvalidParameter { .. } => "INVALID_PARAMETER",
            RemixError::UnsupportedEffect { .. } => "UNSUPPORTED_EFFECT",
            RemixError::EmptyMix => "EMPTY_MIX",
            RemixError::InvalidFormat { .. } => "INVALID_FORMAT",
            RemixError::DspOverflow { .. } => "DSP_OVERFLOW",
            RemixError::Device { .. } => "DEVICE_ERROR",
            RemixError::InvalidTransition { .. } => "INVALID_TRANSITION",
            RemixError::Cancelled => "CANCELLED",
            RemixError::Processing { .. } => "PROCESSING_ERROR",
            RemixError::Io(_) => "IO_ERROR",
            RemixError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave no artifact behind and the user can simply retry.
    /// Invalid transitions and task failures indicate a bug in the caller or the engine.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            RemixError::InvalidTransition { .. } | RemixError::Processing { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RemixError::Decode { .. } => vec![
                "Record the take again",
                "Check the clip plays in another application",
                "Supported inputs: audio/webm, audio/ogg;codecs=opus, audio/wav",
            ],
            RemixError::InvalidRange { .. } => vec![
                "Trim less from the start or the end",
                "Leave at least a short section of the recording",
            ],
            RemixError::InvalidParameter { .. } => vec![
                "Move the effect or volume slider back into range",
                "Echo feedback must stay below 100%",
            ],
            RemixError::UnsupportedEffect { .. } => {
                vec!["Supported effects: none, echo, reverb, voiceFilter"]
            }
            RemixError::EmptyMix => vec!["Record or select at least one track before mixing"],
            RemixError::InvalidFormat { .. } => vec![
                "Re-record the take",
                "Check the output sample rate and channel count",
            ],
            RemixError::DspOverflow { .. } => vec![
                "The effect settings may be too extreme",
                "Try reducing the effect intensity",
            ],
            RemixError::Device { .. } => vec![
                "Allow microphone access when prompted",
                "Check no other application is using the microphone",
            ],
            RemixError::Cancelled => vec!["Start the remix again when ready"],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            RemixError::Decode { .. } => {
                "We couldn't read that audio. Want to try recording again?".to_string()
            }
            RemixError::InvalidRange { .. } => {
                "That trim would remove the whole recording. Try trimming a little less."
                    .to_string()
            }
            RemixError::Device { reason } => {
                format!("We couldn't use your microphone ({}). Check permissions and try again.", reason)
            }
            RemixError::DspOverflow { effect } => {
                format!("The {} effect went a bit wild. Try gentler settings.", effect)
            }
            RemixError::EmptyMix => "There's nothing to mix yet. Record a take first.".to_string(),
            RemixError::Cancelled => "Remix cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}
