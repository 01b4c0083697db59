//! Remix session state machine
//!
//! Tracks one remix from capture to the finished artifact:
//!
//! `Idle -> Capturing -> Captured -> [Trimming] -> [EffectProcessing] -> Mixing -> Encoding -> Ready`
//!
//! Every transition consumes the current state and returns the next one, so no
//! stage can observe data from a state that has been left. Any state may fail
//! or reset.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::codec::AudioBlob;
use crate::engine::encoder::EncodedAudio;
use crate::error::{RemixError, Result};

/// Session phase without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Capturing,
    Captured,
    Trimming,
    EffectProcessing,
    Mixing,
    Encoding,
    Ready,
    Failed,
}

impl Phase {
    /// Whether the session is between capture and a finished artifact
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            Phase::Trimming | Phase::EffectProcessing | Phase::Mixing | Phase::Encoding
        )
    }

    /// Whether no further processing will happen without a new capture or reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Ready | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Capturing => write!(f, "capturing"),
            Phase::Captured => write!(f, "captured"),
            Phase::Trimming => write!(f, "trimming"),
            Phase::EffectProcessing => write!(f, "applying an effect"),
            Phase::Mixing => write!(f, "mixing"),
            Phase::Encoding => write!(f, "encoding"),
            Phase::Ready => write!(f, "ready"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

/// Input driving the session forward
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StartCapture,
    CaptureFinished(AudioBlob),
    BeginTrim,
    BeginEffect,
    BeginMix,
    BeginEncode,
    Encoded(EncodedAudio),
    Fail(String),
    Reset,
}

impl SessionEvent {
    /// Human-readable verb phrase used in transition errors
    pub fn describe(&self) -> &'static str {
        match self {
            SessionEvent::StartCapture => "start capture",
            SessionEvent::CaptureFinished(_) => "finish capture",
            SessionEvent::BeginTrim => "begin trimming",
            SessionEvent::BeginEffect => "begin effect processing",
            SessionEvent::BeginMix => "begin mixing",
            SessionEvent::BeginEncode => "begin encoding",
            SessionEvent::Encoded(_) => "finish encoding",
            SessionEvent::Fail(_) => "fail",
            SessionEvent::Reset => "reset",
        }
    }
}

/// Session state with the data owned in each phase
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Capturing,
    Captured { take: AudioBlob },
    Trimming { take: AudioBlob },
    EffectProcessing { take: AudioBlob },
    Mixing { take: AudioBlob },
    Encoding { take: AudioBlob },
    Ready { output: EncodedAudio },
    Failed { reason: String },
}

impl SessionState {
    /// Phase of this state
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Idle => Phase::Idle,
            SessionState::Capturing => Phase::Capturing,
            SessionState::Captured { .. } => Phase::Captured,
            SessionState::Trimming { .. } => Phase::Trimming,
            SessionState::EffectProcessing { .. } => Phase::EffectProcessing,
            SessionState::Mixing { .. } => Phase::Mixing,
            SessionState::Encoding { .. } => Phase::Encoding,
            SessionState::Ready { .. } => Phase::Ready,
            SessionState::Failed { .. } => Phase::Failed,
        }
    }

    /// Recorded take, while one is held
    pub fn take(&self) -> Option<&AudioBlob> {
        match self {
            SessionState::Captured { take }
            | SessionState::Trimming { take }
            | SessionState::EffectProcessing { take }
            | SessionState::Mixing { take }
            | SessionState::Encoding { take } => Some(take),
            _ => None,
        }
    }

    /// Finished artifact, once ready
    pub fn output(&self) -> Option<&EncodedAudio> {
        match self {
            SessionState::Ready { output } => Some(output),
            _ => None,
        }
    }

    /// Consume a ready session and hand the artifact over
    pub fn into_output(self) -> Option<EncodedAudio> {
        match self {
            SessionState::Ready { output } => Some(output),
            _ => None,
        }
    }

    /// Apply an event, returning the next state
    ///
    /// State transitions:
    /// - Idle/Captured/Ready/Failed + StartCapture -> Capturing
    /// - Capturing + CaptureFinished -> Captured
    /// - Captured + BeginTrim -> Trimming
    /// - Captured/Trimming + BeginEffect -> EffectProcessing
    /// - Captured/Trimming/EffectProcessing + BeginMix -> Mixing
    /// - Mixing + BeginEncode -> Encoding
    /// - Encoding + Encoded -> Ready
    /// - Any + Fail -> Failed, Any + Reset -> Idle
    ///
    /// # Errors
    /// `InvalidTransition` for every other pair
    pub fn apply(self, event: SessionEvent) -> Result<SessionState> {
        let from = self.phase();
        let describe = event.describe();

        let next = match (self, event) {
            (_, SessionEvent::Reset) => SessionState::Idle,
            (_, SessionEvent::Fail(reason)) => SessionState::Failed { reason },

            (
                SessionState::Idle
                | SessionState::Captured { .. }
                | SessionState::Ready { .. }
                | SessionState::Failed { .. },
                SessionEvent::StartCapture,
            ) => SessionState::Capturing,

            (SessionState::Capturing, SessionEvent::CaptureFinished(take)) => {
                SessionState::Captured { take }
            }

            (SessionState::Captured { take }, SessionEvent::BeginTrim) => {
                SessionState::Trimming { take }
            }

            (
                SessionState::Captured { take } | SessionState::Trimming { take },
                SessionEvent::BeginEffect,
            ) => SessionState::EffectProcessing { take },

            (
                SessionState::Captured { take }
                | SessionState::Trimming { take }
                | SessionState::EffectProcessing { take },
                SessionEvent::BeginMix,
            ) => SessionState::Mixing { take },

            (SessionState::Mixing { take }, SessionEvent::BeginEncode) => {
                SessionState::Encoding { take }
            }

            (SessionState::Encoding { .. }, SessionEvent::Encoded(output)) => {
                SessionState::Ready { output }
            }

            _ => {
                return Err(RemixError::InvalidTransition {
                    from,
                    event: describe.to_string(),
                })
            }
        };

        debug!(from = %from, to = %next.phase(), "session transition");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::encoder::encode_wav;
    use crate::engine::AudioBuffer;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn blob() -> AudioBlob {
        AudioBlob::new(vec![1, 2, 3], "audio/webm;codecs=opus")
    }

    fn encoded() -> EncodedAudio {
        encode_wav(&AudioBuffer::new(4, 1, 8000)).unwrap()
    }

    fn captured() -> SessionState {
        SessionState::Idle
            .apply(SessionEvent::StartCapture)
            .unwrap()
            .apply(SessionEvent::CaptureFinished(blob()))
            .unwrap()
    }

    #[test]
    fn test_full_flow() {
        let state = captured();
        assert_eq!(state.phase(), Phase::Captured);
        assert_eq!(state.take(), Some(&blob()));

        let state = state
            .apply(SessionEvent::BeginTrim)
            .and_then(|s| s.apply(SessionEvent::BeginEffect))
            .and_then(|s| s.apply(SessionEvent::BeginMix))
            .and_then(|s| s.apply(SessionEvent::BeginEncode))
            .unwrap();
        assert_eq!(state.phase(), Phase::Encoding);
        assert_eq!(state.take(), Some(&blob()));

        let state = state.apply(SessionEvent::Encoded(encoded())).unwrap();
        assert_eq!(state.phase(), Phase::Ready);
        assert!(state.take().is_none());
        assert_eq!(state.into_output(), Some(encoded()));
    }

    #[test]
    fn test_optional_stages_can_be_skipped() {
        let state = captured().apply(SessionEvent::BeginMix).unwrap();
        assert_eq!(state.phase(), Phase::Mixing);

        let state = captured()
            .apply(SessionEvent::BeginEffect)
            .and_then(|s| s.apply(SessionEvent::BeginMix))
            .unwrap();
        assert_eq!(state.phase(), Phase::Mixing);
    }

    #[test]
    fn test_recapture_from_ready() {
        let ready = captured()
            .apply(SessionEvent::BeginMix)
            .and_then(|s| s.apply(SessionEvent::BeginEncode))
            .and_then(|s| s.apply(SessionEvent::Encoded(encoded())))
            .unwrap();
        let state = ready.apply(SessionEvent::StartCapture).unwrap();
        assert_eq!(state, SessionState::Capturing);
    }

    #[test_case(SessionState::Idle, SessionEvent::BeginMix ; "mix before capture")]
    #[test_case(SessionState::Idle, SessionEvent::CaptureFinished(blob()) ; "finish without start")]
    #[test_case(SessionState::Capturing, SessionEvent::StartCapture ; "double start")]
    #[test_case(SessionState::Capturing, SessionEvent::BeginTrim ; "trim while capturing")]
    #[test_case(SessionState::Mixing { take: blob() }, SessionEvent::BeginTrim ; "trim after mix")]
    #[test_case(SessionState::Mixing { take: blob() }, SessionEvent::Encoded(encoded()) ; "encoded before encode")]
    #[test_case(SessionState::Trimming { take: blob() }, SessionEvent::BeginEncode ; "encode before mix")]
    fn test_invalid_transitions(state: SessionState, event: SessionEvent) {
        let from = state.phase();
        let err = state.apply(event).unwrap_err();
        assert!(matches!(err, RemixError::InvalidTransition { from: f, .. } if f == from));
    }

    #[test]
    fn test_fail_and_reset_from_anywhere() {
        for state in [
            SessionState::Idle,
            SessionState::Capturing,
            captured(),
            SessionState::Encoding { take: blob() },
        ] {
            let failed = state
                .clone()
                .apply(SessionEvent::Fail("decoder crashed".to_string()))
                .unwrap();
            assert_eq!(
                failed,
                SessionState::Failed {
                    reason: "decoder crashed".to_string()
                }
            );
            assert!(failed.phase().is_terminal());
            assert_eq!(state.apply(SessionEvent::Reset).unwrap(), SessionState::Idle);
        }
    }

    #[test]
    fn test_error_message() {
        let err = SessionState::Idle.apply(SessionEvent::BeginMix).unwrap_err();
        assert_eq!(err.to_string(), "Cannot begin mixing while idle");
    }

    #[test]
    fn test_phase_flags() {
        assert!(Phase::Mixing.is_processing());
        assert!(!Phase::Captured.is_processing());
        assert!(!Phase::Idle.is_terminal());
    }
}
