//! DSP Effects Library
//!
//! Offline processing applied to a single track before mixing: trimming and one
//! of echo, reverb or voice filter. Every operation renders into a new buffer.

mod echo;
mod effect;
mod processor;
mod reverb;
mod trim;
mod voice;

pub use echo::Echo;
pub use effect::{EchoParams, Effect, EffectRequest, ReverbParams, VoiceKind, VoiceParams};
pub use processor::{apply, build_effect, validate};
pub use reverb::Reverb;
pub use trim::{trim, TrimRange};
pub use voice::VoiceFilter;
