//! Track Mixer
//!
//! Combines an ordered set of tracks, each with gain, start offset and fades,
//! into one buffer at a target format, preventing clipping by global rescale.

pub mod mixdown;
pub mod settings;
pub mod track;

pub use mixdown::{mix, prevent_clipping, CLIP_THRESHOLD};
pub use settings::{MixMode, MixSettings, OutputFormat};
pub use track::{MixRequest, Track, MAX_MIX_SECS, MAX_TRACK_GAIN};
