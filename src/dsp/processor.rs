//! Effects processor
//!
//! Dispatches an [`EffectRequest`] to its effect, validates parameters before
//! rendering and rejects output that went non-finite.

use tracing::debug;

use crate::dsp::echo::Echo;
use crate::dsp::effect::{Effect, EffectRequest};
use crate::dsp::reverb::Reverb;
use crate::dsp::voice::VoiceFilter;
use crate::engine::AudioBuffer;
use crate::error::{RemixError, Result};

/// Build the effect for a request, `None` for a pass-through request
pub fn build_effect(request: &EffectRequest) -> Option<Box<dyn Effect + Send>> {
    match *request {
        EffectRequest::None => None,
        EffectRequest::Echo(params) => Some(Box::new(Echo::new(params))),
        EffectRequest::Reverb(params) => Some(Box::new(Reverb::new(params))),
        EffectRequest::VoiceFilter(params) => Some(Box::new(VoiceFilter::new(params))),
    }
}

/// Check the request's parameters without rendering anything
pub fn validate(request: &EffectRequest) -> Result<()> {
    match build_effect(request) {
        Some(effect) => effect.validate(),
        None => Ok(()),
    }
}

/// Apply a single effect, returning a new buffer
///
/// # Arguments
/// * `buffer` - Input audio; left untouched
/// * `request` - Effect and parameters
///
/// # Errors
/// * `InvalidFormat` - buffer has no channels or a zero sample rate
/// * `InvalidParameter` - a parameter is outside its domain
/// * `DspOverflow` - rendering produced NaN or infinite samples
pub fn apply(buffer: &AudioBuffer, request: &EffectRequest) -> Result<AudioBuffer> {
    buffer.check_format()?;

    let Some(effect) = build_effect(request) else {
        return Ok(buffer.clone());
    };
    effect.validate()?;

    debug!(
        effect = effect.effect_type(),
        frames = buffer.num_frames(),
        channels = buffer.num_channels(),
        sample_rate = buffer.sample_rate,
        "rendering effect"
    );

    let output = effect.render(buffer);
    if !output.is_finite() {
        return Err(RemixError::DspOverflow {
            effect: effect.effect_type().to_string(),
        });
    }
    Ok(output)
}
