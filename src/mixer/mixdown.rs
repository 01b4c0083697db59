//! Mixdown
//!
//! Sums every track into one buffer at the requested format:
//! 1. Validate the request
//! 2. Convert each track to the output channel count and sample rate
//! 3. Allocate the output for the latest track end
//! 4. Add each track under its gain envelope at its start offset
//! 5. Rescale the whole mix if it would clip

use tracing::{debug, warn};

use crate::engine::buffer::secs_to_frames;
use crate::engine::resample;
use crate::engine::AudioBuffer;
use crate::error::{RemixError, Result};
use crate::mixer::track::{MixRequest, Track};

/// Highest absolute sample value allowed in the mix
pub const CLIP_THRESHOLD: f32 = 1.0;

/// Mix all tracks of `request` into a single buffer
///
/// The mix length is the latest `start_offset + duration` of any track, in
/// output frames. Overlapping tracks add. If the summed peak exceeds
/// [`CLIP_THRESHOLD`], every sample is multiplied by `1 / peak`, so the mix keeps
/// its internal balance and peaks at exactly 1.0; otherwise samples are untouched.
///
/// # Errors
/// * `EmptyMix` - the request has no tracks
/// * `InvalidFormat` - zero output rate/channels or a malformed track buffer
/// * `InvalidParameter` - a track's gain, offset or fades are out of range
/// * `InvalidFormat` - a track's end does not fit in memory addressing
pub fn mix(request: MixRequest) -> Result<AudioBuffer> {
    request.validate()?;

    let MixRequest {
        tracks,
        sample_rate,
        channels,
    } = request;

    // Every track is converted before the output length is known
    let placed = tracks
        .into_iter()
        .map(|track| place(track, sample_rate, channels))
        .collect::<Result<Vec<_>>>()?;

    let total_frames = placed
        .iter()
        .map(|p| {
            p.offset
                .checked_add(p.buffer.num_frames())
                .ok_or_else(|| RemixError::invalid_format("track end overflows the mix length"))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .max()
        .unwrap_or(0);

    debug!(
        tracks = placed.len(),
        total_frames, sample_rate, channels, "mixing tracks"
    );

    let mut output = AudioBuffer::new(total_frames, channels, sample_rate);
    for p in &placed {
        let frames = p.buffer.num_frames();
        let envelope: Vec<f32> = p.track.envelope(frames, sample_rate).collect();

        for (out, src) in output.samples.iter_mut().zip(&p.buffer.samples) {
            let window = &mut out[p.offset..p.offset + frames];
            for ((o, &s), &g) in window.iter_mut().zip(src).zip(&envelope) {
                *o += s * g;
            }
        }
    }

    prevent_clipping(&mut output);
    Ok(output)
}

/// Track converted to the output format with its offset in output frames
struct Placed {
    track: Track,
    buffer: AudioBuffer,
    offset: usize,
}

fn place(mut track: Track, sample_rate: u32, channels: usize) -> Result<Placed> {
    let source = std::mem::take(&mut track.buffer);
    let buffer = resample::convert(source, sample_rate, channels)?;
    let offset = secs_to_frames(track.start_offset_secs, sample_rate);
    Ok(Placed {
        track,
        buffer,
        offset,
    })
}

/// Global rescale: scale the whole buffer by `1 / peak` when the peak exceeds the threshold
///
/// Returns the gain applied (1.0 when untouched).
pub fn prevent_clipping(buffer: &mut AudioBuffer) -> f32 {
    let peak = buffer.peak();
    if peak <= CLIP_THRESHOLD {
        return 1.0;
    }

    let gain = CLIP_THRESHOLD / peak;
    warn!(peak, gain, "mix exceeds full scale, rescaling");
    buffer.scale(gain);
    gain
}
