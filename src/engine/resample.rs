//! Format conversion
//!
//! Channel remapping and sample rate conversion used to bring every track to the
//! mix format. Sample rate conversion uses linear interpolation, which is
//! deterministic for identical inputs.

use crate::engine::buffer::AudioBuffer;
use crate::error::{RemixError, Result};

/// Convert `buffer` to `target_channels` channels at `target_rate`
///
/// Returns the input unchanged when it already matches.
pub fn convert(
    buffer: AudioBuffer,
    target_rate: u32,
    target_channels: usize,
) -> Result<AudioBuffer> {
    buffer.check_format()?;
    if target_rate == 0 {
        return Err(RemixError::invalid_format("target sample rate must be greater than 0"));
    }
    if target_channels == 0 {
        return Err(RemixError::invalid_format("target channel count must be at least 1"));
    }

    let remapped = remap_channels(buffer, target_channels);
    if remapped.sample_rate == target_rate {
        return Ok(remapped);
    }

    let source_rate = remapped.sample_rate;
    let samples = remapped
        .samples
        .iter()
        .map(|channel| resample_linear(channel, source_rate, target_rate))
        .collect();

    Ok(AudioBuffer {
        samples,
        sample_rate: target_rate,
    })
}

/// Remap channels
///
/// Mono is duplicated to every output channel, anything folded to mono is averaged,
/// and other layouts read source channel `i % source_channels`.
pub fn remap_channels(buffer: AudioBuffer, target_channels: usize) -> AudioBuffer {
    let source_channels = buffer.num_channels();
    if source_channels == target_channels {
        return buffer;
    }

    let sample_rate = buffer.sample_rate;
    let samples = if target_channels == 1 {
        let frames = buffer.num_frames();
        let scale = 1.0 / source_channels as f32;
        let mut mono = vec![0.0_f32; frames];
        for channel in &buffer.samples {
            for (out, &s) in mono.iter_mut().zip(channel) {
                *out += s * scale;
            }
        }
        vec![mono]
    } else {
        (0..target_channels)
            .map(|ch| buffer.samples[ch % source_channels].clone())
            .collect()
    };

    AudioBuffer {
        samples,
        sample_rate,
    }
}

/// Linear interpolation resampling
///
/// Output length is `ceil(len * target_rate / source_rate)`, computed in integers so
/// whole-second buffers map to whole-second buffers.
/// TODO: replace with windowed sinc interpolation to reduce aliasing when downsampling
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let source_len = samples.len();
    let (source, target) = (source_rate as u64, target_rate as u64);
    let target_len = ((source_len as u64 * target + source - 1) / source) as usize;
    let step = source_rate as f64 / target_rate as f64;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 * step;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_linear_upsample() {
        let resampled = resample_linear(&[0.0, 1.0, 0.0], 1, 2);
        assert_eq!(resampled.len(), 6);
        assert!((resampled[1] - 0.5).abs() < 1e-6);
        assert!((resampled[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_resample_linear_downsample() {
        let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -0.5];
        let resampled = resample_linear(&samples, 2, 1);
        assert_eq!(resampled, vec![0.0, 1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_resample_is_deterministic() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin()).collect();
        assert_eq!(
            resample_linear(&samples, 44100, 48000),
            resample_linear(&samples, 44100, 48000)
        );
    }

    #[test]
    fn test_mono_to_stereo_duplicates() {
        let mono = AudioBuffer::from_channels(vec![vec![0.1, 0.2]], 48000).unwrap();
        let stereo = remap_channels(mono, 2);
        assert_eq!(stereo.num_channels(), 2);
        assert_eq!(stereo.channel(0), stereo.channel(1));
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let stereo =
            AudioBuffer::from_channels(vec![vec![1.0, 0.0], vec![0.0, -1.0]], 48000).unwrap();
        let mono = remap_channels(stereo, 1);
        assert_eq!(mono.channel(0), &[0.5, -0.5]);
    }

    #[test]
    fn test_convert_rate_and_channels() {
        let buffer = AudioBuffer::new(44100, 1, 44100);
        let converted = convert(buffer, 48000, 2).unwrap();
        assert_eq!(converted.sample_rate, 48000);
        assert_eq!(converted.num_channels(), 2);
        assert_eq!(converted.num_frames(), 48000);
    }

    #[test]
    fn test_convert_rejects_zero_rate() {
        let buffer = AudioBuffer::new(10, 1, 0);
        assert!(matches!(
            convert(buffer, 48000, 1),
            Err(RemixError::InvalidFormat { .. })
        ));
        let buffer = AudioBuffer::new(10, 1, 48000);
        assert!(convert(buffer, 0, 1).is_err());
    }
}
