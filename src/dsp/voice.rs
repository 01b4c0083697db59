//! Voice Filter
//!
//! Character transformations blended with the dry signal by `intensity`:
//! `y = (1 - intensity) * x + intensity * f(x)`.
//!
//! - Robot: ring modulation against a 50 Hz carrier
//! - Chipmunk / Deep: delay-line pitch shift up (x1.5) or down (x0.7)
//! - Telephone: 300-3400 Hz band-pass from cascaded biquads
//!
//! Output length equals input length.

use std::f64::consts::PI;

use crate::dsp::effect::{check_unit, Effect, VoiceKind, VoiceParams};
use crate::engine::buffer::secs_to_frames;
use crate::engine::AudioBuffer;
use crate::error::Result;

/// Ring modulator carrier frequency
const ROBOT_CARRIER_HZ: f64 = 50.0;

/// Pitch ratio for the chipmunk voice
const CHIPMUNK_RATIO: f64 = 1.5;

/// Pitch ratio for the deep voice
const DEEP_RATIO: f64 = 0.7;

/// Crossfade window of the pitch shifter, in seconds
const PITCH_WINDOW_SECS: f64 = 0.04;

/// Telephone band edges
const TELEPHONE_LOW_HZ: f64 = 300.0;
const TELEPHONE_HIGH_HZ: f64 = 3400.0;

/// Butterworth Q
const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

// ============================================================================
// Biquad
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Pass {
    Low,
    High,
}

/// Normalized biquad coefficients (Audio EQ Cookbook)
#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn calculate(pass: Pass, sample_rate: f64, frequency: f64, q: f64) -> Self {
        // Keep the corner below Nyquist even for very low sample rates
        let freq = frequency.min(sample_rate * 0.49).max(1.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match pass {
            Pass::Low => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            Pass::High => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
        };
        let a0 = 1.0 + alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

// ============================================================================
// Transformations
// ============================================================================

fn ring_modulate(input: &[f32], sample_rate: u32) -> Vec<f32> {
    let step = 2.0 * PI * ROBOT_CARRIER_HZ / sample_rate as f64;
    input
        .iter()
        .enumerate()
        .map(|(n, &x)| (x as f64 * (step * n as f64).sin()) as f32)
        .collect()
}

fn band_limit(input: &[f32], sample_rate: u32) -> Vec<f32> {
    let fs = sample_rate as f64;
    let stages = [
        BiquadCoeffs::calculate(Pass::High, fs, TELEPHONE_LOW_HZ, BUTTERWORTH_Q),
        BiquadCoeffs::calculate(Pass::High, fs, TELEPHONE_LOW_HZ, BUTTERWORTH_Q),
        BiquadCoeffs::calculate(Pass::Low, fs, TELEPHONE_HIGH_HZ, BUTTERWORTH_Q),
        BiquadCoeffs::calculate(Pass::Low, fs, TELEPHONE_HIGH_HZ, BUTTERWORTH_Q),
    ];
    let mut states = [BiquadState::default(); 4];

    input
        .iter()
        .map(|&x| {
            let mut y = x as f64;
            for (state, coeffs) in states.iter_mut().zip(&stages) {
                y = state.process(y, coeffs);
            }
            y as f32
        })
        .collect()
}

/// Read `input` at a fractional position, zero outside the signal
#[inline]
fn read_interpolated(input: &[f32], position: f64) -> f32 {
    if position < 0.0 {
        return 0.0;
    }
    let index = position.floor() as usize;
    let frac = (position - index as f64) as f32;
    let a = input.get(index).copied().unwrap_or(0.0);
    let b = input.get(index + 1).copied().unwrap_or(0.0);
    a + (b - a) * frac
}

/// Two-tap delay-line pitch shifter
///
/// Each tap's delay sweeps through the window at `1 - ratio` samples per sample,
/// which resamples the signal by `ratio`. The taps sit half a window apart and
/// are crossfaded with triangular gains that sum to one and vanish at the wrap.
fn pitch_shift(input: &[f32], sample_rate: u32, ratio: f64) -> Vec<f32> {
    let window = secs_to_frames(PITCH_WINDOW_SECS, sample_rate).max(2) as f64;
    let phase_step = (1.0 - ratio) / window;
    let mut phase = 0.0_f64;

    (0..input.len())
        .map(|n| {
            let mut out = 0.0_f32;
            for offset in [0.0, 0.5] {
                let p = (phase + offset).rem_euclid(1.0);
                let gain = (1.0 - (2.0 * p - 1.0).abs()) as f32;
                out += gain * read_interpolated(input, n as f64 - p * window);
            }
            phase = (phase + phase_step).rem_euclid(1.0);
            out
        })
        .collect()
}

// ============================================================================
// Voice Filter Effect
// ============================================================================

/// Voice character filter
#[derive(Debug, Clone)]
pub struct VoiceFilter {
    params: VoiceParams,
}

impl VoiceFilter {
    pub fn new(params: VoiceParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    fn transform(&self, channel: &[f32], sample_rate: u32) -> Vec<f32> {
        match self.params.kind {
            VoiceKind::Robot => ring_modulate(channel, sample_rate),
            VoiceKind::Chipmunk => pitch_shift(channel, sample_rate, CHIPMUNK_RATIO),
            VoiceKind::Deep => pitch_shift(channel, sample_rate, DEEP_RATIO),
            VoiceKind::Telephone => band_limit(channel, sample_rate),
        }
    }
}

impl Effect for VoiceFilter {
    fn effect_type(&self) -> &'static str {
        "voiceFilter"
    }

    fn validate(&self) -> Result<()> {
        check_unit("intensity", self.params.intensity)
    }

    fn tail_frames(&self, _sample_rate: u32) -> usize {
        0
    }

    fn render(&self, input: &AudioBuffer) -> AudioBuffer {
        let intensity = self.params.intensity;
        if intensity == 0.0 {
            return input.clone();
        }

        let samples = input
            .samples
            .iter()
            .map(|dry| {
                let wet = self.transform(dry, input.sample_rate);
                dry.iter()
                    .zip(&wet)
                    .map(|(&x, &fx)| (1.0 - intensity) * x + intensity * fx)
                    .collect()
            })
            .collect();

        AudioBuffer {
            samples,
            sample_rate: input.sample_rate,
        }
    }
}
