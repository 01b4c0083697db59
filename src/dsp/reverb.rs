//! Reverb effect
//!
//! Offline Freeverb network:
//! - 8 parallel lowpass-feedback comb filters
//! - 4 series allpass filters for diffusion
//! - odd channels use delay lines offset by a stereo spread
//!
//! The input is padded with silence so the tail can ring out; `room_size` sets
//! both the comb feedback and the tail length.

use crate::dsp::effect::{check_unit, Effect, ReverbParams};
use crate::engine::buffer::secs_to_frames;
use crate::engine::AudioBuffer;
use crate::error::Result;

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Reference sample rate for Freeverb delays
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb filter delays at 44100 Hz
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delays at 44100 Hz
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Stereo spread offset in samples (for odd channels)
const STEREO_SPREAD: usize = 23;

/// Fixed gain for allpass filters (standard Freeverb value)
const ALLPASS_GAIN: f32 = 0.5;

/// Input attenuation ahead of the comb bank
const FIXED_GAIN: f32 = 0.015;

/// Wet output scaling
const WET_SCALE: f32 = 3.0;

/// Scale factor for room size parameter to feedback
const ROOM_SCALE: f32 = 0.28;

/// Offset for room size parameter to feedback
const ROOM_OFFSET: f32 = 0.7;

/// Scale factor for damping parameter
const DAMP_SCALE: f32 = 0.4;

/// Tail length for the smallest room, in seconds
const MIN_TAIL_SECS: f64 = 0.5;

/// Additional tail length at room_size = 1, in seconds
const TAIL_RANGE_SECS: f64 = 2.5;

// ============================================================================
// Filter Components
// ============================================================================

/// Low-pass feedback comb filter
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    /// One-pole low-pass state in the feedback path
    filter_state: f32,
    feedback: f32,
    damp1: f32,
    damp2: f32,
}

impl CombFilter {
    fn new(delay: usize, feedback: f32, damping: f32) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            index: 0,
            filter_state: 0.0,
            feedback,
            damp1: 1.0 - damping,
            damp2: damping,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_state = output * self.damp1 + self.filter_state * self.damp2;
        self.buffer[self.index] = input + self.filter_state * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

/// Schroeder allpass filter for diffusion
#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        let output = delayed - ALLPASS_GAIN * input;
        self.buffer[self.index] = input + ALLPASS_GAIN * output;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

/// One channel's comb bank and allpass chain
struct Tank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Tank {
    fn new(params: &ReverbParams, sample_rate: u32, spread: usize) -> Self {
        let scale = sample_rate as f64 / REFERENCE_SAMPLE_RATE;
        let scaled = |delay: usize| (((delay + spread) as f64 * scale) as usize).max(1);

        let feedback = params.room_size * ROOM_SCALE + ROOM_OFFSET;
        let damping = params.damping * DAMP_SCALE;

        Self {
            combs: COMB_DELAYS
                .iter()
                .map(|&d| CombFilter::new(scaled(d), feedback, damping))
                .collect(),
            allpasses: ALLPASS_DELAYS
                .iter()
                .map(|&d| AllpassFilter::new(scaled(d)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let input = input * FIXED_GAIN;
        let mut out: f32 = self.combs.iter_mut().map(|c| c.process(input)).sum();
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }
}

// ============================================================================
// Reverb Effect
// ============================================================================

/// Room reverb
#[derive(Debug, Clone)]
pub struct Reverb {
    params: ReverbParams,
}

impl Reverb {
    pub fn new(params: ReverbParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ReverbParams {
        &self.params
    }

    /// Tail length in seconds for the configured room size
    pub fn tail_secs(&self) -> f64 {
        MIN_TAIL_SECS + TAIL_RANGE_SECS * self.params.room_size as f64
    }
}

impl Effect for Reverb {
    fn effect_type(&self) -> &'static str {
        "reverb"
    }

    fn validate(&self) -> Result<()> {
        check_unit("roomSize", self.params.room_size)?;
        check_unit("damping", self.params.damping)?;
        check_unit("wetLevel", self.params.wet_level)
    }

    fn tail_frames(&self, sample_rate: u32) -> usize {
        secs_to_frames(self.tail_secs(), sample_rate)
    }

    fn render(&self, input: &AudioBuffer) -> AudioBuffer {
        let frames = input.num_frames();
        let out_len = frames + self.tail_frames(input.sample_rate);
        let wet = self.params.wet_level * WET_SCALE;

        let samples = input
            .samples
            .iter()
            .enumerate()
            .map(|(ch, dry)| {
                let spread = if ch % 2 == 1 { STEREO_SPREAD } else { 0 };
                let mut tank = Tank::new(&self.params, input.sample_rate, spread);

                (0..out_len)
                    .map(|n| {
                        let x = dry.get(n).copied().unwrap_or(0.0);
                        x + wet * tank.process(x)
                    })
                    .collect()
            })
            .collect();

        AudioBuffer {
            samples,
            sample_rate: input.sample_rate,
        }
    }
}
