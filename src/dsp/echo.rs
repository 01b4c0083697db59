//! Echo Effect
//!
//! Feedback delay line rendered offline. The echo line holds delayed copies of the
//! input, each repeat attenuated by `feedback`:
//!
//! `e[n] = x[n - D] + feedback * e[n - D]`, `y[n] = x[n] + wet_level * e[n]`
//!
//! The output is extended by enough repeats for the echoes to fall below -60 dB.

use crate::dsp::effect::{check_unit, EchoParams, Effect};
use crate::engine::buffer::secs_to_frames;
use crate::engine::AudioBuffer;
use crate::error::{RemixError, Result};

/// Level at which a repeat counts as inaudible (-60 dB)
const DECAY_FLOOR: f32 = 0.001;

/// Longest tail an echo may append, in seconds
pub const MAX_TAIL_SECS: f64 = 10.0;

/// Feedback delay echo
#[derive(Debug, Clone)]
pub struct Echo {
    params: EchoParams,
}

impl Echo {
    pub fn new(params: EchoParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EchoParams {
        &self.params
    }

    fn delay_frames(&self, sample_rate: u32) -> usize {
        secs_to_frames(self.params.delay_secs as f64, sample_rate).max(1)
    }

    /// Number of audible repeats before the feedback loop decays below the floor
    fn audible_repeats(&self) -> usize {
        let feedback = self.params.feedback;
        if feedback <= 0.0 {
            return 1;
        }
        // After k repeats the level is feedback^(k-1)
        let extra = (DECAY_FLOOR.ln() / feedback.ln()).ceil().max(0.0) as usize;
        1 + extra
    }
}

impl Effect for Echo {
    fn effect_type(&self) -> &'static str {
        "echo"
    }

    fn validate(&self) -> Result<()> {
        let p = &self.params;
        if !p.delay_secs.is_finite() || p.delay_secs <= 0.0 {
            return Err(RemixError::invalid_parameter(
                "delay",
                p.delay_secs,
                "greater than 0 seconds",
            ));
        }
        if !p.feedback.is_finite() || !(0.0..1.0).contains(&p.feedback) {
            return Err(RemixError::invalid_parameter(
                "feedback",
                p.feedback,
                "0.0 to below 1.0",
            ));
        }
        check_unit("wetLevel", p.wet_level)
    }

    fn tail_frames(&self, sample_rate: u32) -> usize {
        let max_tail = secs_to_frames(MAX_TAIL_SECS, sample_rate);
        self.delay_frames(sample_rate)
            .saturating_mul(self.audible_repeats())
            .min(max_tail)
    }

    fn render(&self, input: &AudioBuffer) -> AudioBuffer {
        let delay = self.delay_frames(input.sample_rate);
        let frames = input.num_frames();
        let out_len = frames + self.tail_frames(input.sample_rate);
        let feedback = self.params.feedback;
        let wet = self.params.wet_level;

        let samples = input
            .samples
            .iter()
            .map(|dry| {
                let mut line = vec![0.0_f32; out_len];
                let mut out = vec![0.0_f32; out_len];
                out[..frames].copy_from_slice(dry);

                for n in delay..out_len {
                    let delayed_input = dry.get(n - delay).copied().unwrap_or(0.0);
                    line[n] = delayed_input + feedback * line[n - delay];
                    out[n] += wet * line[n];
                }
                out
            })
            .collect();

        AudioBuffer {
            samples,
            sample_rate: input.sample_rate,
        }
    }
}
