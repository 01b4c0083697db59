//! Input level metering
//!
//! Turns one frequency-bin array per display tick into a [`LevelSnapshot`].
//! The only state carried between ticks is the held peak and its timers; the
//! host decides when ticks happen and passes the elapsed time in.

use serde::{Deserialize, Serialize};

use crate::error::{RemixError, Result};

/// Loudness classification of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelStatus {
    /// Speak up: both average and peak are low
    TooQuiet,
    /// Comfortable recording level
    Good,
    /// Clipping risk
    TooLoud,
}

/// Meter timing and classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeterConfig {
    /// How long a new peak is held before it starts decaying
    pub hold_ms: f64,
    /// Interval between decay steps once the hold has elapsed
    pub decay_interval_ms: f64,
    /// Amount subtracted from the held peak per decay step
    pub decay_step: f32,
    /// Average below this (and current below `quiet_current`) is too quiet
    pub quiet_average: f32,
    /// Current below this (and average below `quiet_average`) is too quiet
    pub quiet_current: f32,
    /// Current above this is too loud
    pub loud_current: f32,
    /// Average above this is too loud
    pub loud_average: f32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            hold_ms: 1000.0,
            decay_interval_ms: 50.0,
            decay_step: 0.05,
            quiet_average: 0.15,
            quiet_current: 0.20,
            loud_current: 0.95,
            loud_average: 0.85,
        }
    }
}

impl MeterConfig {
    /// Check timings are non-negative and thresholds lie in [0, 1]
    pub fn validate(&self) -> Result<()> {
        for (param, value) in [
            ("holdMs", self.hold_ms),
            ("decayIntervalMs", self.decay_interval_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RemixError::invalid_parameter(param, value, "0 ms or more"));
            }
        }
        for (param, value) in [
            ("decayStep", self.decay_step),
            ("quietAverage", self.quiet_average),
            ("quietCurrent", self.quiet_current),
            ("loudCurrent", self.loud_current),
            ("loudAverage", self.loud_average),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(RemixError::invalid_parameter(param, value, "0.0 to 1.0"));
            }
        }
        Ok(())
    }
}

/// Loudness measured from a single tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Largest normalized bin value
    pub current: f32,
    /// RMS of the normalized bin values
    pub average: f32,
}

/// Levels for one tick, all in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSnapshot {
    /// Peak of the current tick
    pub current_level: f32,
    /// Held/decaying peak; never below `current_level`
    pub peak_level: f32,
    /// RMS of the current tick
    pub average_level: f32,
}

impl LevelSnapshot {
    /// Classify this snapshot against the configured thresholds
    pub fn status(&self, config: &MeterConfig) -> LevelStatus {
        if self.current_level > config.loud_current || self.average_level > config.loud_average {
            LevelStatus::TooLoud
        } else if self.average_level < config.quiet_average
            && self.current_level < config.quiet_current
        {
            LevelStatus::TooQuiet
        } else {
            LevelStatus::Good
        }
    }
}

/// Measure normalized bin magnitudes (each expected in 0..1)
///
/// Values are clamped into [0, 1]; non-finite bins count as silence.
pub fn measure(bins: &[f32]) -> Measurement {
    if bins.is_empty() {
        return Measurement::default();
    }

    let mut sum_sq = 0.0_f32;
    let mut peak = 0.0_f32;
    for &bin in bins {
        let v = if bin.is_finite() { bin.clamp(0.0, 1.0) } else { 0.0 };
        sum_sq += v * v;
        peak = peak.max(v);
    }

    Measurement {
        current: peak,
        average: (sum_sq / bins.len() as f32).sqrt(),
    }
}

/// Measure raw analyser bytes (0..255), normalizing by 255
pub fn measure_bytes(bins: &[u8]) -> Measurement {
    let normalized: Vec<f32> = bins.iter().map(|&b| b as f32 / 255.0).collect();
    measure(&normalized)
}

/// Peak-hold state carried between ticks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelState {
    held_peak: f32,
    since_peak_ms: f64,
    decay_accum_ms: f64,
    last: Measurement,
}

impl LevelState {
    /// Current held peak
    pub fn held_peak(&self) -> f32 {
        self.held_peak
    }

    /// Snapshot for the most recent tick
    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            current_level: self.last.current,
            peak_level: self.held_peak.max(self.last.current),
            average_level: self.last.average,
        }
    }
}

/// Advance the meter by one tick
///
/// A tick whose current level exceeds the held peak replaces it and restarts the
/// hold timer. Once `hold_ms` has passed without a new peak, the held peak drops by
/// `decay_step` for every elapsed `decay_interval_ms`, never below the current level.
pub fn advance(
    state: LevelState,
    measurement: Measurement,
    elapsed_ms: f64,
    config: &MeterConfig,
) -> LevelState {
    let elapsed_ms = if elapsed_ms.is_finite() { elapsed_ms.max(0.0) } else { 0.0 };
    let mut next = state;
    next.last = measurement;

    if measurement.current > state.held_peak {
        next.held_peak = measurement.current;
        next.since_peak_ms = 0.0;
        next.decay_accum_ms = 0.0;
        return next;
    }

    let before = next.since_peak_ms;
    next.since_peak_ms += elapsed_ms;
    if next.since_peak_ms > config.hold_ms {
        // Only time past the hold boundary counts toward decay
        let decaying_ms = next.since_peak_ms - before.max(config.hold_ms);
        next.decay_accum_ms += decaying_ms;

        if config.decay_interval_ms > 0.0 {
            let steps = (next.decay_accum_ms / config.decay_interval_ms).floor();
            next.decay_accum_ms -= steps * config.decay_interval_ms;
            next.held_peak -= config.decay_step * steps as f32;
        }

        next.held_peak = next.held_peak.max(measurement.current).max(0.0);
    }

    next
}

/// Stateful meter wrapping [`advance`] for hosts that prefer an object
#[derive(Debug, Clone, Default)]
pub struct LevelMeter {
    config: MeterConfig,
    state: LevelState,
}

impl LevelMeter {
    /// Create a meter with the given thresholds
    pub fn new(config: MeterConfig) -> Self {
        Self {
            config,
            state: LevelState::default(),
        }
    }

    /// Meter configuration
    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Process normalized bins for one tick
    pub fn tick(&mut self, bins: &[f32], elapsed_ms: f64) -> LevelSnapshot {
        self.state = advance(self.state, measure(bins), elapsed_ms, &self.config);
        self.state.snapshot()
    }

    /// Process raw analyser bytes for one tick
    pub fn tick_bytes(&mut self, bins: &[u8], elapsed_ms: f64) -> LevelSnapshot {
        self.state = advance(self.state, measure_bytes(bins), elapsed_ms, &self.config);
        self.state.snapshot()
    }

    /// Status of the latest snapshot
    pub fn status(&self) -> LevelStatus {
        self.state.snapshot().status(&self.config)
    }

    /// Drop all held state, as when capture stops
    pub fn reset(&mut self) {
        self.state = LevelState::default();
    }
}
