//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::{EffectArgs, ModeArg};
use crate::config::{EffectConfig, RemixConfig};
use crate::dsp::{self, TrimRange};
use crate::engine::buffer::{linear_to_db, secs_to_frames};
use crate::engine::io::{export_wav, import_audio, read_blob, write_encoded};
use crate::engine::resample::remap_channels;
use crate::engine::{AudioBuffer, CancelToken, DecoderRegistry, Phase, RemixPipeline};
use crate::meter::{advance, measure, LevelState, LevelStatus, MeterConfig};
use crate::mixer::{self, MixRequest, Track};

impl EffectArgs {
    /// Effect configuration from flags, `None` when no kind was given
    pub fn to_config(&self) -> Option<EffectConfig> {
        let kind = self.kind.clone()?;
        Some(EffectConfig {
            kind,
            delay: self.delay,
            feedback: self.feedback,
            wet_level: self.wet,
            room_size: self.room_size,
            damping: self.damping,
            voice_type: self.voice.clone(),
            intensity: self.intensity,
        })
    }
}

/// Load the configuration file (or defaults) and apply command-line overrides
pub fn build_config(
    config_path: Option<&Path>,
    mode: Option<ModeArg>,
    original_volume: Option<f32>,
    remix_volume: Option<f32>,
    trim_start: Option<f64>,
    trim_end: Option<f64>,
    effect: &EffectArgs,
) -> Result<RemixConfig> {
    let mut config = match config_path {
        Some(path) => RemixConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RemixConfig::default(),
    };

    if let Some(mode) = mode {
        config.mix.mix_mode = mode.into();
    }
    if let Some(volume) = original_volume {
        config.mix.original_volume = volume;
    }
    if let Some(volume) = remix_volume {
        config.mix.remix_volume = volume;
    }
    if trim_start.is_some() || trim_end.is_some() {
        let current = config.trim.unwrap_or_default();
        config.trim = Some(TrimRange::new(
            trim_start.unwrap_or(current.start),
            trim_end.unwrap_or(current.end),
        ));
    }
    if let Some(effect) = effect.to_config() {
        config.effect = effect;
    }

    config.validate().context("invalid remix configuration")?;
    Ok(config)
}

/// Run the full remix pipeline over two files.
pub async fn remix(
    original: &Path,
    take: &Path,
    output: &Path,
    config: &RemixConfig,
) -> Result<()> {
    info!(
        "Remixing {} over {}",
        take.display(),
        original.display()
    );

    let original_blob = read_blob(original)
        .with_context(|| format!("failed to read {}", original.display()))?;
    let take_blob =
        read_blob(take).with_context(|| format!("failed to read {}", take.display()))?;

    let job = config.job(original_blob, take_blob)?;
    let job_id = job.id;
    let pipeline = RemixPipeline::default();
    let (progress, mut phases) = watch::channel(Phase::Idle);

    let reporter = tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow_and_update();
            tracing::debug!(%phase, "remix progress");
        }
    });

    let result = pipeline.run(job, &progress, &CancelToken::new()).await;
    drop(progress);
    join_reporter(reporter).await;

    let encoded = result.with_context(|| format!("remix {} failed", job_id))?;
    write_encoded(output, &encoded)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Remix written: {}", output.display());
    println!("Size: {} bytes", encoded.len());
    println!("SHA-256: {}", encoded.checksum());
    Ok(())
}

/// Wait for the progress reporter; a panicked or aborted reporter only warns.
/// Returns whether it ran to completion.
async fn join_reporter(reporter: JoinHandle<()>) -> bool {
    match reporter.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "progress reporter failed");
            false
        }
    }
}

/// Mix WAV files with per-input gains and offsets.
pub fn mix_files(
    inputs: &[PathBuf],
    output: &Path,
    gains: &[f32],
    offsets: &[f64],
    sample_rate: u32,
    channels: usize,
) -> Result<()> {
    if gains.len() > inputs.len() || offsets.len() > inputs.len() {
        bail!(
            "got {} gains and {} offsets for {} inputs",
            gains.len(),
            offsets.len(),
            inputs.len()
        );
    }

    let decoders = DecoderRegistry::with_defaults();
    let tracks = inputs
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let buffer = import_audio(path, &decoders)
                .with_context(|| format!("failed to import {}", path.display()))?;
            Ok(Track::new(buffer)
                .with_gain(gains.get(i).copied().unwrap_or(1.0))
                .with_offset(offsets.get(i).copied().unwrap_or(0.0)))
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Mixing {} tracks into {}", tracks.len(), output.display());
    let mixed = mixer::mix(MixRequest::new(tracks).with_format(sample_rate, channels))?;
    export_wav(&mixed, output).with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Mix written: {} ({:.2}s)",
        output.display(),
        mixed.duration_secs()
    );
    Ok(())
}

/// Trim a WAV file.
pub fn trim_file(input: &Path, output: &Path, start: f64, end: f64) -> Result<()> {
    info!("Trimming {}", input.display());
    let buffer = import_audio(input, &DecoderRegistry::with_defaults())
        .with_context(|| format!("failed to import {}", input.display()))?;

    let trimmed = dsp::trim(&buffer, start, end)?;
    export_wav(&trimmed, output).with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Trimmed {:.2}s -> {:.2}s: {}",
        buffer.duration_secs(),
        trimmed.duration_secs(),
        output.display()
    );
    Ok(())
}

/// Apply one effect to a WAV file.
pub fn effect_file(input: &Path, output: &Path, effect: &EffectArgs) -> Result<()> {
    let config = effect
        .to_config()
        .context("no effect given; pass --kind echo|reverb|voiceFilter|none")?;
    let request = config.to_request()?;

    info!("Applying {} to {}", request.kind_name(), input.display());
    let buffer = import_audio(input, &DecoderRegistry::with_defaults())
        .with_context(|| format!("failed to import {}", input.display()))?;

    let processed = dsp::apply(&buffer, &request)?;
    export_wav(&processed, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Applied {}: {} ({:.2}s)",
        request.kind_name(),
        output.display(),
        processed.duration_secs()
    );
    Ok(())
}

/// Summary of a metered file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterReport {
    pub ticks: usize,
    pub too_quiet: usize,
    pub good: usize,
    pub too_loud: usize,
    /// Highest held peak seen
    pub max_peak: f32,
}

/// Drive the level meter over a buffer, one tick per `tick_ms`
///
/// Each tick's absolute sample magnitudes (channels averaged) stand in for
/// the analyser bins.
pub fn meter_buffer(buffer: &AudioBuffer, tick_ms: u64, config: &MeterConfig) -> MeterReport {
    let mono = remap_channels(buffer.clone(), 1);
    let tick_frames = secs_to_frames(tick_ms as f64 / 1000.0, buffer.sample_rate).max(1);

    let mut state = LevelState::default();
    let mut report = MeterReport::default();

    for window in mono.channel(0).chunks(tick_frames) {
        let bins: Vec<f32> = window.iter().map(|s| s.abs()).collect();
        state = advance(state, measure(&bins), tick_ms as f64, config);

        let snapshot = state.snapshot();
        report.ticks += 1;
        report.max_peak = report.max_peak.max(snapshot.peak_level);
        match snapshot.status(config) {
            LevelStatus::TooQuiet => report.too_quiet += 1,
            LevelStatus::Good => report.good += 1,
            LevelStatus::TooLoud => report.too_loud += 1,
        }
    }
    report
}

/// Run the level meter over a WAV file.
pub fn meter_file(input: &Path, tick_ms: u64) -> Result<MeterReport> {
    if tick_ms == 0 {
        bail!("tick must be at least 1 ms");
    }
    let buffer = import_audio(input, &DecoderRegistry::with_defaults())
        .with_context(|| format!("failed to import {}", input.display()))?;
    let report = meter_buffer(&buffer, tick_ms, &MeterConfig::default());

    println!("=== Level Meter: {} ===", input.display());
    println!("Ticks: {} x {}ms", report.ticks, tick_ms);
    println!("Too quiet: {}", report.too_quiet);
    println!("Good: {}", report.good);
    println!("Too loud: {}", report.too_loud);
    println!("Max peak: {:.3}", report.max_peak);
    Ok(report)
}

/// Print format and levels of a WAV file.
pub fn show_info(input: &Path) -> Result<()> {
    let buffer = import_audio(input, &DecoderRegistry::with_defaults())
        .with_context(|| format!("failed to import {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Sample rate: {} Hz", buffer.sample_rate);
    println!("Channels: {}", buffer.num_channels());
    println!("Duration: {:.3}s ({} frames)", buffer.duration_secs(), buffer.num_frames());
    println!("Peak: {:.1} dBFS", linear_to_db(buffer.peak()));
    println!("RMS: {:.1} dBFS", linear_to_db(buffer.rms()));
    Ok(())
}

/// Print the default configuration.
pub fn print_default_config() -> Result<()> {
    println!("{}", RemixConfig::default().to_json_pretty()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::generate_test_tone;

    #[test]
    fn test_effect_args_to_config() {
        assert!(EffectArgs::default().to_config().is_none());

        let args = EffectArgs {
            kind: Some("voiceFilter".to_string()),
            voice: Some("robot".to_string()),
            intensity: Some(0.4),
            ..EffectArgs::default()
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.voice_type.as_deref(), Some("robot"));
        assert!(config.to_request().is_ok());
    }

    #[test]
    fn test_build_config_overrides() {
        let config = build_config(
            None,
            Some(ModeArg::Sequential),
            Some(0.3),
            None,
            None,
            Some(0.5),
            &EffectArgs::default(),
        )
        .unwrap();
        assert_eq!(config.mix.mix_mode, crate::mixer::MixMode::Sequential);
        assert_eq!(config.mix.original_volume, 0.3);
        assert_eq!(config.trim, Some(TrimRange::new(0.0, 0.5)));
    }

    #[test]
    fn test_build_config_rejects_bad_values() {
        let err = build_config(None, None, Some(3.0), None, None, None, &EffectArgs::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_meter_buffer_classifies() {
        let config = MeterConfig::default();

        let quiet = generate_test_tone(440.0, 0.05, 1.0, 8000);
        let report = meter_buffer(&quiet, 16, &config);
        assert!(report.ticks > 60);
        assert_eq!(report.too_quiet, report.ticks);

        let loud = generate_test_tone(440.0, 1.0, 1.0, 8000);
        let report = meter_buffer(&loud, 16, &config);
        assert!(report.too_loud > 0);
        assert!(report.max_peak > 0.95);
    }

    #[tokio::test]
    async fn test_join_reporter_survives_failed_task() {
        assert!(join_reporter(tokio::spawn(async {})).await);

        let aborted = tokio::spawn(std::future::pending::<()>());
        aborted.abort();
        assert!(!join_reporter(aborted).await);
    }
}
