//! CLI Tests
//!
//! Command implementations against real files in a temporary directory.

use std::path::{Path, PathBuf};

use clap::Parser;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use remixer::cli::commands;
use remixer::cli::{Cli, Commands, EffectArgs, ModeArg};
use remixer::engine::{export_wav, generate_test_tone, import_audio, AudioBuffer, DecoderRegistry};

fn write_tone(dir: &Path, name: &str, amplitude: f32, secs: f64) -> PathBuf {
    let path = dir.join(name);
    export_wav(&generate_test_tone(440.0, amplitude, secs, 8000), &path).unwrap();
    path
}

fn load(path: &Path) -> AudioBuffer {
    import_audio(path, &DecoderRegistry::with_defaults()).unwrap()
}

#[test]
fn test_parse_remix_command() {
    let cli = Cli::try_parse_from([
        "remixer",
        "remix",
        "--original",
        "a.wav",
        "--take",
        "b.wav",
        "-o",
        "out.wav",
        "--mode",
        "sequential",
        "--kind",
        "echo",
        "--delay",
        "0.2",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Remix {
            mode, effect, ..
        }) => {
            assert_eq!(mode, Some(ModeArg::Sequential));
            assert_eq!(effect.kind.as_deref(), Some("echo"));
            assert_eq!(effect.delay, Some(0.2));
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_parse_mix_lists() {
    let cli = Cli::try_parse_from([
        "remixer", "mix", "a.wav", "b.wav", "-o", "out.wav", "--gains", "0.5,0.8", "--offsets",
        "0,1.5",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Mix {
            inputs,
            gains,
            offsets,
            sample_rate,
            channels,
            ..
        }) => {
            assert_eq!(inputs.len(), 2);
            assert_eq!(gains, vec![0.5, 0.8]);
            assert_eq!(offsets, vec![0.0, 1.5]);
            assert_eq!(sample_rate, 48000);
            assert_eq!(channels, 2);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_trim_file() {
    let dir = tempdir().unwrap();
    let input = write_tone(dir.path(), "in.wav", 0.5, 1.0);
    let output = dir.path().join("trimmed.wav");

    commands::trim_file(&input, &output, 0.25, 0.25).unwrap();
    assert_eq!(load(&output).num_frames(), 4000);
}

#[test]
fn test_trim_file_rejects_whole_buffer() {
    let dir = tempdir().unwrap();
    let input = write_tone(dir.path(), "in.wav", 0.5, 1.0);
    let output = dir.path().join("trimmed.wav");

    assert!(commands::trim_file(&input, &output, 0.5, 0.5).is_err());
    assert!(!output.exists());
}

#[test]
fn test_mix_files_with_offsets() {
    let dir = tempdir().unwrap();
    let a = write_tone(dir.path(), "a.wav", 0.4, 1.0);
    let b = write_tone(dir.path(), "b.wav", 0.4, 0.5);
    let output = dir.path().join("mix.wav");

    commands::mix_files(&[a, b], &output, &[1.0, 0.5], &[0.0, 1.0], 8000, 1).unwrap();

    let mixed = load(&output);
    assert_eq!(mixed.sample_rate, 8000);
    assert_eq!(mixed.num_frames(), 12000);
}

#[test]
fn test_mix_files_rejects_extra_gains() {
    let dir = tempdir().unwrap();
    let a = write_tone(dir.path(), "a.wav", 0.4, 0.5);
    let output = dir.path().join("mix.wav");

    assert!(commands::mix_files(&[a], &output, &[1.0, 0.5], &[], 8000, 1).is_err());
}

#[test]
fn test_effect_file() {
    let dir = tempdir().unwrap();
    let input = write_tone(dir.path(), "in.wav", 0.5, 0.5);
    let output = dir.path().join("robot.wav");

    let effect = EffectArgs {
        kind: Some("voiceFilter".to_string()),
        voice: Some("robot".to_string()),
        ..EffectArgs::default()
    };
    commands::effect_file(&input, &output, &effect).unwrap();

    let processed = load(&output);
    assert_eq!(processed.num_frames(), 4000);
    assert!(processed.peak() <= 1.0);
}

#[test]
fn test_effect_file_needs_kind() {
    let dir = tempdir().unwrap();
    let input = write_tone(dir.path(), "in.wav", 0.5, 0.5);
    let output = dir.path().join("out.wav");

    assert!(commands::effect_file(&input, &output, &EffectArgs::default()).is_err());
}

#[test]
fn test_meter_file() {
    let dir = tempdir().unwrap();
    let input = write_tone(dir.path(), "in.wav", 0.5, 1.0);

    let report = commands::meter_file(&input, 16).unwrap();
    assert_eq!(report.ticks, report.too_quiet + report.good + report.too_loud);
    assert!(report.good > 0);
    assert!(commands::meter_file(&input, 0).is_err());
}

#[tokio::test]
async fn test_remix_writes_output() {
    let dir = tempdir().unwrap();
    let original = write_tone(dir.path(), "original.wav", 0.5, 1.0);
    let take = write_tone(dir.path(), "take.wav", 0.5, 0.5);
    let output = dir.path().join("remix.wav");

    let config = commands::build_config(
        None,
        Some(ModeArg::Sequential),
        Some(0.5),
        Some(0.5),
        Some(0.1),
        None,
        &EffectArgs::default(),
    )
    .unwrap();
    commands::remix(&original, &take, &output, &config)
        .await
        .unwrap();

    // Resampled to 48 kHz stereo: 1 s original then the 0.4 s trimmed take
    let mixed = load(&output);
    assert_eq!(mixed.sample_rate, 48000);
    assert_eq!(mixed.num_channels(), 2);
    assert_eq!(mixed.num_frames(), 48000 + 19200);
}

#[test]
fn test_build_config_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remix.json");
    std::fs::write(
        &path,
        r#"{ "mix": { "remixVolume": 0.4 }, "effect": { "kind": "echo", "delay": 0.25 } }"#,
    )
    .unwrap();

    let config = commands::build_config(
        Some(&path),
        None,
        None,
        None,
        None,
        None,
        &EffectArgs::default(),
    )
    .unwrap();
    assert_eq!(config.mix.remix_volume, 0.4);
    assert_eq!(config.effect.kind, "echo");
    assert_eq!(config.effect.delay, Some(0.25));
}
