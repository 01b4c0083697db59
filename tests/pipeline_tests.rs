//! Pipeline Tests
//!
//! Capture, decode, process, mix and encode run together through the async
//! pipeline, with injected devices and decoders.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::{mpsc, watch};

use remixer::dsp::{EchoParams, EffectRequest, TrimRange};
use remixer::engine::{
    decode_wav, encode_wav, AudioBlob, AudioBuffer, CancelToken, CaptureDevice, Decoder,
    DecoderRegistry, MimeType, Phase, Recorder, RemixJob, RemixPipeline, SessionEvent,
    SessionState,
};
use remixer::meter::MeterConfig;
use remixer::mixer::{MixMode, MixSettings, OutputFormat, Track};
use remixer::{RemixConfig, RemixError, Result};

const RATE: u32 = 8000;

fn wav_blob(value: f32, frames: usize) -> AudioBlob {
    let buffer = AudioBuffer::from_channels(vec![vec![value; frames]], RATE).unwrap();
    AudioBlob::new(encode_wav(&buffer).unwrap().into_bytes(), "audio/wav")
}

fn mono_output() -> OutputFormat {
    OutputFormat {
        sample_rate: RATE,
        channels: 1,
    }
}

/// Decodes every byte as one frame at a fixed level
struct ByteCountDecoder;

impl Decoder for ByteCountDecoder {
    fn name(&self) -> &'static str {
        "byte-count"
    }

    fn supports(&self, mime: &MimeType) -> bool {
        mime.essence == "audio/webm"
    }

    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer> {
        AudioBuffer::from_channels(vec![vec![0.25; bytes.len()]], RATE)
    }
}

/// Device that hands out queued chunks and reports a fixed analyser level
struct ScriptedDevice {
    chunks: VecDeque<Vec<u8>>,
    level: u8,
    stops: Arc<AtomicUsize>,
}

impl ScriptedDevice {
    fn new(chunks: Vec<Vec<u8>>, level: u8) -> (Self, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let device = Self {
            chunks: chunks.into(),
            level,
            stops: Arc::clone(&stops),
        };
        (device, stops)
    }
}

impl CaptureDevice for ScriptedDevice {
    fn mime_type(&self) -> &str {
        "audio/webm;codecs=opus"
    }

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.pop_front()
    }

    fn frequency_bins(&mut self, bins: &mut [u8]) -> Result<()> {
        bins.fill(self.level);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_overlay_remix_of_wav_inputs() {
    let pipeline = RemixPipeline::default();
    let (progress, receiver) = watch::channel(Phase::Idle);

    let job = RemixJob::new(wav_blob(0.5, 8000), wav_blob(0.25, 4000))
        .with_settings(MixSettings {
            original_volume: 0.5,
            remix_volume: 1.0,
            mix_mode: MixMode::Overlay,
        })
        .with_output(mono_output());

    let encoded = pipeline
        .run(job, &progress, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(*receiver.borrow(), Phase::Ready);
    assert_eq!(encoded.mime_type(), "audio/wav");

    let mixed = decode_wav(encoded.bytes()).unwrap();
    assert_eq!(mixed.num_frames(), 8000);
    // Overlap: 0.5 * 0.5 + 0.25, then the original alone
    assert!((mixed.channel(0)[100] - 0.5).abs() < 1e-3);
    assert!((mixed.channel(0)[6000] - 0.25).abs() < 1e-3);
}

#[tokio::test]
async fn test_trim_and_effect_stages_run() {
    let pipeline = RemixPipeline::default();
    let (progress, receiver) = watch::channel(Phase::Idle);

    let job = RemixJob::new(wav_blob(0.1, 800), wav_blob(0.1, 800))
        .with_trim(TrimRange::new(0.01, 0.01))
        .with_effect(EffectRequest::Echo(EchoParams {
            delay_secs: 0.01,
            feedback: 0.0,
            wet_level: 0.5,
        }))
        .with_settings(MixSettings {
            mix_mode: MixMode::Sequential,
            ..MixSettings::default()
        })
        .with_extra_track(Track::new(AudioBuffer::silence(0.05, 1, RATE)))
        .with_output(mono_output());

    let encoded = pipeline
        .run(job, &progress, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(*receiver.borrow(), Phase::Ready);

    // 800 original frames, then 640 trimmed frames plus an 80-frame echo tail
    let mixed = decode_wav(encoded.bytes()).unwrap();
    assert_eq!(mixed.num_frames(), 800 + 640 + 80);
}

#[tokio::test]
async fn test_undecodable_take_fails() {
    let pipeline = RemixPipeline::default();
    let (progress, receiver) = watch::channel(Phase::Idle);

    let job = RemixJob::new(
        wav_blob(0.1, 100),
        AudioBlob::new(vec![0x1a, 0x45, 0xdf, 0xa3], "audio/webm;codecs=opus"),
    );
    let err = pipeline
        .run(job, &progress, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RemixError::Decode { .. }));
    assert_eq!(*receiver.borrow(), Phase::Failed);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let pipeline = RemixPipeline::default();
    let (progress, receiver) = watch::channel(Phase::Idle);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = pipeline
        .run(
            RemixJob::new(wav_blob(0.1, 100), wav_blob(0.1, 100)),
            &progress,
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RemixError::Cancelled));
    assert_eq!(*receiver.borrow(), Phase::Idle);
}

#[tokio::test]
async fn test_config_job_runs() {
    let config = RemixConfig::from_json_str(
        r#"{
            "output": { "sampleRate": 8000, "channels": 2 },
            "mix": { "originalVolume": 0.8, "remixVolume": 0.6, "mixMode": "sequential" },
            "effect": { "kind": "reverb", "roomSize": 0.2 }
        }"#,
    )
    .unwrap();

    let job = config.job(wav_blob(0.2, 400), wav_blob(0.2, 400)).unwrap();
    let (progress, receiver) = watch::channel(Phase::Idle);
    let encoded = RemixPipeline::default()
        .run(job, &progress, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(*receiver.borrow(), Phase::Ready);
    let mixed = decode_wav(encoded.bytes()).unwrap();
    assert_eq!(mixed.num_channels(), 2);
    // Reverb extends the take past its 400 frames
    assert!(mixed.num_frames() > 800);
}

#[tokio::test]
async fn test_record_then_remix() {
    let (device, stops) = ScriptedDevice::new(vec![vec![0; 1000], vec![0; 600]], 128);
    let mut recorder =
        Recorder::new(device, MeterConfig::default()).with_tick(Duration::from_millis(5));
    let (snapshots, mut levels) = mpsc::channel(64);

    let take = recorder
        .record(tokio::time::sleep(Duration::from_millis(40)), snapshots)
        .await
        .unwrap();
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(take.len(), 1600);
    assert_eq!(take.mime_type(), "audio/webm;codecs=opus");

    let snapshot = levels.recv().await.unwrap();
    assert!(snapshot.current_level > 0.4 && snapshot.current_level < 0.6);
    assert!(snapshot.peak_level >= snapshot.current_level);

    // Session bookkeeping around the capture
    let session = SessionState::Idle
        .apply(SessionEvent::StartCapture)
        .unwrap()
        .apply(SessionEvent::CaptureFinished(take.clone()))
        .unwrap();
    assert_eq!(session.phase(), Phase::Captured);
    assert_eq!(session.take(), Some(&take));

    let mut decoders = DecoderRegistry::with_defaults();
    decoders.register(Box::new(ByteCountDecoder));
    let pipeline = RemixPipeline::new(decoders);

    let job = RemixJob::new(wav_blob(0.25, 2000), take)
        .with_settings(MixSettings {
            mix_mode: MixMode::Sequential,
            ..MixSettings::default()
        })
        .with_output(mono_output());
    let (progress, receiver) = watch::channel(Phase::Idle);
    let encoded = pipeline
        .run(job, &progress, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(*receiver.borrow(), Phase::Ready);
    let mixed = decode_wav(encoded.bytes()).unwrap();
    assert_eq!(mixed.num_frames(), 2000 + 1600);
}

#[tokio::test]
async fn test_dropped_recording_releases_device() {
    let (device, stops) = ScriptedDevice::new(Vec::new(), 10);
    let mut recorder =
        Recorder::new(device, MeterConfig::default()).with_tick(Duration::from_millis(5));
    let (snapshots, _levels) = mpsc::channel(4);

    let outcome = tokio::time::timeout(
        Duration::from_millis(30),
        recorder.record(std::future::pending::<()>(), snapshots),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_session_rejects_out_of_order_events() {
    let err = SessionState::Idle
        .apply(SessionEvent::BeginMix)
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot begin mixing while idle");

    let failed = SessionState::Idle
        .apply(SessionEvent::Fail("microphone unplugged".to_string()))
        .unwrap();
    assert_eq!(failed.phase(), Phase::Failed);
    assert_eq!(failed.apply(SessionEvent::Reset).unwrap(), SessionState::Idle);
}
