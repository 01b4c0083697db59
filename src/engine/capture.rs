//! Capture
//!
//! Recording goes through an injected [`CaptureDevice`]: the platform recorder
//! plus its frequency analyser. The device is held by an [`ActiveCapture`] guard
//! that stops it exactly once on every exit path, including cancellation of the
//! recording future.
//!
//! [`Recorder::record`] polls the device on a fixed tick, accumulates the
//! encoded chunks and drives the level meter until the stop signal fires.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::engine::codec::AudioBlob;
use crate::error::Result;
use crate::meter::{LevelMeter, LevelSnapshot, MeterConfig};

/// Default meter tick, roughly one display frame at 60 Hz
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

/// Default analyser size
pub const DEFAULT_BIN_COUNT: usize = 128;

/// Platform capture capability
pub trait CaptureDevice: Send {
    /// MIME type of the chunks this device produces
    fn mime_type(&self) -> &str;

    /// Acquire the microphone and begin recording
    ///
    /// # Errors
    /// `Device` when the microphone is unavailable or permission is denied.
    fn start(&mut self) -> Result<()>;

    /// Next encoded chunk, if one is ready
    fn read_chunk(&mut self) -> Option<Vec<u8>>;

    /// Fill `bins` with the current analyser magnitudes (0..255)
    fn frequency_bins(&mut self, bins: &mut [u8]) -> Result<()>;

    /// Stop recording and release the microphone
    fn stop(&mut self) -> Result<()>;
}

// ============================================================================
// Device guard
// ============================================================================

/// Started device, stopped when finished or dropped
pub struct ActiveCapture<'a> {
    device: &'a mut dyn CaptureDevice,
    released: bool,
}

impl<'a> ActiveCapture<'a> {
    /// Start `device` and take responsibility for stopping it
    pub fn acquire(device: &'a mut dyn CaptureDevice) -> Result<Self> {
        device.start()?;
        debug!(mime_type = device.mime_type(), "capture device started");
        Ok(Self {
            device,
            released: false,
        })
    }

    /// The started device
    pub fn device(&mut self) -> &mut dyn CaptureDevice {
        &mut *self.device
    }

    /// Stop the device, reporting any error
    pub fn finish(mut self) -> Result<()> {
        self.released = true;
        self.device.stop()
    }
}

impl Drop for ActiveCapture<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.device.stop() {
            warn!(error = %e, "failed to release capture device");
        } else {
            debug!("capture device released on early exit");
        }
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// Records a take while metering its level
pub struct Recorder<D: CaptureDevice> {
    device: D,
    meter: LevelMeter,
    tick: Duration,
    bin_count: usize,
}

impl<D: CaptureDevice> Recorder<D> {
    /// Recorder with the default tick and analyser size
    pub fn new(device: D, meter_config: MeterConfig) -> Self {
        Self {
            device,
            meter: LevelMeter::new(meter_config),
            tick: DEFAULT_TICK,
            bin_count: DEFAULT_BIN_COUNT,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn with_bin_count(mut self, bin_count: usize) -> Self {
        self.bin_count = bin_count.max(1);
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Record until `stop` resolves
    ///
    /// Every tick drains ready chunks, reads the analyser, advances the meter
    /// and offers the snapshot to `snapshots` (dropped if the receiver lags or
    /// is gone). When `stop` resolves the loop ends at once, the device is
    /// stopped, the meter reset and the accumulated take returned. A failing
    /// analyser read ends the recording the same way but yields its error.
    /// Dropping the returned future also stops the device, and the next call
    /// starts from a cleared meter.
    ///
    /// # Errors
    /// `Device` if the device fails to start, to report levels or to stop.
    pub async fn record<S>(
        &mut self,
        stop: S,
        snapshots: mpsc::Sender<LevelSnapshot>,
    ) -> Result<AudioBlob>
    where
        S: Future<Output = ()>,
    {
        // Levels never carry over from an earlier recording
        self.meter.reset();

        let mime_type = self.device.mime_type().to_string();
        let mut capture = ActiveCapture::acquire(&mut self.device)?;
        let mut bins = vec![0_u8; self.bin_count];
        let mut data = Vec::new();

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();
        let mut ticks = 0_u64;

        tokio::pin!(stop);
        let outcome: Result<()> = loop {
            tokio::select! {
                biased;
                _ = &mut stop => break Ok(()),
                now = interval.tick() => {
                    while let Some(chunk) = capture.device().read_chunk() {
                        data.extend_from_slice(&chunk);
                    }
                    if let Err(e) = capture.device().frequency_bins(&mut bins) {
                        break Err(e);
                    }

                    let elapsed_ms = now.duration_since(last_tick).as_secs_f64() * 1000.0;
                    last_tick = now;
                    ticks += 1;

                    let snapshot = self.meter.tick_bytes(&bins, elapsed_ms);
                    if snapshots.try_send(snapshot).is_err() {
                        trace!("level snapshot dropped");
                    }
                }
            }
        };

        // Keep whatever the device flushed before stopping
        while let Some(chunk) = capture.device().read_chunk() {
            data.extend_from_slice(&chunk);
        }
        let released = capture.finish();
        self.meter.reset();
        outcome?;
        released?;

        debug!(bytes = data.len(), ticks, "capture finished");
        Ok(AudioBlob::new(data, mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemixError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    struct MockDevice {
        counters: Arc<Counters>,
        fail_start: bool,
        level: u8,
    }

    impl MockDevice {
        fn new(counters: Arc<Counters>) -> Self {
            Self {
                counters,
                fail_start: false,
                level: 128,
            }
        }
    }

    impl CaptureDevice for MockDevice {
        fn mime_type(&self) -> &str {
            "audio/webm;codecs=opus"
        }

        fn start(&mut self) -> Result<()> {
            if self.fail_start {
                return Err(RemixError::Device {
                    reason: "permission denied".to_string(),
                });
            }
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn read_chunk(&mut self) -> Option<Vec<u8>> {
            None
        }

        fn frequency_bins(&mut self, bins: &mut [u8]) -> Result<()> {
            bins.fill(self.level);
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Device producing one chunk per tick
    struct ChunkDevice {
        inner: MockDevice,
        pending: bool,
    }

    impl CaptureDevice for ChunkDevice {
        fn mime_type(&self) -> &str {
            self.inner.mime_type()
        }

        fn start(&mut self) -> Result<()> {
            self.inner.start()
        }

        fn read_chunk(&mut self) -> Option<Vec<u8>> {
            self.pending = !self.pending;
            self.pending.then(|| vec![7_u8; 4])
        }

        fn frequency_bins(&mut self, bins: &mut [u8]) -> Result<()> {
            self.inner.frequency_bins(bins)
        }

        fn stop(&mut self) -> Result<()> {
            self.inner.stop()
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let counters = Arc::new(Counters::default());
        let mut device = MockDevice::new(counters.clone());
        {
            let _capture = ActiveCapture::acquire(&mut device).unwrap();
            assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        }
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_once_on_finish() {
        let counters = Arc::new(Counters::default());
        let mut device = MockDevice::new(counters.clone());
        let capture = ActiveCapture::acquire(&mut device).unwrap();
        capture.finish().unwrap();
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_failure_is_device_error() {
        let counters = Arc::new(Counters::default());
        let mut device = MockDevice::new(counters.clone());
        device.fail_start = true;
        let err = ActiveCapture::acquire(&mut device).err().unwrap();
        assert!(matches!(err, RemixError::Device { .. }));
        assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_record_until_stopped() {
        let counters = Arc::new(Counters::default());
        let device = ChunkDevice {
            inner: MockDevice::new(counters.clone()),
            pending: false,
        };
        let mut recorder =
            Recorder::new(device, MeterConfig::default()).with_tick(Duration::from_millis(2));
        let (tx, mut rx) = mpsc::channel(1024);

        let blob = recorder
            .record(tokio::time::sleep(Duration::from_millis(30)), tx)
            .await
            .unwrap();

        assert_eq!(blob.mime_type(), "audio/webm;codecs=opus");
        assert!(!blob.is_empty());
        assert!(blob.bytes().iter().all(|&b| b == 7));
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);

        let mut received = 0;
        while let Ok(snapshot) = rx.try_recv() {
            assert!(snapshot.peak_level >= snapshot.current_level);
            received += 1;
        }
        assert!(received > 0);
    }

    #[tokio::test]
    async fn test_cancelled_recording_releases_device() {
        let counters = Arc::new(Counters::default());
        let mut recorder = Recorder::new(MockDevice::new(counters.clone()), MeterConfig::default())
            .with_tick(Duration::from_millis(1));
        let (tx, _rx) = mpsc::channel(8);

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            recorder.record(std::future::pending::<()>(), tx),
        )
        .await;

        assert!(result.is_err(), "recording should still be running at the timeout");
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick() {
        let counters = Arc::new(Counters::default());
        let mut recorder = Recorder::new(MockDevice::new(counters.clone()), MeterConfig::default());
        let (tx, _rx) = mpsc::channel(8);

        let blob = recorder.record(async {}, tx).await.unwrap();
        assert!(blob.is_empty());
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    /// Device whose analyser reads loud, then fails once, then reads quiet
    struct FlakyAnalyser {
        counters: Arc<Counters>,
        reads: usize,
    }

    impl CaptureDevice for FlakyAnalyser {
        fn mime_type(&self) -> &str {
            "audio/webm;codecs=opus"
        }

        fn start(&mut self) -> Result<()> {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn read_chunk(&mut self) -> Option<Vec<u8>> {
            None
        }

        fn frequency_bins(&mut self, bins: &mut [u8]) -> Result<()> {
            self.reads += 1;
            match self.reads {
                1 => bins.fill(230),
                2 => {
                    return Err(RemixError::Device {
                        reason: "analyser disconnected".to_string(),
                    })
                }
                _ => bins.fill(25),
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_analyser_read_clears_meter() {
        let counters = Arc::new(Counters::default());
        let device = FlakyAnalyser {
            counters: counters.clone(),
            reads: 0,
        };
        let mut recorder =
            Recorder::new(device, MeterConfig::default()).with_tick(Duration::from_millis(2));

        let (tx, mut rx) = mpsc::channel(64);
        let err = recorder
            .record(std::future::pending::<()>(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, RemixError::Device { .. }));
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
        let loud = rx.recv().await.unwrap();
        assert!(loud.peak_level > 0.85);

        let (tx, mut rx) = mpsc::channel(64);
        recorder
            .record(tokio::time::sleep(Duration::from_millis(10)), tx)
            .await
            .unwrap();
        assert_eq!(counters.stops.load(Ordering::SeqCst), 2);

        let first = rx.recv().await.unwrap();
        assert!(first.current_level < 0.15);
        assert_eq!(first.peak_level, first.current_level);
    }
}
