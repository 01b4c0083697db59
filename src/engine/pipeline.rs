//! Remix pipeline
//!
//! Runs one remix job end to end:
//!
//! decode original + take -> trim take? -> effect on take? -> mix -> encode
//!
//! Each CPU-bound stage runs on the blocking pool with owned buffers, one stage
//! at a time. Every stage races the job's [`CancelToken`]; a cancelled stage's
//! result is discarded and the job yields `Cancelled`, never a partial artifact.
//! Progress is published as [`Phase`] values on a watch channel.

use std::fmt;
use std::future::pending;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::dsp::{self, EffectRequest, TrimRange};
use crate::engine::codec::{AudioBlob, DecoderRegistry};
use crate::engine::encoder::{encode_wav, EncodedAudio};
use crate::engine::session::{Phase, SessionEvent, SessionState};
use crate::error::{RemixError, Result};
use crate::mixer::{self, MixSettings, OutputFormat, Track};

// ============================================================================
// Cancellation
// ============================================================================

/// Shared cancellation flag for one job
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                // The sender lives as long as this token
                pending::<()>().await;
            }
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// Everything needed to produce one remix
#[derive(Debug, Clone)]
pub struct RemixJob {
    pub id: Uuid,
    /// The clip being remixed
    pub original: AudioBlob,
    /// The user's recorded take
    pub take: AudioBlob,
    /// Seconds cut from the take's head and tail
    pub trim: Option<TrimRange>,
    /// Effect applied to the take after trimming
    pub effect: EffectRequest,
    pub settings: MixSettings,
    /// Tracks mixed after the original and the take
    pub extra_tracks: Vec<Track>,
    pub output: OutputFormat,
}

impl RemixJob {
    pub fn new(original: AudioBlob, take: AudioBlob) -> Self {
        Self {
            id: Uuid::new_v4(),
            original,
            take,
            trim: None,
            effect: EffectRequest::None,
            settings: MixSettings::default(),
            extra_tracks: Vec::new(),
            output: OutputFormat::default(),
        }
    }

    pub fn with_trim(mut self, trim: TrimRange) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn with_effect(mut self, effect: EffectRequest) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_settings(mut self, settings: MixSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_extra_track(mut self, track: Track) -> Self {
        self.extra_tracks.push(track);
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Check every parameter that does not depend on decoded audio
    pub fn validate(&self) -> Result<()> {
        if let Some(trim) = &self.trim {
            trim.validate()?;
        }
        dsp::validate(&self.effect)?;
        self.settings.validate()?;
        self.output.validate()?;
        self.extra_tracks.iter().try_for_each(Track::validate)
    }
}

impl fmt::Display for RemixJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remix {}", self.id)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs remix jobs against a shared decoder registry
///
/// Jobs share nothing mutable; one pipeline may run many jobs concurrently.
#[derive(Clone)]
pub struct RemixPipeline {
    decoders: Arc<DecoderRegistry>,
}

impl Default for RemixPipeline {
    fn default() -> Self {
        Self::new(DecoderRegistry::with_defaults())
    }
}

impl RemixPipeline {
    pub fn new(decoders: DecoderRegistry) -> Self {
        Self {
            decoders: Arc::new(decoders),
        }
    }

    /// Run `job`, publishing phases on `progress`
    ///
    /// On success the last published phase is `Ready`. On cancellation it is
    /// `Idle`, on any other error `Failed`.
    ///
    /// # Errors
    /// Any stage error, or `Cancelled` once `cancel` fires.
    #[instrument(skip_all, fields(job = %job.id))]
    pub async fn run(
        &self,
        job: RemixJob,
        progress: &watch::Sender<Phase>,
        cancel: &CancelToken,
    ) -> Result<EncodedAudio> {
        match self.run_stages(job, progress, cancel).await {
            Ok(output) => Ok(output),
            Err(RemixError::Cancelled) => {
                debug!("remix cancelled");
                progress.send_replace(Phase::Idle);
                Err(RemixError::Cancelled)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "remix failed");
                progress.send_replace(Phase::Failed);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        job: RemixJob,
        progress: &watch::Sender<Phase>,
        cancel: &CancelToken,
    ) -> Result<EncodedAudio> {
        job.validate()?;

        let RemixJob {
            original,
            take,
            trim,
            effect,
            settings,
            extra_tracks,
            output,
            ..
        } = job;

        let captured = SessionState::Captured { take };
        progress.send_replace(captured.phase());

        // The session keeps the only copy of the take; decoding hands it back
        let decoders = Arc::clone(&self.decoders);
        let (mut state, original, mut take) = run_stage(cancel, move || {
            let blob = captured.take().ok_or_else(|| RemixError::Processing {
                reason: "captured session holds no take".to_string(),
            })?;
            let original = decoders.decode(&original)?;
            let take = decoders.decode(blob)?;
            Ok((captured, original, take))
        })
        .await?;
        debug!(
            original_secs = original.duration_secs(),
            take_secs = take.duration_secs(),
            "decoded inputs"
        );

        if let Some(range) = trim {
            state = advance(state, SessionEvent::BeginTrim, progress)?;
            take = run_stage(cancel, move || range.apply(&take)).await?;
        }

        if effect != EffectRequest::None {
            state = advance(state, SessionEvent::BeginEffect, progress)?;
            take = run_stage(cancel, move || dsp::apply(&take, &effect)).await?;
        }

        state = advance(state, SessionEvent::BeginMix, progress)?;
        let request = settings.build_request(original, take, extra_tracks, output)?;
        let mixed = run_stage(cancel, move || mixer::mix(request)).await?;

        state = advance(state, SessionEvent::BeginEncode, progress)?;
        let encoded = run_stage(cancel, move || encode_wav(&mixed)).await?;

        state = advance(state, SessionEvent::Encoded(encoded), progress)?;
        let encoded = state.into_output().ok_or_else(|| RemixError::Processing {
            reason: "session finished without an artifact".to_string(),
        })?;

        info!(
            bytes = encoded.len(),
            checksum = %encoded.checksum(),
            "remix ready"
        );
        Ok(encoded)
    }
}

fn advance(
    state: SessionState,
    event: SessionEvent,
    progress: &watch::Sender<Phase>,
) -> Result<SessionState> {
    let next = state.apply(event)?;
    progress.send_replace(next.phase());
    Ok(next)
}

/// Run a CPU-bound stage on the blocking pool, racing cancellation
async fn run_stage<T, F>(cancel: &CancelToken, stage: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(RemixError::Cancelled);
    }

    let handle = tokio::task::spawn_blocking(stage);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RemixError::Cancelled),
        joined = handle => joined.map_err(|e| RemixError::Processing {
            reason: format!("stage task failed: {}", e),
        })?,
    }
}
