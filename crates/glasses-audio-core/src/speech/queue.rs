use crate::{
    OperationFailure,
    model::{AppLifecycle, PendingSpeechRequest, SourcePreference, SpeechDisposition, SpeechFailure},
    player::Player,
    speech::SpeechSynthesizer,
};

use std::{
    collections::VecDeque,
    mem,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, SystemTime},
};

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

struct QueueState {
    lifecycle: AppLifecycle,
    pending: VecDeque<PendingSpeechRequest>,
}

/// What one flush did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Items played to completion.
    pub spoken: usize,
    /// Items whose synthesis or playback failed.
    pub failures: Vec<SpeechFailure>,
    /// Items put back because the app left the foreground mid-flush.
    pub requeued: usize,
}

/// Spoken notifications that are never lost and never attempted in the background.
///
/// In the foreground `speak` plays immediately. Otherwise the request is
/// queued and replayed FIFO on the next foreground transition, one utterance
/// at a time with a fixed gap between them.
pub struct DeferredSpeechQueue {
    player: Arc<Player>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    inter_item_delay: Duration,
    state: Mutex<QueueState>,
    lane: tokio::sync::Mutex<()>,
    flushing: AtomicBool,
    failures: Mutex<Vec<SpeechFailure>>,
}

impl DeferredSpeechQueue {
    /// Queue speaking through `player`, starting in the foreground.
    pub fn new(
        player: Arc<Player>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        inter_item_delay: Duration,
    ) -> Self {
        Self {
            player,
            synthesizer,
            inter_item_delay,
            state: Mutex::new(QueueState {
                lifecycle: AppLifecycle::Foreground,
                pending: VecDeque::new(),
            }),
            lane: tokio::sync::Mutex::new(()),
            flushing: AtomicBool::new(false),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Speak now in the foreground, queue otherwise.
    #[instrument(skip(self))]
    pub async fn speak(&self, text: &str) -> Result<SpeechDisposition, OperationFailure> {
        {
            let mut state = self.state_guard();
            if !state.lifecycle.is_foreground() {
                state.pending.push_back(PendingSpeechRequest {
                    text: text.to_string(),
                    enqueued_at: SystemTime::now(),
                });
                let queue_len = state.pending.len();
                info!(queue_len, lifecycle = ?state.lifecycle, "Speech deferred");
                return Ok(SpeechDisposition::Deferred { queue_len });
            }
        }

        self.speak_now(text).await?;
        Ok(SpeechDisposition::Spoken)
    }

    /// Current lifecycle.
    pub fn lifecycle(&self) -> AppLifecycle {
        self.state_guard().lifecycle
    }

    /// Items waiting for the foreground.
    pub fn pending(&self) -> Vec<PendingSpeechRequest> {
        self.state_guard().pending.iter().cloned().collect()
    }

    /// Every failure recorded by flushes so far.
    pub fn failures(&self) -> Vec<SpeechFailure> {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Record a lifecycle change. Returning to the foreground starts a flush,
    /// whose handle is returned.
    #[instrument(skip(self))]
    pub fn set_lifecycle(
        self: &Arc<Self>,
        lifecycle: AppLifecycle,
    ) -> Option<JoinHandle<FlushReport>> {
        let previous = {
            let mut state = self.state_guard();
            mem::replace(&mut state.lifecycle, lifecycle)
        };
        debug!(?previous, "App lifecycle changed");

        if previous.is_foreground() || !lifecycle.is_foreground() {
            return None;
        }

        let queue = Arc::clone(self);
        Some(tokio::spawn(async move { queue.flush().await }))
    }

    /// Replay everything queued, strictly FIFO. Concurrent flushes collapse
    /// into the one already running.
    pub async fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();

        loop {
            if self
                .flushing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                debug!("Flush already in progress");
                break;
            }

            self.drain(&mut report).await;
            self.flushing.store(false, Ordering::Release);

            // An enqueue may have slipped in between the last snapshot and the release.
            let missed = {
                let state = self.state_guard();
                state.lifecycle.is_foreground() && !state.pending.is_empty()
            };
            if !missed {
                break;
            }
        }

        info!(
            spoken = report.spoken,
            failed = report.failures.len(),
            requeued = report.requeued,
            "Speech flush finished"
        );
        report
    }

    async fn drain(&self, report: &mut FlushReport) {
        loop {
            // Snapshot-and-clear; enqueues after this land in the next round.
            let batch = {
                let mut state = self.state_guard();
                if !state.lifecycle.is_foreground() {
                    return;
                }
                mem::take(&mut state.pending)
            };
            if batch.is_empty() {
                return;
            }
            info!(items = batch.len(), "Flushing deferred speech");

            let mut items = batch.into_iter();
            let mut first = true;
            while let Some(item) = items.next() {
                if !first {
                    tokio::time::sleep(self.inter_item_delay).await;
                }
                first = false;

                if !self.lifecycle().is_foreground() {
                    let remaining: Vec<_> = std::iter::once(item).chain(items).collect();
                    report.requeued += remaining.len();
                    let mut state = self.state_guard();
                    for request in remaining.into_iter().rev() {
                        state.pending.push_front(request);
                    }
                    info!(requeued = report.requeued, "Left foreground mid-flush, requeued");
                    return;
                }

                match self.speak_now(&item.text).await {
                    Ok(()) => report.spoken += 1,
                    Err(failure) => {
                        warn!(text = %item.text, %failure, "Deferred speech failed");
                        let failure = SpeechFailure {
                            text: item.text,
                            failure,
                        };
                        self.failures
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push(failure.clone());
                        report.failures.push(failure);
                    }
                }
            }
        }
    }

    /// Synthesise and play one item to completion on the speech lane.
    async fn speak_now(&self, text: &str) -> Result<(), OperationFailure> {
        let _lane = self.lane.lock().await;

        let path = self
            .synthesizer
            .synthesize(text)
            .await
            .map_err(OperationFailure::from)?;
        let mut completion = self
            .player
            .play_audio(&path, SourcePreference::Auto)
            .await
            .map_err(OperationFailure::from)?;

        // Completed and stopped both count as spoken.
        completion.outcome().await.map(|_| ())
    }

    fn state_guard(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
