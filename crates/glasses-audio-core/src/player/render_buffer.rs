use std::sync::{
    OnceLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tokio::sync::Notify;

struct Loaded {
    samples: Vec<f32>,
    channels: usize,
    frames: usize,
}

/// Decoded audio shared with the render callback.
///
/// The callback only reads samples and bumps an atomic frame position, so
/// it never blocks; progress is `position / frames`.
#[derive(Default)]
pub(crate) struct RenderBuffer {
    loaded: OnceLock<Loaded>,
    position: AtomicUsize,
    drained: AtomicBool,
    finished: Notify,
}

impl RenderBuffer {
    /// Install the converted samples. Only the first call takes effect.
    pub(crate) fn load(&self, samples: Vec<f32>, channels: usize) -> usize {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        let _ = self.loaded.set(Loaded {
            samples,
            channels,
            frames,
        });
        self.total_frames()
    }

    pub(crate) fn total_frames(&self) -> usize {
        self.loaded.get().map_or(0, |l| l.frames)
    }

    pub(crate) fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    pub(crate) fn progress(&self) -> f32 {
        match self.total_frames() {
            0 => 0.0,
            total => (self.position() as f32 / total as f32).clamp(0.0, 1.0),
        }
    }

    /// Render callback body: copy the next frames, pad with silence.
    pub(crate) fn fill(&self, out: &mut [f32]) {
        let Some(loaded) = self.loaded.get() else {
            out.fill(0.0);
            return;
        };

        let channels = loaded.channels;
        let requested = out.len() / channels;
        let position = self.position.load(Ordering::Acquire);
        let count = requested.min(loaded.frames.saturating_sub(position));

        let start = position * channels;
        let end = start + count * channels;
        out[..count * channels].copy_from_slice(&loaded.samples[start..end]);
        out[count * channels..].fill(0.0);

        let position = position + count;
        self.position.store(position, Ordering::Release);

        if position >= loaded.frames && !self.drained.swap(true, Ordering::AcqRel) {
            self.finished.notify_one();
        }
    }

    /// Resolves once the last frame has been handed to the device.
    pub(crate) async fn finished(&self) {
        if self.drained.load(Ordering::Acquire) {
            return;
        }
        self.finished.notified().await;
    }
}
