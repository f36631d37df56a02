use crate::{
    AudioError, CoreResult,
    audio::{FormatConverter, LevelMeter},
    wav::{WavFileWriter, WavSummary},
};

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicU64, Ordering},
        mpsc::{Receiver, RecvTimeoutError},
    },
    time::{Duration, Instant},
};

use tokio::sync::Notify;
use tracing::debug;

const RECV_TIMEOUT: Duration = Duration::from_millis(50);

/// Counters the writer publishes for progress events.
#[derive(Debug, Default)]
pub(crate) struct CaptureStats {
    frames: AtomicU64,
    level_bits: AtomicU32,
}

impl CaptureStats {
    pub(crate) fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub(crate) fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Acquire))
    }

    fn add_frames(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::AcqRel);
    }

    fn set_level(&self, level: f32) {
        self.level_bits.store(level.to_bits(), Ordering::Release);
    }
}

/// What the writer produced once the capture channel closed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriterReport {
    pub(crate) summary: WavSummary,
    pub(crate) sample_rate: u32,
}

/// Blocking writer loop: convert every captured buffer and append it.
///
/// Runs until every sender is gone, which happens when the capture stream
/// (and with it the callback) is dropped. The header is patched every
/// `sync_interval` so a partial file is always a valid WAV.
pub(crate) fn run_writer(
    buffers: Receiver<Vec<f32>>,
    writer: WavFileWriter,
    mut converter: FormatConverter,
    stats: Arc<CaptureStats>,
    sync_interval: Duration,
    done: Arc<Notify>,
) -> CoreResult<WriterReport> {
    let result = pump(&buffers, writer, &mut converter, &stats, sync_interval);
    done.notify_one();
    result
}

fn pump(
    buffers: &Receiver<Vec<f32>>,
    mut writer: WavFileWriter,
    converter: &mut FormatConverter,
    stats: &CaptureStats,
    sync_interval: Duration,
) -> CoreResult<WriterReport> {
    let path: PathBuf = writer.path().to_path_buf();
    let mut meter = LevelMeter::new(converter.target_rate());
    let mut last_sync = Instant::now();

    loop {
        match buffers.recv_timeout(RECV_TIMEOUT) {
            Ok(buffer) => {
                let pcm = converter.convert(&buffer)?;
                writer
                    .write_samples(&pcm)
                    .map_err(|e| AudioError::file_io(&path, e))?;
                if let Some(level) = meter.push(&pcm) {
                    stats.set_level(level);
                }
                stats.add_frames(pcm.len());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_sync.elapsed() >= sync_interval {
            writer
                .sync_header()
                .map_err(|e| AudioError::file_io(&path, e))?;
            last_sync = Instant::now();
        }
    }

    let tail = converter.finish()?;
    writer
        .write_samples(&tail)
        .map_err(|e| AudioError::file_io(&path, e))?;
    stats.add_frames(tail.len());

    let summary = writer.finalize().map_err(|e| AudioError::file_io(&path, e))?;
    debug!(
        frames = summary.frames,
        bytes = summary.file_len,
        "Recording file finalised"
    );
    Ok(WriterReport {
        summary,
        sample_rate: converter.target_rate(),
    })
}
