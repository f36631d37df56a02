//! Shared fixtures: a fast engine configuration, the simulated phone wired
//! into every component, WAV fixtures and a scriptable synthesizer.

use crate::{
    AudioError, AudioPlatform, AudioSessionController, CoreResult, EngineConfig,
    InterruptionCoordinator, InterruptionState, Player, Recorder, RouteMonitor,
    SimulatedPlatform, SpeechSynthesizer,
};

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tempfile::TempDir;

pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub(crate) const SCO_SETTLE: Duration = Duration::from_millis(150);
pub(crate) const SPEECH_GAP: Duration = Duration::from_millis(20);
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Timings short enough for tests, production formats.
pub(crate) fn fast_config() -> EngineConfig {
    EngineConfig {
        route_poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
        sco_settle_delay_ms: SCO_SETTLE.as_millis() as u64,
        speech_inter_item_delay_ms: SPEECH_GAP.as_millis() as u64,
        progress_interval_ms: 20,
        target_sample_rate: 16_000,
        header_sync_interval_ms: 50,
    }
}

/// Every engine component over one simulated phone.
pub(crate) struct Engine {
    pub(crate) platform: Arc<SimulatedPlatform>,
    pub(crate) monitor: Arc<RouteMonitor>,
    pub(crate) sessions: Arc<AudioSessionController>,
    pub(crate) recorder: Arc<Recorder>,
    pub(crate) player: Arc<Player>,
    pub(crate) coordinator: Arc<InterruptionCoordinator>,
    pub(crate) dir: TempDir,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Self::with_platform(SimulatedPlatform::new())
    }

    pub(crate) fn with_platform(platform: SimulatedPlatform) -> Self {
        let config = fast_config();
        let platform = Arc::new(platform);
        let native: Arc<dyn AudioPlatform> = platform.clone();
        let monitor = Arc::new(RouteMonitor::new(
            Arc::clone(&native),
            config.route_poll_interval(),
        ));
        let sessions = Arc::new(AudioSessionController::new(
            Arc::clone(&native),
            Arc::clone(&monitor),
            &config,
        ));
        let interruption = InterruptionState::new();
        let recorder = Arc::new(Recorder::new(
            Arc::clone(&native),
            Arc::clone(&sessions),
            interruption.clone(),
            &config,
        ));
        let player = Arc::new(Player::new(
            Arc::clone(&native),
            Arc::clone(&sessions),
            interruption.clone(),
            &config,
        ));
        let coordinator = Arc::new(InterruptionCoordinator::new(
            native,
            Arc::clone(&sessions),
            Arc::clone(&recorder),
            Arc::clone(&player),
            interruption,
        ));

        Self {
            platform,
            monitor,
            sessions,
            recorder,
            player,
            coordinator,
            dir: TempDir::new().unwrap(),
        }
    }

    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Write a 16-bit sine WAV with hound.
pub(crate) fn write_tone(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (sample_rate as f32 * seconds) as usize;
    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 0.3 * f32::from(i16::MAX)) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Poll `condition` until it holds or `timeout` elapses.
pub(crate) async fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
}

/// Synthesizer that renders each text as a short tone and logs the calls.
pub(crate) struct ToneSynthesizer {
    dir: PathBuf,
    clip_seconds: f32,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, Instant)>>,
    counter: AtomicUsize,
}

impl ToneSynthesizer {
    pub(crate) fn new(dir: &Path, clip_seconds: f32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            clip_seconds,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    /// Synthesis of `text` fails.
    pub(crate) fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub(crate) fn spoken_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for ToneSynthesizer {
    async fn synthesize(&self, text: &str) -> CoreResult<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), Instant::now()));

        if self.failing.contains(text) {
            return Err(AudioError::decode_failed(format!("cannot synthesize {text:?}")));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("speech-{n}.wav"));
        write_tone(&path, 22_050, 1, self.clip_seconds);
        Ok(path)
    }
}
