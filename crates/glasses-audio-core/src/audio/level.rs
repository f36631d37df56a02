/// RMS level over fixed ~32 ms windows.
pub struct LevelMeter {
    window_samples: usize,
    sum_sq: f32,
    count: usize,
    level: f32,
}

impl LevelMeter {
    /// Window size adapts to the sample rate so updates arrive at a steady pace.
    pub fn new(sample_rate: u32) -> Self {
        let window_samples = ((sample_rate as f32 * 0.032).round() as usize).max(128);
        Self {
            window_samples,
            sum_sq: 0.0,
            count: 0,
            level: 0.0,
        }
    }

    /// Feed 16-bit samples; returns the level of the last window completed, if any.
    pub fn push(&mut self, samples: &[i16]) -> Option<f32> {
        let mut completed = None;

        for &sample in samples {
            let normalized = f32::from(sample) / f32::from(i16::MAX);
            self.sum_sq += normalized * normalized;
            self.count += 1;

            if self.count >= self.window_samples {
                let rms = (self.sum_sq / self.count as f32).sqrt().clamp(0.0, 1.0);
                self.sum_sq = 0.0;
                self.count = 0;
                self.level = rms;
                completed = Some(rms);
            }
        }

        completed
    }

    /// Most recent completed window level.
    pub fn level(&self) -> f32 {
        self.level
    }
}
