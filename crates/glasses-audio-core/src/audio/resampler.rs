use crate::{AudioError, CoreResult};

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Extra zero chunks pushed through on `finish` to drain the FFT delay line.
const MAX_FLUSH_CHUNKS: usize = 4;

/// Streaming sample-rate converter over interleaved `f32` frames.
///
/// Input may arrive in buffers of any size: partial chunks are carried over
/// to the next call, and [`finish`](Self::finish) pads and drains the tail
/// so the total output length is exactly `frames_in * output_rate / input_rate`.
/// The filter delay is dropped from the head of the output, so input frame 0
/// lands on output frame 0.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    chunk_frames: usize,
    pending: Vec<f32>,
    frames_in: u64,
    frames_out: u64,
    delay_remaining: usize,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> CoreResult<Self> {
        let resampler = Fft::<f32>::new(
            input_rate as usize,  // sample_rate_input
            output_rate as usize, // sample_rate_output
            CHUNK_SIZE,           // chunk_size
            SUB_CHUNKS,           // sub_chunks
            channels,             // nbr_channels
            FixedSync::Input,     // fixed
        )
        .map_err(|e| AudioError::session_failed(format!("Failed to create resampler: {}", e)))?;

        // The FFT may round the chunk up to fit the rate ratio.
        let chunk_frames = resampler.input_frames_next();
        let delay = resampler.output_delay();

        debug!(
            input_rate = input_rate,
            output_rate = output_rate,
            channels = channels,
            chunk_size = chunk_frames,
            output_delay = delay,
            "Resampler initialized"
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels,
            chunk_frames,
            pending: Vec::with_capacity(chunk_frames * channels * 2),
            frames_in: 0,
            frames_out: 0,
            delay_remaining: delay,
        })
    }

    /// Feed interleaved frames; returns whatever full chunks produced.
    #[track_caller]
    pub fn process(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        self.frames_in += (samples.len() / self.channels) as u64;
        self.pending.extend_from_slice(samples);

        let chunk_len = self.chunk_frames * self.channels;
        let mut output = Vec::new();
        let mut consumed = 0;

        while self.pending.len() - consumed >= chunk_len {
            let chunk = self.pending[consumed..consumed + chunk_len].to_vec();
            self.process_chunk(&chunk, &mut output)?;
            consumed += chunk_len;
        }

        self.pending.drain(..consumed);
        Ok(output)
    }

    /// Flush the carried-over tail and trim to the exact expected length.
    #[track_caller]
    pub fn finish(&mut self) -> CoreResult<Vec<f32>> {
        let chunk_len = self.chunk_frames * self.channels;
        let expected = self.expected_frames();
        let mut output = Vec::new();

        if !self.pending.is_empty() {
            let mut tail = std::mem::take(&mut self.pending);
            tail.resize(chunk_len, 0.0);
            self.process_chunk(&tail, &mut output)?;
        }

        let silence = vec![0.0f32; chunk_len];
        let mut flushes = 0;
        while self.frames_out < expected && flushes < MAX_FLUSH_CHUNKS {
            self.process_chunk(&silence, &mut output)?;
            flushes += 1;
        }

        if self.frames_out > expected {
            let excess = ((self.frames_out - expected) as usize).min(output.len() / self.channels);
            output.truncate(output.len() - excess * self.channels);
            self.frames_out -= excess as u64;
        }

        Ok(output)
    }

    /// One-shot conversion of a complete buffer.
    #[track_caller]
    #[instrument(skip(self, samples))]
    pub fn resample(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let mut output = self.process(samples)?;
        output.extend(self.finish()?);

        debug!(
            input_len = samples.len(),
            output_len = output.len(),
            input_rate = self.input_rate,
            output_rate = self.output_rate,
            "Resampled audio"
        );

        Ok(output)
    }

    fn expected_frames(&self) -> u64 {
        (self.frames_in as f64 * f64::from(self.output_rate) / f64::from(self.input_rate)).round()
            as u64
    }

    #[track_caller]
    fn process_chunk(&mut self, chunk: &[f32], output: &mut Vec<f32>) -> CoreResult<()> {
        let input_adapter = InterleavedSlice::new(chunk, self.channels, self.chunk_frames)
            .map_err(|e| AudioError::session_failed(format!("Failed to create input adapter: {}", e)))?;

        let output_frames = self.resampler.output_frames_max();
        let mut output_chunk = vec![0.0f32; output_frames * self.channels];

        let mut output_adapter =
            InterleavedSlice::new_mut(&mut output_chunk, self.channels, output_frames).map_err(
                |e| AudioError::session_failed(format!("Failed to create output adapter: {}", e)),
            )?;

        let (_input_frames, output_frames_written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| AudioError::session_failed(format!("Resampling failed: {}", e)))?;

        let skipped = self.delay_remaining.min(output_frames_written);
        self.delay_remaining -= skipped;
        output.extend_from_slice(
            &output_chunk[skipped * self.channels..output_frames_written * self.channels],
        );
        self.frames_out += (output_frames_written - skipped) as u64;
        Ok(())
    }
}
