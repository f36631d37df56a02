use crate::wav::{CANONICAL_HEADER_LEN, WavFormat};

use std::{
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use hound::WavWriter;
use tracing::debug;

/// Totals reported once a file is finalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSummary {
    /// Bytes of sample data.
    pub data_len: u64,
    /// Bytes on disk, header included.
    pub file_len: u64,
    /// Complete frames written.
    pub frames: u64,
}

/// Streams 16-bit PCM into a WAV file.
///
/// hound writes a zero-size header on creation; [`sync_header`](Self::sync_header)
/// and [`finalize`](Self::finalize) patch it in place, so the file is a valid
/// WAV at every sync point of the capture.
pub struct WavFileWriter {
    writer: WavWriter<BufWriter<File>>,
    path: PathBuf,
    format: WavFormat,
    data_len: u64,
}

impl WavFileWriter {
    /// Create (or truncate) `path` and write the placeholder header.
    pub fn create(path: impl AsRef<Path>, format: WavFormat) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer = WavWriter::create(&path, format.into()).map_err(into_io)?;
        debug!(path = ?path, sample_rate = format.sample_rate, "WAV placeholder header written");

        Ok(Self {
            writer,
            path,
            format,
            data_len: 0,
        })
    }

    /// Append samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        let new_len = self.data_len + (samples.len() * 2) as u64;
        if new_len > u64::from(u32::MAX) - CANONICAL_HEADER_LEN as u64 {
            return Err(io::Error::other("WAV data exceeds the 4 GiB RIFF limit"));
        }

        for &sample in samples {
            self.writer.write_sample(sample).map_err(into_io)?;
        }
        self.data_len = new_len;
        Ok(())
    }

    /// Patch the header sizes to the samples written so far and flush.
    pub fn sync_header(&mut self) -> io::Result<()> {
        self.writer.flush().map_err(into_io)
    }

    /// Patch the header with the final sizes and flush to disk.
    pub fn finalize(self) -> io::Result<WavSummary> {
        let align = self.format.block_align().max(1) as u64;
        let data_len = self.data_len;
        self.writer.finalize().map_err(into_io)?;

        let file_len = std::fs::metadata(&self.path)?.len();
        File::open(&self.path)?.sync_all()?;

        debug!(path = ?self.path, data_len, file_len, "WAV file finalised");
        Ok(WavSummary {
            data_len,
            file_len,
            frames: data_len / align,
        })
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn into_io(e: hound::Error) -> io::Error {
    match e {
        hound::Error::IoError(e) => e,
        other => io::Error::other(other.to_string()),
    }
}
