use crate::{
    AudioError, CoreResult,
    recorder::{ActiveRecording, WriterReport},
    session::{AudioSessionController, SessionLease},
};

use std::{io, path::PathBuf, sync::Arc};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Everything a recording holds on the hardware and the filesystem.
///
/// [`release`](Self::release) runs every step in order even when an earlier
/// one fails: stop capture → drop the callback → close the file → release the
/// session (which tears down SCO last). The first error is kept.
pub(crate) struct CaptureResources {
    pub(crate) active: Arc<ActiveRecording>,
    pub(crate) path: PathBuf,
    pub(crate) writer: Option<JoinHandle<CoreResult<WriterReport>>>,
    pub(crate) lease: Option<SessionLease>,
}

/// Outcome of a release.
pub(crate) struct Released {
    pub(crate) report: Option<WriterReport>,
    pub(crate) error: Option<AudioError>,
}

impl CaptureResources {
    pub(crate) async fn release(mut self, sessions: &AudioSessionController) -> Released {
        let mut error: Option<AudioError> = None;
        let mut keep = |step: &str, e: AudioError| {
            warn!(session_id = %self.active.id, step, error = %e, "Release step failed");
            error.get_or_insert(e);
        };

        // Stop capture.
        let stream = self.active.stream_guard().take();
        if let Some(mut stream) = stream {
            if let Err(e) = stream.stop() {
                keep("stop capture", AudioError::from_device(e));
            }
            // Drop the callback; this closes the writer's channel.
            drop(stream);
            debug!(session_id = %self.active.id, "Capture callback removed");
        }

        // Close the file.
        let mut report = None;
        if let Some(writer) = self.writer.take() {
            match writer.await {
                Ok(Ok(r)) => report = Some(r),
                Ok(Err(e)) => keep("close file", e),
                Err(e) => keep(
                    "close file",
                    AudioError::file_io(&self.path, io::Error::other(e.to_string())),
                ),
            }
        }

        // Release the session and tear down SCO.
        if let Some(lease) = self.lease.take() {
            if let Err(e) = sessions.release(lease).await {
                keep("release session", e);
            }
        }

        Released { report, error }
    }
}
