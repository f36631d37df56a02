mod active;
#[allow(clippy::module_inception)]
mod recorder;
mod release;
mod writer_loop;

pub use recorder::Recorder;

pub(crate) use {
    active::{ActiveRecording, StopReason},
    release::CaptureResources,
    writer_loop::{CaptureStats, WriterReport, run_writer},
};
