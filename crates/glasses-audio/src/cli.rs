use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glasses_audio_core::SourcePreference;

/// Route, record and play audio on a phone paired with smart glasses.
#[derive(Debug, Parser)]
#[command(name = "glasses-audio", version, about)]
pub struct Cli {
    /// Use the in-process simulated phone (built-in devices plus glasses).
    #[arg(long, global = true, env = "GLASSES_AUDIO_SIMULATE")]
    pub simulate: bool,

    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "GLASSES_AUDIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the current audio route.
    Route,

    /// Stream route changes and routing warnings until Ctrl-C.
    Watch,

    /// Record a 16 kHz mono WAV file.
    Record {
        /// Stop after this many seconds (0 = until Ctrl-C).
        #[arg(long)]
        seconds: Option<f64>,

        /// Capture hardware: phone, glasses or auto.
        #[arg(long)]
        source: Option<SourcePreference>,

        /// Output file (default: a fresh file in the recordings directory).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Play a WAV file on the routed output.
    Play {
        /// File to play.
        path: PathBuf,

        /// Output hardware: phone, glasses or auto.
        #[arg(long)]
        source: Option<SourcePreference>,
    },

    /// Speak a line from the pre-rendered clip directory.
    Speak {
        /// Text to speak.
        text: String,

        /// Queue the line as if the app were in the background, then flush it.
        #[arg(long)]
        deferred: bool,
    },
}
