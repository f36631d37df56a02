//! glasses-audio: command-line host for the glasses audio engine.

mod app;
mod cli;
mod clip_synthesizer;
mod config;
mod error;

pub(crate) use {
    app::App,
    cli::{Cli, Command},
    clip_synthesizer::ClipSynthesizer,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use std::sync::Arc;

use clap::Parser;
use glasses_audio_core::{AudioPlatform, CpalPlatform, SimulatedPlatform};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SIMULATED_GLASSES: &str = "Simulated Glasses";

/// Application entry point.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let platform = build_platform(cli.simulate);
    info!(platform = platform.name(), command = ?cli.command, "glasses-audio starting");

    let app = App::new(platform, config);
    if let Err(e) = app.run(cli.command).await {
        error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

fn build_platform(simulate: bool) -> Arc<dyn AudioPlatform> {
    if simulate {
        let platform = SimulatedPlatform::new();
        platform.connect_glasses(SIMULATED_GLASSES);
        Arc::new(platform)
    } else {
        Arc::new(CpalPlatform::new())
    }
}
