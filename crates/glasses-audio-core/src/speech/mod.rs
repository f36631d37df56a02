mod queue;
mod synthesizer;

pub use {
    queue::{DeferredSpeechQueue, FlushReport},
    synthesizer::SpeechSynthesizer,
};
