mod coordinator;
mod state;

pub use {
    coordinator::InterruptionCoordinator,
    state::{InterruptionSnapshot, InterruptionState},
};
