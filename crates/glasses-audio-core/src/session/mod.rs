mod controller;
mod lease;
mod plan;

pub use {
    controller::AudioSessionController,
    lease::{SessionLease, SessionPurpose},
};

pub(crate) use plan::{SessionPlan, plan_session, required_permissions};
