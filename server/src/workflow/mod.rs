//! Workflow Runtime
//!
//! Named events are queued in Redis and handled by registered functions. Each
//! function is a sequence of memoized steps, so a retried run only repeats the
//! steps that did not complete.

mod bus;
mod error;
mod functions;
mod handlers;
mod queries;
pub mod signing;
mod steps;
mod store;
#[cfg(test)]
pub mod testing;

use axum::{routing::get, Router};

use crate::api::AppState;

pub use bus::{
    enqueue, retry_delay, spawn_event_worker, Envelope, EventBus, EventSender, MAX_ATTEMPTS,
    RETRY_DELAYS_SECS,
};
pub use error::WorkflowError;
pub use functions::{
    function_for, FunctionSpec, Links, Runtime, VerificationRun, DEFAULT_REJECTION_REASON,
    FUNCTIONS,
};
pub use steps::{MemoryStepStore, PgStepStore, StepStore, Steps};
pub use store::{
    check_transition, Approver, Decision, DecisionOutcome, PgVerificationStore,
    VerificationStore, VERIFIER_ROLES,
};

/// Workflow routes.
///
/// - GET /api/workflows - Registered functions and their triggers
/// - POST /api/workflows - Signed event ingest
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/workflows",
        get(handlers::list_functions).post(handlers::ingest),
    )
}
