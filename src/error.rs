//! Named policy errors
//!
//! Policy violations are rejected synchronously and surfaced to the caller
//! by name. They travel inside `anyhow::Error` like every other failure in
//! the crate and can be recovered with `downcast_ref::<PolicyError>()`.

use thiserror::Error;

use crate::models::constants::MAX_HIERARCHY_DEPTH;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("Session '{0}' not found")]
    UnknownSession(String),

    #[error("Session '{0}' already exists")]
    DuplicateSession(String),

    #[error("Cannot launch '{name}': depth {depth} exceeds maximum hierarchy depth ({MAX_HIERARCHY_DEPTH})")]
    DepthExceeded { name: String, depth: usize },

    #[error("'{source_name}' is not an ancestor of '{target}'")]
    NotAncestor { source_name: String, target: String },

    #[error("Insufficient budget on '{name}': ${remaining:.2} remaining, ${requested:.2} requested")]
    InsufficientBudget {
        name: String,
        remaining: f64,
        requested: f64,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid oversight policy '{0}'. Expected 'wait', 'fail' or 'timeout:<duration>'")]
    InvalidPolicy(String),

    #[error("No reporting session: SHEPHERD_SESSION_NAME is not set (report must run inside a launched agent)")]
    NoReportingContext,

    #[error("Invalid report status '{0}'. Expected 'success' or 'failure'")]
    InvalidReportStatus(String),
}
