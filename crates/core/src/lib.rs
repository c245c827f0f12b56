//! Identity and error primitives shared by every rolegate crate.

#![forbid(unsafe_code)]

/// Tenant, user and tier values read from the external session store.
pub mod session;

use thiserror::Error;

pub use session::{SessionSnapshot, TenantId, Tier, UserId};

/// Result type used across rolegate crates.
pub type AppResult<T> = Result<T, AppError>;

/// Failure categories surfaced by role storage, resolution and editing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Malformed role name, unknown permission key or bad tier value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Role or tenant context does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Role name already taken inside the tenant.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller tier may not edit role configuration.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Role store did not answer in time or its change feed could not be opened.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Unexpected storage or startup failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
