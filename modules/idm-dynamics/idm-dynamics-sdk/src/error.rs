//! Error types for the idm-dynamics module.

use thiserror::Error;

/// Errors surfaced by [`crate::DynamicsClient`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DynamicsError {
    /// A filter argument cannot be expressed as a query.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The CRM answered with a non-success status.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The CRM answered with JSON of an unexpected shape.
    #[error("{operation} response has unrecognised JSON")]
    UnexpectedShape { operation: String },

    /// The CRM could not be reached or kept asking to retry.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}
