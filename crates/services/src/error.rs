//! Shared error types for the services crate.

use thiserror::Error;

use gateway::GatewayError;

/// Errors emitted by exam session services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("could not load quiz: {0}")]
    Load(#[source] GatewayError),
    #[error("could not submit quiz: {0}")]
    Submit(#[source] GatewayError),
    #[error("no signed-in account, cannot submit")]
    Unauthenticated,
}

impl SessionError {
    /// True when trying the same operation again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Load(err) | SessionError::Submit(err) => {
                matches!(err, GatewayError::Network(_))
            }
            SessionError::Unauthenticated => false,
        }
    }
}
