//! Session error types.
//!
//! Every failure in the session engine is local and synchronous. A failed
//! operation leaves the session exactly as it was, so callers can report the
//! error and keep going.

use thiserror::Error;

use crate::session::SessionState;

/// Errors raised by question construction, session mutation, and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A question or session config was malformed at construction.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not allowed in the session's current lifecycle state.
    #[error("invalid state: cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// An index or question id was out of range or unknown.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SessionError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        SessionError::Validation(msg.into())
    }

    pub(crate) fn input(msg: impl Into<String>) -> Self {
        SessionError::InvalidInput(msg.into())
    }

    /// Returns `true` if the error came from a lifecycle violation rather
    /// than bad input.
    pub fn is_state_error(&self) -> bool {
        matches!(self, SessionError::InvalidState { .. })
    }
}
