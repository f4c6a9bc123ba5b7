//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur against the session and credential endpoints.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credentials were rejected.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// Registration was rejected (duplicate email, weak password, ...).
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// No valid session; the caller must log in first.
    #[error("not authenticated")]
    Unauthorized,

    /// Too many requests, rate limited.
    #[error("rate limited")]
    RateLimited,

    /// The socket credential could not be issued.
    #[error("token issuance failed: {0}")]
    TokenIssuance(String),

    /// The credential fetch exhausted its attempt budget.
    #[error("token issuance gave up after {attempts} attempts: {last_error}")]
    TokenAttemptsExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: String,
    },

    /// Network failure or an unexpected server response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::TokenIssuance(_) | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_classification() {
        assert!(AuthError::RateLimited.is_retriable());
        assert!(AuthError::TokenIssuance("503".into()).is_retriable());
        assert!(AuthError::Internal("connection reset".into()).is_retriable());
        assert!(!AuthError::Unauthorized.is_retriable());
        assert!(!AuthError::LoginFailed("bad password".into()).is_retriable());
        assert!(!AuthError::TokenAttemptsExhausted {
            attempts: 3,
            last_error: "503".into()
        }
        .is_retriable());
    }
}
