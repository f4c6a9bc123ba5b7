//! Session and socket-credential clients for ragchat.
//!
//! The backend issues a cookie-based session through `/api/login` and
//! friends; deployments that protect the chat socket additionally issue a
//! short-lived bearer token through `/api/token`, attached to the socket
//! URL at connect time.
//!
//! This crate provides:
//!
//! - [`AuthClient`]: the session lifecycle (login, register, logout, me,
//!   forgot-password) over a cookie-holding HTTP client
//! - [`TokenProvider`] / [`ApiTokenProvider`]: bounded-retry acquisition
//!   of the socket bearer credential
//!
//! # Example
//!
//! ```no_run
//! use ragchat_auth::{AuthClient, AuthConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AuthClient::new(AuthConfig::new("http://localhost:8000"));
//! let profile = client.login("user@example.com", "secret").await?;
//! println!("logged in as {}", profile.email);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod token;

pub use client::{AuthClient, RegisterRequest, TokenResponse, UserProfile};
pub use error::{AuthError, Result};
pub use token::{ApiTokenProvider, TokenProvider};

/// Configuration for the session and credential endpoints.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Backend base URL (e.g. `http://localhost:8000`).
    pub base_url: String,
    /// Attempt budget for socket-credential issuance.
    pub token_attempts: u32,
}

impl AuthConfig {
    /// Create a config for the given backend base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_attempts: Self::DEFAULT_TOKEN_ATTEMPTS,
        }
    }

    /// Default credential attempt budget.
    pub const DEFAULT_TOKEN_ATTEMPTS: u32 = 3;

    /// The login endpoint URL.
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}/api/login", self.base_url)
    }

    /// The registration endpoint URL.
    #[must_use]
    pub fn register_url(&self) -> String {
        format!("{}/api/register", self.base_url)
    }

    /// The logout endpoint URL.
    #[must_use]
    pub fn logout_url(&self) -> String {
        format!("{}/api/logout", self.base_url)
    }

    /// The session-check endpoint URL.
    #[must_use]
    pub fn me_url(&self) -> String {
        format!("{}/api/me", self.base_url)
    }

    /// The password-recovery endpoint URL.
    #[must_use]
    pub fn forgot_password_url(&self) -> String {
        format!("{}/api/forgot-password", self.base_url)
    }

    /// The socket-credential endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.base_url)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.token_attempts, 3);
    }

    #[test]
    fn config_urls() {
        let config = AuthConfig::new("https://api.example.com/");
        assert_eq!(config.login_url(), "https://api.example.com/api/login");
        assert_eq!(config.register_url(), "https://api.example.com/api/register");
        assert_eq!(config.logout_url(), "https://api.example.com/api/logout");
        assert_eq!(config.me_url(), "https://api.example.com/api/me");
        assert_eq!(
            config.forgot_password_url(),
            "https://api.example.com/api/forgot-password"
        );
        assert_eq!(config.token_url(), "https://api.example.com/api/token");
    }
}
