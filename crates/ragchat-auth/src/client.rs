//! Session lifecycle client.
//!
//! The backend tracks sessions with cookies, so this client keeps a
//! cookie store and should be shared (via [`AuthClient::http_client`])
//! with any other client that talks to session-guarded endpoints.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Request payload for registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Email address, also the login identifier.
    pub email: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub last_name: String,
    /// Password.
    pub password: String,
}

/// User profile as returned by login and session-check endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    /// Email address.
    pub email: String,
    /// Given name, when the account has one.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name, when the account has one.
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Bearer credential for the chat socket.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The opaque token value.
    pub access_token: String,
    /// Token scheme, `bearer`.
    pub token_type: String,
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ForgotPasswordBody<'a> {
    email: &'a str,
}

/// Client for the session and credential endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: AuthConfig,
    client: reqwest::Client,
}

impl AuthClient {
    /// Create a new client with its own cookie store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen
    /// with default TLS).
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    /// The underlying HTTP client, sharing this client's cookie store.
    #[must_use]
    pub fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate with email and password. On success the session
    /// cookie is stored on the shared client.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::LoginFailed`] for rejected credentials,
    /// [`AuthError::RateLimited`] on 429, or [`AuthError::Internal`] for
    /// network and server failures.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let response = self
            .client
            .post(self.config.login_url())
            .json(&LoginBody { email, password })
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("request failed: {e}")))?;

        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| AuthError::Internal(format!("invalid response: {e}")));
        }

        Err(match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AuthError::LoginFailed(Self::error_detail(response).await)
            }
            StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited,
            status => AuthError::Internal(format!("HTTP {status}")),
        })
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RegistrationFailed`] when the backend rejects
    /// the payload, or [`AuthError::Internal`] for network failures.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile> {
        let response = self
            .client
            .post(self.config.register_url())
            .json(request)
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("request failed: {e}")))?;

        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| AuthError::Internal(format!("invalid response: {e}")));
        }

        Err(match response.status() {
            StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited,
            _ => AuthError::RegistrationFailed(Self::error_detail(response).await),
        })
    }

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] for network failures; an already
    /// missing session is not an error.
    pub async fn logout(&self) -> Result<()> {
        let response = self
            .client
            .post(self.config.logout_url())
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("request failed: {e}")))?;

        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(AuthError::Internal(format!("HTTP {}", response.status())))
        }
    }

    /// Check the current session; drives the authenticated flag.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] when no valid session exists,
    /// or [`AuthError::Internal`] for network and server failures.
    pub async fn me(&self) -> Result<UserProfile> {
        let response = self
            .client
            .get(self.config.me_url())
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| AuthError::Internal(format!("invalid response: {e}"))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::Unauthorized),
            status => Err(AuthError::Internal(format!("HTTP {status}"))),
        }
    }

    /// Request a password-recovery email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] for network and server failures.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let response = self
            .client
            .post(self.config.forgot_password_url())
            .json(&ForgotPasswordBody { email })
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("request failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AuthError::Internal(format!("HTTP {}", response.status())))
        }
    }

    /// Issue a bearer credential for the chat socket. Requires a live
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] without a session, or
    /// [`AuthError::TokenIssuance`] for any other failure.
    pub async fn issue_token(&self) -> Result<TokenResponse> {
        let response = self
            .client
            .post(self.config.token_url())
            .send()
            .await
            .map_err(|e| AuthError::TokenIssuance(format!("request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| AuthError::TokenIssuance(format!("invalid response: {e}"))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::Unauthorized),
            status => Err(AuthError::TokenIssuance(format!("HTTP {status}"))),
        }
    }

    /// Pull the human-readable detail out of an error response.
    async fn error_detail(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ApiErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => format!("HTTP {status}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AuthClient {
        AuthClient::new(AuthConfig::new(server.uri()))
    }

    #[tokio::test]
    async fn login_success_returns_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_json(serde_json::json!({
                "email": "user@example.com",
                "password": "secret",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "user@example.com",
                "first_name": "Ada",
                "last_name": "Lovelace",
            })))
            .mount(&server)
            .await;

        let profile = client_for(&server)
            .login("user@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(profile.email, "user@example.com");
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn login_rejection_maps_to_login_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .login("user@example.com", "wrong")
            .await
            .unwrap_err();
        match err {
            AuthError::LoginFailed(detail) => assert_eq!(detail, "Invalid credentials"),
            other => panic!("expected LoginFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn me_without_session_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).me().await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn me_with_session_returns_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"email": "user@example.com"})),
            )
            .mount(&server)
            .await;

        let profile = client_for(&server).me().await.unwrap();
        assert_eq!(profile.email, "user@example.com");
        assert!(profile.first_name.is_none());
    }

    #[tokio::test]
    async fn logout_tolerates_missing_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/logout"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(client_for(&server).logout().await.is_ok());
    }

    #[tokio::test]
    async fn issue_token_returns_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-123",
                "token_type": "bearer",
            })))
            .mount(&server)
            .await;

        let token = client_for(&server).issue_token().await.unwrap();
        assert_eq!(token.access_token, "tok-123");
        assert_eq!(token.token_type, "bearer");
    }

    #[tokio::test]
    async fn issue_token_server_error_is_issuance_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).issue_token().await.unwrap_err();
        assert!(matches!(err, AuthError::TokenIssuance(_)));
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn register_rejection_carries_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(serde_json::json!({"detail": "email already registered"})),
            )
            .mount(&server)
            .await;

        let request = RegisterRequest {
            email: "user@example.com".to_string(),
            name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "secret".to_string(),
        };
        let err = client_for(&server).register(&request).await.unwrap_err();
        match err {
            AuthError::RegistrationFailed(detail) => {
                assert_eq!(detail, "email already registered");
            }
            other => panic!("expected RegistrationFailed, got {other:?}"),
        }
    }
}
