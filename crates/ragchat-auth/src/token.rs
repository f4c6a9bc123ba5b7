//! Socket-credential acquisition.
//!
//! Deployments that protect the chat socket require a bearer token on
//! the connection URL. Fetching it is an async step that runs before the
//! transport connect; the connection manager is generic over
//! [`TokenProvider`] so the plain and credentialed variants share one
//! implementation.

use std::time::Duration;

use futures::future::BoxFuture;

use crate::client::AuthClient;
use crate::error::{AuthError, Result};

/// Pause between credential attempts.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Source of bearer credentials for the chat socket.
pub trait TokenProvider: Send + Sync {
    /// Produce a credential, retrying internally as configured.
    fn fetch_token(&self) -> BoxFuture<'_, Result<String>>;
}

/// [`TokenProvider`] backed by the `/api/token` endpoint, with a bounded
/// attempt budget.
pub struct ApiTokenProvider {
    client: AuthClient,
    max_attempts: u32,
}

impl ApiTokenProvider {
    /// Create a provider over an authenticated client. The attempt
    /// budget comes from the client's [`crate::AuthConfig`].
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        let max_attempts = client.config().token_attempts.max(1);
        Self {
            client,
            max_attempts,
        }
    }

    async fn fetch_with_retries(&self) -> Result<String> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.client.issue_token().await {
                Ok(token) => return Ok(token.access_token),
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "socket credential fetch failed"
                    );
                    let retriable = err.is_retriable();
                    last_error = err.to_string();
                    if !retriable {
                        return Err(err);
                    }
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        Err(AuthError::TokenAttemptsExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

impl TokenProvider for ApiTokenProvider {
    fn fetch_token(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.fetch_with_retries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, attempts: u32) -> ApiTokenProvider {
        let mut config = AuthConfig::new(server.uri());
        config.token_attempts = attempts;
        ApiTokenProvider::new(AuthClient::new(config))
    }

    #[tokio::test]
    async fn returns_token_on_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-abc",
                "token_type": "bearer",
            })))
            .mount(&server)
            .await;

        let token = provider_for(&server, 3).fetch_token().await.unwrap();
        assert_eq!(token, "tok-abc");
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-late",
                "token_type": "bearer",
            })))
            .mount(&server)
            .await;

        let token = provider_for(&server, 3).fetch_token().await.unwrap();
        assert_eq!(token, "tok-late");
    }

    #[tokio::test]
    async fn exhausts_attempt_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = provider_for(&server, 3).fetch_token().await.unwrap_err();
        match err {
            AuthError::TokenAttemptsExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected TokenAttemptsExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_session_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider_for(&server, 3).fetch_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }
}
