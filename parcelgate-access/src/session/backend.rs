//! Backend collaborator
//!
//! Only three outcomes matter to the session lifecycle: success, a definitive
//! "unauthorized", and everything else.

use super::{AuthGrant, Credentials};
use async_trait::async_trait;
use parcelgate_core::ApiConfig;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Credentials or token rejected
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized)
    }
}

/// Authentication endpoints of the desk REST service
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthGrant, BackendError>;

    /// Check that `token` is still honored
    async fn revalidate(&self, token: &str) -> Result<(), BackendError>;

    async fn logout(&self, token: &str) -> Result<(), BackendError>;
}

/// Map a non-success HTTP status onto the backend taxonomy
pub fn classify_status(status: StatusCode, body: &str) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        _ => BackendError::Server {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body.to_string()
            },
        },
    }
}

/// [`AuthBackend`] over HTTP with bearer tokens
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

fn transport(error: reqwest::Error) -> BackendError {
    BackendError::Network(error.to_string())
}

/// Decode a successful login body. A malformed body is the server's fault,
/// not the network's.
pub fn parse_grant(status: StatusCode, body: &str) -> Result<AuthGrant, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::Server {
        status: status.as_u16(),
        message: format!("Invalid login response: {}", e),
    })
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthGrant, BackendError> {
        let response = self
            .client
            .post(self.endpoint("auth/login"))
            .json(credentials)
            .send()
            .await
            .map_err(transport)?;

        let response = Self::check(response).await?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        let grant = parse_grant(status, &body)?;

        debug!(user_id = %grant.user.id, "Authenticated");
        Ok(grant)
    }

    #[instrument(skip_all)]
    async fn revalidate(&self, token: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.endpoint("auth/validate"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        Self::check(response).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.endpoint("auth/logout"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        Self::check(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(classify_status(StatusCode::FORBIDDEN, "nope").is_unauthorized());

        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            BackendError::Server {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "db down"),
            BackendError::Server {
                status: 500,
                message: "db down".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_login_body_is_a_server_error() {
        match parse_grant(StatusCode::OK, "<html>maintenance</html>") {
            Err(BackendError::Server { status, message }) => {
                assert_eq!(status, 200);
                assert!(message.starts_with("Invalid login response"));
            }
            other => panic!("expected a server error, got {other:?}"),
        }

        let grant = parse_grant(
            StatusCode::OK,
            r#"{"token":"t","user":{"id":"9","name":"Kim","role":"A"}}"#,
        )
        .unwrap();
        assert_eq!(grant.token, "t");
        assert_eq!(grant.user.role, Some(Role::Admin));
    }

    #[test]
    fn test_endpoints_ignore_trailing_slash() {
        let backend = HttpAuthBackend::new(&ApiConfig {
            base_url: "https://desk.example.com/api/".to_string(),
            request_timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            backend.endpoint("auth/validate"),
            "https://desk.example.com/api/auth/validate"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_network_error() {
        let backend = HttpAuthBackend::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
        })
        .unwrap();

        let result = backend.revalidate("tok").await;
        assert!(matches!(result, Err(BackendError::Network(_))));
    }
}
