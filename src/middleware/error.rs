use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::types::ApiResponse;
use crate::broker::BrokerError;

/// Authentication errors at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Code exchange rejected by the Authorization Server.
    #[error("Invalid authorization code")]
    InvalidCode,

    /// No session cookie or no stored session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Refresh attempted and failed; a new login is required.
    #[error("Session expired")]
    SessionExpired,

    /// Authorization Server unreachable or answering 5xx.
    #[error("Authorization server unavailable")]
    UpstreamUnavailable { timed_out: bool },

    /// Definitive upstream rejection unrelated to expiry.
    #[error("Authorization server error: {0}")]
    Upstream(String),

    /// Token store operation failed.
    #[error("Session store error: {0}")]
    Store(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<BrokerError> for AuthError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::InvalidAuthorizationCode => Self::InvalidCode,
            BrokerError::NotAuthenticated => Self::NotAuthenticated,
            BrokerError::SessionExpired => Self::SessionExpired,
            BrokerError::UpstreamUnavailable(inner) => Self::UpstreamUnavailable {
                timed_out: inner.is_timeout(),
            },
            BrokerError::Upstream(inner) => Self::Upstream(inner.to_string()),
            BrokerError::Store(msg) => Self::Store(msg),
        }
    }
}

impl IntoResponse for AuthError {
    /// Status mapping per the propagation policy: 400 for an invalid code,
    /// 401 for missing/expired sessions, 502/504 for upstream trouble, 500
    /// for internal failures. Upstream error bodies are logged, never
    /// forwarded to the browser.
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidCode => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::NotAuthenticated | Self::SessionExpired => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            Self::UpstreamUnavailable { timed_out } => {
                let status = if *timed_out {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, "Authorization server unavailable".to_string())
            }
            Self::Upstream(_) => {
                tracing::error!(error = %self, "upstream rejection");
                (StatusCode::BAD_GATEWAY, "Authentication failed".to_string())
            }
            Self::Store(_) | Self::Config(_) => {
                tracing::error!(error = %self, "auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::InvalidCode.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::NotAuthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::SessionExpired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::UpstreamUnavailable { timed_out: false }
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AuthError::UpstreamUnavailable { timed_out: true }
                .into_response()
                .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AuthError::Store("db down".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_forwarded() {
        let response = AuthError::Upstream("secret upstream detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        // Body is the generic envelope; the upstream detail stays in the log.
    }
}
