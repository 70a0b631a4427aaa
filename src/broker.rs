use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::Error;
use crate::oauth::{AuthClient, UserInfo};
use crate::store::TokenStore;
use crate::types::{SessionId, TokenPair};

/// Errors surfaced at the broker boundary.
///
/// Each variant maps to one user-visible outcome: restart login (invalid
/// code, expired session), present no session (not authenticated), or retry
/// later (upstream unavailable).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BrokerError {
    /// Code exchange rejected — the user must restart the login flow.
    #[error("invalid authorization code")]
    InvalidAuthorizationCode,

    /// No session cookie / no stored session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Refresh attempted and failed — the user must restart the login flow.
    #[error("session expired")]
    SessionExpired,

    /// The Authorization Server could not be reached or answered 5xx.
    #[error("authorization server unavailable: {0}")]
    UpstreamUnavailable(#[source] Error),

    /// Definitive upstream rejection unrelated to session expiry.
    #[error("authorization server rejected the request: {0}")]
    Upstream(#[source] Error),

    /// Token store operation failed.
    #[error("token store error: {0}")]
    Store(String),
}

impl BrokerError {
    fn store(err: crate::store::StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<Error> for BrokerError {
    fn from(err: Error) -> Self {
        match &err {
            Error::UpstreamUnavailable { .. } => Self::UpstreamUnavailable(err),
            Error::UpstreamRejected { status, .. } if *status >= 500 => {
                Self::UpstreamUnavailable(err)
            }
            _ => Self::Upstream(err),
        }
    }
}

/// Orchestrates the session lifecycle:
/// code exchange → token storage → session-id issuance, session lookup →
/// transparent refresh-on-expiry, and logout → invalidation.
///
/// Tokens flow between the [`AuthClient`] and the [`TokenStore`] only; they
/// never appear in any value this type returns.
///
/// Refreshes are serialized per session: concurrent requests hitting the same
/// expired session take a per-key async mutex, and whoever loses the race
/// reuses the winner's stored result instead of firing a second refresh
/// against the Authorization Server. Guard entries exist only while a refresh
/// is in flight; the last task out removes them.
pub struct SessionBroker {
    client: AuthClient,
    store: Arc<dyn TokenStore>,
    refresh_guards: Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
}

impl SessionBroker {
    #[must_use]
    pub fn new(client: AuthClient, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            store,
            refresh_guards: Mutex::new(HashMap::new()),
        }
    }

    /// Exchange an authorization code for a new session.
    ///
    /// On success the token pair is stored under a freshly generated
    /// [`SessionId`], which is the only thing returned. On failure no session
    /// is created and no partial state is left in the store.
    ///
    /// # Errors
    ///
    /// [`BrokerError::InvalidAuthorizationCode`] when the Authorization
    /// Server rejects the code (replayed, expired, redirect URI mismatch);
    /// [`BrokerError::UpstreamUnavailable`] on transport failure or 5xx.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<SessionId, BrokerError> {
        let token_response = self
            .client
            .exchange_code(code, redirect_uri)
            .await
            .map_err(|err| {
                if err.is_client_rejection() {
                    tracing::warn!(error = %err, "authorization code rejected");
                    BrokerError::InvalidAuthorizationCode
                } else {
                    BrokerError::from(err)
                }
            })?;

        let session_id = SessionId::generate();
        self.store
            .put(&session_id, TokenPair::from_response(token_response))
            .await
            .map_err(BrokerError::store)?;

        tracing::info!(session_id = %session_id, "authorization code exchanged, session created");
        Ok(session_id)
    }

    /// Resolve a session to the user it belongs to.
    ///
    /// Performs at most one transparent refresh: proactively when the stored
    /// access token is past its remembered expiry, or reactively when the
    /// userinfo endpoint rejects it. If the token is still rejected after
    /// that single refresh, the session is deleted and
    /// [`BrokerError::SessionExpired`] is returned, forcing a fresh login
    /// rather than a refresh loop.
    ///
    /// # Errors
    ///
    /// [`BrokerError::NotAuthenticated`] when the session does not exist;
    /// [`BrokerError::SessionExpired`] when refresh was attempted and failed.
    pub async fn resolve_session(&self, session_id: &SessionId) -> Result<UserInfo, BrokerError> {
        let mut pair = self
            .store
            .get(session_id)
            .await
            .map_err(BrokerError::store)?
            .ok_or(BrokerError::NotAuthenticated)?;

        let mut refreshed = false;
        if pair.is_expired(OffsetDateTime::now_utc()) {
            pair = self.refresh(session_id, &pair).await?;
            refreshed = true;
        }

        match self.client.fetch_user_info(&pair.access_token).await {
            Ok(user) => Ok(user),
            Err(err) if err.is_auth_rejection() && !refreshed => {
                tracing::debug!(session_id = %session_id, "access token rejected, refreshing");
                let pair = self.refresh(session_id, &pair).await?;
                match self.client.fetch_user_info(&pair.access_token).await {
                    Ok(user) => Ok(user),
                    Err(err) if err.is_auth_rejection() => {
                        self.remove_session(session_id).await;
                        Err(BrokerError::SessionExpired)
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) if err.is_auth_rejection() => {
                // A token refreshed moments ago is still rejected: nothing
                // more to try within this request.
                self.remove_session(session_id).await;
                Err(BrokerError::SessionExpired)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Force a refresh of the session's token pair.
    ///
    /// # Errors
    ///
    /// [`BrokerError::NotAuthenticated`] when the session does not exist;
    /// [`BrokerError::SessionExpired`] when the refresh token is rejected
    /// (the session is deleted).
    pub async fn refresh_session(&self, session_id: &SessionId) -> Result<(), BrokerError> {
        let pair = self
            .store
            .get(session_id)
            .await
            .map_err(BrokerError::store)?
            .ok_or(BrokerError::NotAuthenticated)?;
        self.refresh(session_id, &pair).await.map(|_| ())
    }

    /// Invalidate a session.
    ///
    /// Idempotent and infallible from the caller's point of view: removing an
    /// unknown session succeeds, and internal store failures are logged and
    /// swallowed so logout never fails visibly (and never leaks whether the
    /// session existed).
    pub async fn logout(&self, session_id: &SessionId) {
        self.remove_session(session_id).await;
        tracing::info!(session_id = %session_id, "session logged out");
    }

    /// Refresh the session's pair, serialized per session key.
    ///
    /// `observed` is the pair the caller read before deciding to refresh.
    /// After acquiring the per-session guard the store is re-read: if another
    /// task already rotated the tokens while we waited, its result is reused
    /// and no outbound call is made.
    async fn refresh(
        &self,
        session_id: &SessionId,
        observed: &TokenPair,
    ) -> Result<TokenPair, BrokerError> {
        let guard = self.refresh_guard(session_id);
        let result = {
            let _in_flight = guard.lock().await;
            self.refresh_locked(session_id, observed).await
        };
        self.release_refresh_guard(session_id, guard);
        result
    }

    async fn refresh_locked(
        &self,
        session_id: &SessionId,
        observed: &TokenPair,
    ) -> Result<TokenPair, BrokerError> {
        let current = self
            .store
            .get(session_id)
            .await
            .map_err(BrokerError::store)?
            .ok_or(BrokerError::SessionExpired)?;
        if current.access_token != observed.access_token {
            return Ok(current);
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            self.remove_session(session_id).await;
            return Err(BrokerError::SessionExpired);
        };

        match self.client.refresh_token(&refresh_token).await {
            Ok(response) => {
                let next = current.merge_refreshed(response);
                // Committed even if the original caller has gone away: the
                // new tokens are live and must stay revocable via logout.
                self.store
                    .put(session_id, next.clone())
                    .await
                    .map_err(BrokerError::store)?;
                tracing::debug!(session_id = %session_id, "access token refreshed");
                Ok(next)
            }
            Err(err) if err.is_client_rejection() => {
                tracing::warn!(session_id = %session_id, error = %err, "refresh token rejected, session invalidated");
                self.remove_session(session_id).await;
                Err(BrokerError::SessionExpired)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn refresh_guard(&self, session_id: &SessionId) -> Arc<AsyncMutex<()>> {
        let mut guards = self
            .refresh_guards
            .lock()
            .expect("refresh guard map lock poisoned");
        guards.entry(session_id.clone()).or_default().clone()
    }

    /// Drop the guard entry once the last refresh holding it finishes.
    ///
    /// Our own clone is dropped under the map lock, so a remaining strong
    /// count of 1 means only the map itself still holds the mutex: no task is
    /// waiting on it and the entry can go. This keeps the map bounded by the
    /// number of refreshes in flight, not by the number of sessions ever
    /// refreshed.
    fn release_refresh_guard(&self, session_id: &SessionId, guard: Arc<AsyncMutex<()>>) {
        let mut guards = self
            .refresh_guards
            .lock()
            .expect("refresh guard map lock poisoned");
        drop(guard);
        if let Some(entry) = guards.get(session_id) {
            if Arc::strong_count(entry) == 1 {
                guards.remove(session_id);
            }
        }
    }

    async fn remove_session(&self, session_id: &SessionId) {
        if let Err(err) = self.store.remove(session_id).await {
            tracing::warn!(session_id = %session_id, error = %err, "session removal failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::oauth::{OAuthConfig, TokenResponse};
    use crate::store::MemoryTokenStore;

    fn guard_count(broker: &SessionBroker) -> usize {
        broker.refresh_guards.lock().unwrap().len()
    }

    /// A pair whose remembered expiry has already passed.
    fn expired_pair(refresh_token: Option<&str>) -> TokenPair {
        TokenPair::from_response(TokenResponse {
            access_token: "AT1.local".into(),
            token_type: "Bearer".into(),
            expires_in: Some(0),
            refresh_token: refresh_token.map(Into::into),
        })
    }

    /// Minimal token endpoint that always grants a fresh access token.
    async fn spawn_token_endpoint() -> url::Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route(
            "/oauth2/token",
            axum::routing::post(|| async {
                axum::Json(serde_json::json!({
                    "access_token": "AT2.local",
                    "token_type": "Bearer",
                    "expires_in": 3600,
                }))
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}").parse().unwrap()
    }

    #[tokio::test]
    async fn guard_entry_released_after_successful_refresh() {
        let base = spawn_token_endpoint().await;
        let store = Arc::new(MemoryTokenStore::new());
        let broker = SessionBroker::new(
            AuthClient::new(OAuthConfig::new("c", "s", &base)),
            store.clone(),
        );
        let session_id = SessionId::generate();
        store.put(&session_id, expired_pair(Some("RT1.local"))).await.unwrap();

        broker.refresh_session(&session_id).await.unwrap();

        let pair = store.get(&session_id).await.unwrap().unwrap();
        assert_eq!(pair.access_token, "AT2.local");
        assert_eq!(guard_count(&broker), 0, "guard map must not retain ended refreshes");
    }

    #[tokio::test]
    async fn guard_entry_released_when_refresh_cannot_proceed() {
        // No refresh token stored: the refresh bails out before any outbound
        // call, so the endpoint address is never contacted.
        let store = Arc::new(MemoryTokenStore::new());
        let broker = SessionBroker::new(
            AuthClient::new(OAuthConfig::new("c", "s", &"http://127.0.0.1:9".parse().unwrap())),
            store.clone(),
        );
        let session_id = SessionId::generate();
        store.put(&session_id, expired_pair(None)).await.unwrap();

        let err = broker.resolve_session(&session_id).await.unwrap_err();
        assert!(matches!(err, BrokerError::SessionExpired));
        assert_eq!(guard_count(&broker), 0, "guard map must not retain ended refreshes");
    }

    fn reqwest_error() -> reqwest::Error {
        // Building a request against a malformed URL fails synchronously.
        reqwest::Client::new()
            .get("http://[invalid")
            .build()
            .unwrap_err()
    }

    #[test]
    fn upstream_5xx_maps_to_unavailable() {
        let err = BrokerError::from(Error::UpstreamRejected {
            operation: "token refresh",
            status: 503,
            detail: String::new(),
        });
        assert!(matches!(err, BrokerError::UpstreamUnavailable(_)));
    }

    #[test]
    fn upstream_4xx_maps_to_definitive_rejection() {
        let err = BrokerError::from(Error::UpstreamRejected {
            operation: "userinfo request",
            status: 400,
            detail: String::new(),
        });
        assert!(matches!(err, BrokerError::Upstream(_)));
    }

    #[test]
    fn transport_failure_maps_to_unavailable() {
        let err = BrokerError::from(Error::UpstreamUnavailable {
            operation: "token exchange",
            source: reqwest_error(),
        });
        assert!(matches!(err, BrokerError::UpstreamUnavailable(_)));
    }
}
