use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use super::config::BffAuthConfig;
use super::cookies;
use super::error::AuthError;
use super::state::GatewayState;
use super::types::ApiResponse;
use crate::broker::SessionBroker;
use crate::store::TokenStore;
use crate::types::SessionId;

/// Create the BFF authentication router.
///
/// Routes (under the configured prefix, default `/auth`):
/// - `POST {p}/exchange` — authorization code → session cookie
/// - `GET {p}/me` — session cookie → user identity
/// - `POST {p}/refresh` — force a token refresh
/// - `POST {p}/logout` — clear cookie + server-side session, always 200
pub fn auth_routes(config: BffAuthConfig, store: Arc<dyn TokenStore>) -> Router {
    let auth_path = config.settings.auth_path.clone();

    let state = GatewayState {
        broker: Arc::new(SessionBroker::new(config.client, store)),
        settings: config.settings,
    };

    Router::new()
        .route(&format!("{auth_path}/exchange"), post(exchange))
        .route(&format!("{auth_path}/me"), get(me))
        .route(&format!("{auth_path}/refresh"), post(refresh))
        .route(&format!("{auth_path}/logout"), post(logout))
        .with_state(state)
}

// ── Exchange ───────────────────────────────────────────────────────

/// Body of `POST /auth/exchange`. A `state` field from the SPA is accepted
/// and ignored: the SPA validates its own CSRF state before calling us.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest {
    code: String,
    redirect_uri: String,
}

async fn exchange(
    State(state): State<GatewayState>,
    jar: CookieJar,
    Json(request): Json<ExchangeRequest>,
) -> Result<(CookieJar, Json<ApiResponse>), AuthError> {
    let session_id = state
        .broker
        .exchange_code(&request.code, &request.redirect_uri)
        .await?;

    // Resolve through the broker so the response carries identity fields
    // only; tokens stay between the broker and the store.
    let user = match state.broker.resolve_session(&session_id).await {
        Ok(user) => user,
        Err(err) => {
            // The browser never received this session id, so nobody could
            // ever revoke it via logout. Discard it instead of leaving live
            // tokens stranded in the store until the TTL.
            state.broker.logout(&session_id).await;
            return Err(err.into());
        }
    };

    let cookie = cookies::session_cookie(
        &state.settings.cookie_name,
        session_id.as_str(),
        state.settings.session_ttl,
        state.settings.secure_cookies,
    );

    tracing::info!(sub = %user.sub, "login complete, session cookie set");

    Ok((
        jar.add(cookie),
        Json(ApiResponse::ok(
            "Authentication successful",
            json!({ "user": user }),
        )),
    ))
}

// ── Me ─────────────────────────────────────────────────────────────

async fn me(
    State(state): State<GatewayState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse>, AuthError> {
    let session_id = session_from_jar(&jar, &state.settings.cookie_name)
        .ok_or(AuthError::NotAuthenticated)?;

    let user = state.broker.resolve_session(&session_id).await?;
    Ok(Json(ApiResponse::data(json!(user))))
}

// ── Refresh ────────────────────────────────────────────────────────

async fn refresh(
    State(state): State<GatewayState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse>, AuthError> {
    let session_id = session_from_jar(&jar, &state.settings.cookie_name)
        .ok_or(AuthError::NotAuthenticated)?;

    state.broker.refresh_session(&session_id).await?;
    Ok(Json(ApiResponse::message("Token refreshed")))
}

// ── Logout ─────────────────────────────────────────────────────────

/// Always 200: logout must never fail visibly and must not leak whether the
/// session existed.
async fn logout(
    State(state): State<GatewayState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse>) {
    if let Some(session_id) = session_from_jar(&jar, &state.settings.cookie_name) {
        state.broker.logout(&session_id).await;
    }

    let jar = jar.remove(cookies::clear_session_cookie(&state.settings.cookie_name));
    (jar, Json(ApiResponse::message("Logged out successfully")))
}

// ── Helpers ────────────────────────────────────────────────────────

fn session_from_jar(jar: &CookieJar, cookie_name: &str) -> Option<SessionId> {
    jar.get(cookie_name)
        .map(|cookie| SessionId::from(cookie.value().to_string()))
}
