use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use derive_more::{Display, From, Into};
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::oauth::TokenResponse;

/// Opaque session identifier — the only artifact ever placed in the browser.
///
/// Carries no decodable information; it is a random key into the server-side
/// [`TokenStore`](crate::store::TokenStore).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh unguessable session identifier.
    ///
    /// 32 bytes from the thread-local CSPRNG, base64url-encoded (43 chars).
    #[must_use]
    pub fn generate() -> Self {
        let random_bytes: [u8; 32] = rand::rng().random();
        Self(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Access/refresh token pair held server-side for one session.
///
/// Deliberately does NOT implement `Serialize`: token material must never be
/// written into a response body, and the missing impl makes that a compile
/// error rather than a review item.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    /// Absent when the issuer did not grant offline access.
    pub refresh_token: Option<String>,
    /// Absolute access-token expiry. `None` when the token response carried
    /// no `expires_in`; expiry is then detected reactively via userinfo 401.
    pub access_expiry: Option<OffsetDateTime>,
    pub issued_at: OffsetDateTime,
}

impl TokenPair {
    /// Build a pair from a token endpoint response, stamping `issued_at` now.
    ///
    /// An `expires_in` too large for the calendar to represent is treated as
    /// absent; expiry then falls back to reactive detection via userinfo 401.
    #[must_use]
    pub fn from_response(response: TokenResponse) -> Self {
        let issued_at = OffsetDateTime::now_utc();
        Self {
            access_expiry: response.expires_in.and_then(|secs| {
                issued_at.checked_add(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
            }),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            issued_at,
        }
    }

    /// Whether the access token's remembered expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.access_expiry.is_some_and(|expiry| now >= expiry)
    }

    /// Replace this pair with a refreshed one.
    ///
    /// Refresh-token rotation is optional per issuer: when the refresh
    /// response omits a new refresh token, the prior one stays valid and is
    /// carried over.
    #[must_use]
    pub fn merge_refreshed(&self, response: TokenResponse) -> Self {
        let mut next = Self::from_response(response);
        if next.refresh_token.is_none() {
            next.refresh_token = self.refresh_token.clone();
        }
        next
    }
}
