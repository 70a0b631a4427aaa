use std::time::Duration as StdDuration;

use time::Duration;
use url::Url;

use super::error::AuthError;
use crate::oauth::{AuthClient, OAuthConfig};

/// Shared gateway settings used by config and runtime state.
#[derive(Clone)]
pub(super) struct GatewaySettings {
    pub(super) cookie_name: String,
    pub(super) session_ttl: Duration,
    pub(super) secure_cookies: bool,
    pub(super) auth_path: String,
}

impl GatewaySettings {
    fn defaults() -> Self {
        Self {
            cookie_name: "SESSION_ID".into(),
            session_ttl: Duration::hours(8),
            secure_cookies: true,
            auth_path: "/auth".into(),
        }
    }
}

/// Gateway configuration.
///
/// The required field (`client`) is a constructor parameter; everything else
/// has defaults overridable with `with_*` methods. Use
/// [`from_env()`](BffAuthConfig::from_env) for convention-based setup.
pub struct BffAuthConfig {
    pub(super) client: AuthClient,
    pub(super) settings: GatewaySettings,
}

impl BffAuthConfig {
    /// Create config with the required [`AuthClient`].
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            settings: GatewaySettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `BFF_ISSUER_URL`: Authorization Server base URL
    /// - `BFF_CLIENT_ID`: OAuth2 client ID
    /// - `BFF_CLIENT_SECRET`: OAuth2 client secret (confidential client)
    ///
    /// # Optional env vars
    /// - `BFF_TOKEN_URL` / `BFF_USERINFO_URL`: endpoint overrides
    /// - `BFF_COOKIE_NAME`: session cookie name (default `SESSION_ID`)
    /// - `BFF_SESSION_TTL_SECS`: cookie Max-Age (default 28800 = 8h)
    /// - `BFF_HTTP_TIMEOUT_SECS`: outbound call timeout (default 10)
    /// - `DEV_AUTH`: set to `"1"` or `"true"` to disable the Secure cookie
    ///   flag for local HTTP development
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when required vars are missing or values
    /// fail to parse.
    pub fn from_env() -> Result<Self, AuthError> {
        let issuer: Url = required_env("BFF_ISSUER_URL")?
            .parse()
            .map_err(|e| AuthError::Config(format!("BFF_ISSUER_URL: {e}")))?;
        let client_id = required_env("BFF_CLIENT_ID")?;
        let client_secret = required_env("BFF_CLIENT_SECRET")?;

        let mut oauth = OAuthConfig::new(client_id, client_secret, &issuer);

        if let Ok(url_str) = std::env::var("BFF_TOKEN_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("BFF_TOKEN_URL: {e}")))?;
            oauth = oauth.with_token_url(url);
        }
        if let Ok(url_str) = std::env::var("BFF_USERINFO_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("BFF_USERINFO_URL: {e}")))?;
            oauth = oauth.with_userinfo_url(url);
        }
        if let Ok(secs) = std::env::var("BFF_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| AuthError::Config(format!("BFF_HTTP_TIMEOUT_SECS: {e}")))?;
            oauth = oauth.with_timeout(StdDuration::from_secs(secs));
        }

        let dev_auth = matches!(std::env::var("DEV_AUTH").as_deref(), Ok("1") | Ok("true"));

        let mut config = Self::new(AuthClient::new(oauth)).with_secure_cookies(!dev_auth);

        if let Ok(name) = std::env::var("BFF_COOKIE_NAME") {
            config = config.with_cookie_name(name);
        }
        if let Ok(secs) = std::env::var("BFF_SESSION_TTL_SECS") {
            let secs: i64 = secs
                .parse()
                .map_err(|e| AuthError::Config(format!("BFF_SESSION_TTL_SECS: {e}")))?;
            config = config.with_session_ttl(Duration::seconds(secs));
        }

        Ok(config)
    }

    /// Override the session cookie name (default `SESSION_ID`).
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.cookie_name = name.into();
        self
    }

    /// Override the session cookie lifetime (default 8 hours).
    ///
    /// This is the cookie Max-Age, independent of access-token expiry. Keep
    /// it in sync with the token store's own session TTL.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.settings.session_ttl = ttl;
        self
    }

    /// Toggle the Secure cookie flag. Disable only for local HTTP dev.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Override the route prefix (default `/auth`).
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }
}

fn required_env(name: &'static str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::Config(format!("{name} is required")))
}
