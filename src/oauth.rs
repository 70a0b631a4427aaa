use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Default outbound timeout for Authorization Server calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authorization Server client configuration.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors. The token and userinfo endpoints are derived from the issuer base
/// URL and can be overridden individually.
///
/// ```rust,ignore
/// use profolio_bff::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "auth-code-client",
///     "secret123",
///     &"https://auth.example.com".parse()?,
/// );
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) token_url: Url,
    pub(crate) userinfo_url: Url,
    pub(crate) timeout: Duration,
}

impl OAuthConfig {
    /// Create a new configuration for a confidential client.
    ///
    /// Endpoints default to `{issuer}/oauth2/token` and
    /// `{issuer}/oauth2/userinfo`.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        issuer: &Url,
    ) -> Self {
        let base = issuer.as_str().trim_end_matches('/');
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: format!("{base}/oauth2/token")
                .parse()
                .expect("issuer base URL with token path is a valid URL"),
            userinfo_url: format!("{base}/oauth2/userinfo")
                .parse()
                .expect("issuer base URL with userinfo path is a valid URL"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the userinfo endpoint.
    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    /// Override the outbound call timeout (default 10s).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Take both endpoints from a fetched discovery document.
    #[must_use]
    pub fn with_discovery(mut self, doc: &crate::discovery::DiscoveryDocument) -> Self {
        self.token_url = doc.token_endpoint.clone();
        self.userinfo_url = doc.userinfo_endpoint.clone();
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn userinfo_url(&self) -> &Url {
        &self.userinfo_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Token response from the Authorization Server's token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Non-secret user identity from the userinfo endpoint.
///
/// This is the only authentication payload the BFF ever returns to the
/// browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserInfo {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl UserInfo {
    /// Create a `UserInfo` with only the required `sub` field.
    #[must_use]
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: None,
            name: None,
            roles: Vec::new(),
            email_verified: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }
}

/// Token Exchange Client: wraps the two OAuth2 grants plus the userinfo call.
///
/// All methods classify failures per [`Error`]; none of them retry. The
/// authorization code exchange in particular must never be retried — codes
/// are single-use.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    /// Create a new client for the configured Authorization Server.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// `grant_type=authorization_code` with client credentials, form-encoded.
    /// The `redirect_uri` must match the one used for the authorization
    /// request or the server will reject the exchange.
    ///
    /// # Errors
    ///
    /// [`Error::UpstreamRejected`] on non-2xx (invalid/replayed code,
    /// redirect URI mismatch), [`Error::UpstreamUnavailable`] on
    /// timeout/connect failure.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, Error> {
        const OPERATION: &str = "token exchange";
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .timeout(self.config.timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::unavailable(OPERATION, e))?;

        let response = ensure_success(response, OPERATION).await?;
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::decode(OPERATION, e))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The server may or may not rotate the refresh token; callers must keep
    /// the prior one when the response omits it (see
    /// [`TokenPair::merge_refreshed`](crate::TokenPair::merge_refreshed)).
    ///
    /// # Errors
    ///
    /// [`Error::UpstreamRejected`] when the refresh token itself is
    /// rejected/expired, [`Error::UpstreamUnavailable`] on transport failure.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        const OPERATION: &str = "token refresh";
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .timeout(self.config.timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::unavailable(OPERATION, e))?;

        let response = ensure_success(response, OPERATION).await?;
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::decode(OPERATION, e))
    }

    /// Fetch user identity for an access token from the userinfo endpoint.
    ///
    /// This is the canonical "who is this session" call; the BFF never
    /// decodes tokens locally.
    ///
    /// # Errors
    ///
    /// [`Error::UpstreamRejected`] with status 401/403 signals an
    /// expired/revoked access token (the caller may refresh and retry once).
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        const OPERATION: &str = "userinfo request";
        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .timeout(self.config.timeout)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::unavailable(OPERATION, e))?;

        let response = ensure_success(response, OPERATION).await?;
        response
            .json::<UserInfo>()
            .await
            .map_err(|e| Error::decode(OPERATION, e))
    }
}

/// Checks HTTP response status; returns the response on success or a
/// classified error carrying the upstream status verbatim.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(Error::UpstreamRejected {
        operation,
        status: status.as_u16(),
        detail,
    })
}
