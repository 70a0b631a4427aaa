use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::oauth::ensure_success;

/// OIDC provider metadata from `/.well-known/openid-configuration`.
///
/// Only the fields this BFF consumes; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub token_endpoint: Url,
    pub userinfo_endpoint: Url,
    #[serde(default)]
    pub authorization_endpoint: Option<Url>,
    #[serde(default)]
    pub jwks_uri: Option<Url>,
}

/// Fetch the provider's discovery document from the issuer base URL.
///
/// # Errors
///
/// [`Error::UpstreamRejected`] on non-2xx, [`Error::UpstreamUnavailable`] on
/// transport failure, [`Error::Decode`] on an undecodable document.
pub async fn fetch_discovery(
    http: &reqwest::Client,
    issuer: &Url,
    timeout: Duration,
) -> Result<DiscoveryDocument, Error> {
    const OPERATION: &str = "discovery";
    let base = issuer.as_str().trim_end_matches('/');
    let response = http
        .get(format!("{base}/.well-known/openid-configuration"))
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::unavailable(OPERATION, e))?;

    let response = ensure_success(response, OPERATION).await?;
    response
        .json::<DiscoveryDocument>()
        .await
        .map_err(|e| Error::decode(OPERATION, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ignores_unknown_fields() {
        let parsed: DiscoveryDocument = serde_json::from_str(
            r#"{
                "issuer": "https://auth.example.com",
                "token_endpoint": "https://auth.example.com/oauth2/token",
                "userinfo_endpoint": "https://auth.example.com/oauth2/userinfo",
                "authorization_endpoint": "https://auth.example.com/oauth2/authorize",
                "scopes_supported": ["openid", "profile"]
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.issuer, "https://auth.example.com");
        assert!(parsed.authorization_endpoint.is_some());
        assert!(parsed.jwks_uri.is_none());
    }

    #[test]
    fn config_adopts_discovered_endpoints() {
        let doc: DiscoveryDocument = serde_json::from_str(
            r#"{
                "issuer": "https://auth.example.com",
                "token_endpoint": "https://auth.example.com/custom/token",
                "userinfo_endpoint": "https://auth.example.com/custom/userinfo"
            }"#,
        )
        .unwrap();
        let config = crate::OAuthConfig::new(
            "c",
            "s",
            &"https://auth.example.com".parse().unwrap(),
        )
        .with_discovery(&doc);
        assert_eq!(
            config.token_url().as_str(),
            "https://auth.example.com/custom/token"
        );
        assert_eq!(
            config.userinfo_url().as_str(),
            "https://auth.example.com/custom/userinfo"
        );
    }
}
