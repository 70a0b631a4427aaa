/// Errors from outbound calls to the Authorization Server.
///
/// The split between [`UpstreamRejected`](Error::UpstreamRejected) and
/// [`UpstreamUnavailable`](Error::UpstreamUnavailable) matters: a rejection is
/// a definitive answer from the server and is never retried, while an
/// unavailable upstream is transient and safe to retry later.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The Authorization Server answered with a non-2xx status.
    #[error("{operation} rejected by authorization server (status {status}): {detail}")]
    UpstreamRejected {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The Authorization Server could not be reached (timeout, connect failure).
    #[error("{operation} failed: authorization server unreachable: {source}")]
    UpstreamUnavailable {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The Authorization Server answered 2xx with a body we could not decode.
    #[error("{operation} returned an undecodable body: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    pub(crate) fn unavailable(operation: &'static str, source: reqwest::Error) -> Self {
        Self::UpstreamUnavailable { operation, source }
    }

    pub(crate) fn decode(operation: &'static str, source: reqwest::Error) -> Self {
        Self::Decode { operation, source }
    }

    /// HTTP status returned by the Authorization Server, if it answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the failure was an outbound timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { source, .. } if source.is_timeout())
    }

    /// Definitive 4xx answer — caused by what we sent, never retried.
    #[must_use]
    pub fn is_client_rejection(&self) -> bool {
        matches!(self, Self::UpstreamRejected { status, .. } if (400..500).contains(status))
    }

    /// Rejection of the presented credential itself (expired/revoked access token).
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::UpstreamRejected { status: 401 | 403, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_4xx_is_client_rejection() {
        let err = Error::UpstreamRejected {
            operation: "token exchange",
            status: 400,
            detail: "invalid_grant".into(),
        };
        assert!(err.is_client_rejection());
        assert!(!err.is_auth_rejection());
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn rejected_401_is_auth_rejection() {
        let err = Error::UpstreamRejected {
            operation: "userinfo request",
            status: 401,
            detail: String::new(),
        };
        assert!(err.is_auth_rejection());
        assert!(err.is_client_rejection());
    }

    #[test]
    fn rejected_5xx_is_not_client_rejection() {
        let err = Error::UpstreamRejected {
            operation: "token refresh",
            status: 503,
            detail: String::new(),
        };
        assert!(!err.is_client_rejection());
        assert!(!err.is_auth_rejection());
    }
}
