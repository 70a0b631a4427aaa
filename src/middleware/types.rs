use serde::Serialize;

/// Response envelope used by every gateway route.
///
/// Mirrors what the SPA expects: `{success, message?, data?}`. `data` only
/// ever carries non-secret identity fields; token material cannot end up
/// here because [`TokenPair`](crate::TokenPair) is not serializable.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    #[must_use]
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_omitted() {
        let json = serde_json::to_string(&ApiResponse::message("ok")).unwrap();
        assert_eq!(json, r#"{"success":true,"message":"ok"}"#);
    }

    #[test]
    fn failure_envelope() {
        let json = serde_json::to_string(&ApiResponse::failure("nope")).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"nope"}"#);
    }
}
