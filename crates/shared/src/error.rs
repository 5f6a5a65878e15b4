use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 422 => ErrorCode::Validation,
            409 => ErrorCode::Conflict,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Internal,
        }
    }
}

/// Error body the backend sends alongside non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    #[serde(default = "default_code")]
    pub code: ErrorCode,
    pub message: String,
}

fn default_code() -> ErrorCode {
    ErrorCode::Internal
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Best-effort parse of an error body. Falls back to the raw text (or the
    /// status code alone) so callers always get something to display.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<ApiError>(body) {
            return parsed;
        }
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            format!("request failed with status {status}")
        } else {
            trimmed.to_string()
        };
        Self::new(ErrorCode::from_status(status), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_error_body() {
        let err = ApiError::from_response_body(
            403,
            r#"{"code":"forbidden","message":"admin only"}"#,
        );
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(err.message, "admin only");
    }

    #[test]
    fn message_only_body_defaults_to_internal_code() {
        let err = ApiError::from_response_body(500, r#"{"message":"boom"}"#);
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn plain_text_body_uses_status_mapping() {
        let err = ApiError::from_response_body(429, "slow down\n");
        assert_eq!(err.code, ErrorCode::RateLimited);
        assert_eq!(err.message, "slow down");
    }

    #[test]
    fn empty_body_mentions_status() {
        let err = ApiError::from_response_body(502, "");
        assert_eq!(err.message, "request failed with status 502");
    }
}
