//! Error taxonomy for list fetches and form submissions.

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Status,
    Malformed,
    Stale,
}

/// Every variant is recoverable: the session keeps its last good page and
/// surfaces the error next to it.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server returned status {status}: {detail}")]
    Status { status: u16, detail: ApiError },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response to request {seq} superseded by request {latest}")]
    Stale { seq: u64, latest: u64 },
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::Transport(_) => ErrorCategory::Transport,
            FetchError::Status { .. } => ErrorCategory::Status,
            FetchError::Malformed(_) => ErrorCategory::Malformed,
            FetchError::Stale { .. } => ErrorCategory::Stale,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            FetchError::Status { detail, .. }
                if matches!(detail.code, ErrorCode::Unauthorized | ErrorCode::Forbidden)
        )
    }

    /// Short banner text for the view.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Transport(_) => {
                "Server unreachable; check URL/network and retry.".to_string()
            }
            FetchError::Status { .. } if self.requires_reauth() => {
                "Session expired or access denied; sign in again.".to_string()
            }
            FetchError::Status { status, detail } => {
                format!("Request failed ({status}): {}", detail.message)
            }
            FetchError::Malformed(_) => {
                "Unexpected response from server; showing last loaded data.".to_string()
            }
            FetchError::Stale { .. } => "Outdated response ignored.".to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            let status = status.as_u16();
            FetchError::Status {
                status,
                detail: ApiError::new(ErrorCode::from_status(status), err.to_string()),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FormError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl FormError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        FormError::Validation {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("list session is closed")]
pub struct SessionClosed;
