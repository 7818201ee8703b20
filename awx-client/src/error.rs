//! Error types for the API client engine.

use awx_core::provider::{ErrorKind, ProviderError};
use thiserror::Error;

/// Maximum number of response body bytes kept in an error
pub const MAX_ERROR_BODY: usize = 1024;

/// Result type alias using `ApiError`.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised while talking to the controller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing base URL, bad auth assembly, unknown platform.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// URL composition or body marshalling failed.
    #[error("Unable to build request for {path}: {message}")]
    RequestBuild { path: String, message: String },

    /// Connection refused, timeout, DNS, TLS.
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response arrived but its body could not be read.
    #[error("Unable to read response body of {method} {url}: {source}")]
    BodyRead {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response status was not in the accepted set.
    #[error("{method} {url} returned status {status}, expected {}: {body}", format_codes(expected))]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
        expected: Vec<u16>,
        body: String,
    },

    /// Body was not JSON or not the expected envelope shape.
    #[error("Unable to decode response of {url}: {message}")]
    Decode { url: String, message: String },

    /// Name-based lookup returned more than one row.
    #[error("Wrong cardinality returned for lookup {url}: expected 1 object, got {count} (ids: {})", format_ids(ids))]
    Cardinality {
        url: String,
        count: u64,
        ids: Vec<i64>,
    },

    /// A polymorphic wire field decoded to an unexpected variant.
    #[error("Field '{field}' has unexpected type: expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Cancelled while waiting or in flight.
    #[error("{method} {url} cancelled")]
    Cancelled { method: String, url: String },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Configuration(_) => ErrorKind::Configuration,
            ApiError::RequestBuild { .. } => ErrorKind::RequestBuild,
            ApiError::Transport { .. } => ErrorKind::Transport,
            ApiError::BodyRead { .. } => ErrorKind::BodyRead,
            ApiError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            ApiError::Decode { .. } => ErrorKind::Decode,
            ApiError::Cardinality { .. } => ErrorKind::Cardinality,
            ApiError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ApiError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether a failed GET may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Transport { .. } | ApiError::BodyRead { .. } | ApiError::UnexpectedStatus { .. }
        )
    }

    /// Status code of an unexpected response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ApiError::Configuration(message.into())
    }

    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Decode {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        let attribute = match &err {
            ApiError::TypeMismatch { field, .. } => Some(field.clone()),
            _ => None,
        };
        let mut provider_err = ProviderError::new(err.kind(), err.to_string());
        if let Some(attribute) = attribute {
            provider_err = provider_err.on_attribute(attribute);
        }
        provider_err.with_cause(err)
    }
}

/// Bound a response body for inclusion in an error message
pub fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes truncated)", &body[..end], body.len() - end)
}

fn format_codes(codes: &[u16]) -> String {
    codes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

fn format_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
