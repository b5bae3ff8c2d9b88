//! Request-level error taxonomy.
//!
//! Every failure the transcription handler can hit is a [`ProxyError`]. Each
//! variant knows the status it maps to and the message that is safe to send
//! back to the caller; the underlying cause stays in the logs.

use std::time::Duration;

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::{header::InvalidHeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Generic body for failures whose detail must not leave the proxy.
pub const GENERIC_PROXY_ERROR: &str = "Proxy error";

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The endpoint variable is unset or empty.
    #[error("{0} not configured")]
    EndpointNotConfigured(String),

    /// The endpoint variable does not hold an absolute URL.
    #[error("{var} is not a valid URL: {source}")]
    InvalidEndpoint {
        var: String,
        #[source]
        source: url::ParseError,
    },

    #[error("No file provided")]
    MissingFile,

    #[error("upload exceeds the configured size limit")]
    PayloadTooLarge,

    /// The inbound body could not be opened as multipart/form-data.
    #[error("request is not a valid multipart form: {0}")]
    InvalidForm(#[from] MultipartRejection),

    /// A field of the inbound multipart body could not be read.
    #[error("failed to read multipart field: {0}")]
    Multipart(MultipartError),

    #[error("failed to build upstream request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    #[error("upstream request timed out after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),

    #[error("invalid response header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("failed to build response: {0}")]
    Response(#[from] axum::http::Error),

    #[error("transcription slots closed: {0}")]
    SlotsClosed(#[from] tokio::sync::AcquireError),
}

impl ProxyError {
    /// HTTP status returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingFile => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::EndpointNotConfigured(_)
            | ProxyError::InvalidEndpoint { .. }
            | ProxyError::InvalidForm(_)
            | ProxyError::Multipart(_)
            | ProxyError::BuildRequest(_)
            | ProxyError::Upstream(_)
            | ProxyError::InvalidHeader(_)
            | ProxyError::Response(_)
            | ProxyError::SlotsClosed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to expose to the caller.
    ///
    /// Configuration errors name the missing setting so operators can fix it
    /// from the browser; everything upstream-related collapses into
    /// [`GENERIC_PROXY_ERROR`].
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::EndpointNotConfigured(var) => format!("{var} not configured"),
            ProxyError::InvalidEndpoint { var, .. } => format!("{var} is not a valid URL"),
            ProxyError::MissingFile => "No file provided".to_string(),
            ProxyError::PayloadTooLarge => "Uploaded file exceeds the size limit".to_string(),
            ProxyError::UpstreamTimeout(_) => "Upstream request timed out".to_string(),
            _ => GENERIC_PROXY_ERROR.to_string(),
        }
    }

    /// Terminal state label used for logs and metrics.
    pub fn outcome(&self) -> Outcome {
        match self {
            ProxyError::MissingFile | ProxyError::PayloadTooLarge => Outcome::Rejected,
            ProxyError::UpstreamTimeout(_) => Outcome::TimedOut,
            _ => Outcome::Failed,
        }
    }
}

impl From<MultipartError> for ProxyError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ProxyError::PayloadTooLarge
        } else {
            ProxyError::Multipart(err)
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), self.client_message()).into_response()
    }
}

/// Terminal state of one transcription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Upstream answered and its response was relayed.
    Relayed,
    /// The deadline elapsed and the upstream call was cancelled.
    TimedOut,
    /// Configuration, network or internal failure.
    Failed,
    /// The caller's input was refused before any upstream call.
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Relayed => "relayed",
            Outcome::TimedOut => "timed_out",
            Outcome::Failed => "failed",
            Outcome::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
