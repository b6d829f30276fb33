use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Errors raised while building, sending or decoding upstream requests.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// Network or connection failure below HTTP
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Single request attempt timed out
    #[error("Request attempt timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx status; the message embeds the request path and the vendor's own message
    #[error("Upstream request {request_path} failed with {status}: {vendor_message}")]
    Upstream {
        request_path: String,
        status: StatusCode,
        vendor_message: String,
    },

    #[error("Unrecognised JSON response from upstream for {request_path}")]
    MalformedPayload {
        request_path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Response body from {request_path} exceeds {limit} bytes")]
    BodyTooLarge { request_path: String, limit: usize },

    /// The retry policy stopped without keeping a response to return
    #[error("Retry policy for {request_path} stopped without a response")]
    NoResponse { request_path: String },

    /// The upstream kept asking to retry after the attempt ceiling was reached
    #[error("Retry-After header found but retry limit hit after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri { url: String, reason: String },

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to obtain access token: {0}")]
    Token(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HttpError {
    /// Failures worth repeating an idempotent request for.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
