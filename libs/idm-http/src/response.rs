use std::time::{Duration, SystemTime};

use http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

use crate::error::HttpError;

/// Body of an upstream response as handed over by the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// Raw text, decoded as JSON on demand.
    Text(String),
    /// Already structured, returned by [`decode`] as is.
    Json(Value),
}

/// What a transport returns for every completed exchange, whatever the status.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    /// Path and query of the originating request, for diagnostics.
    pub request_path: String,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: ResponseBody, request_path: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
            request_path: request_path.into(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Exposes a `Retry-After` hint to retry policies.
pub trait RetryAfterHint {
    /// Whether the header is present at all, parseable or not.
    fn has_retry_after(&self) -> bool;

    fn retry_after(&self) -> Option<Duration>;
}

impl RetryAfterHint for UpstreamResponse {
    fn has_retry_after(&self) -> bool {
        self.headers.contains_key(http::header::RETRY_AFTER)
    }

    fn retry_after(&self) -> Option<Duration> {
        parse_retry_after(&self.headers)
    }
}

/// Parse a `Retry-After` header as delta-seconds or an HTTP-date.
///
/// Returns `None` if the header is missing, unparseable, negative, or a date
/// already in the past.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;
    let trimmed = value.trim();

    if let Ok(seconds) = trimmed.parse::<i64>() {
        if seconds < 0 {
            return None;
        }
        return Some(Duration::from_secs(seconds.cast_unsigned()));
    }

    let parsed = httpdate::parse_http_date(trimmed).ok()?;
    parsed.duration_since(SystemTime::now()).ok()
}

/// Classify a response by status and turn its body into JSON.
///
/// - status outside `200..=299`: [`HttpError::Upstream`] with the request path
///   and the vendor's `error.message`
/// - empty text body: `{}`
/// - text body: parsed, or [`HttpError::MalformedPayload`]
/// - structured body: returned unchanged
///
/// # Errors
///
/// See above.
pub fn decode(response: UpstreamResponse) -> Result<Value, HttpError> {
    let UpstreamResponse {
        status,
        body,
        request_path,
        ..
    } = response;

    if !status.is_success() {
        return Err(HttpError::Upstream {
            vendor_message: vendor_message(&body, status),
            request_path,
            status,
        });
    }

    match body {
        ResponseBody::Json(value) => Ok(value),
        ResponseBody::Text(text) if text.is_empty() => Ok(Value::Object(Map::new())),
        ResponseBody::Text(text) => serde_json::from_str(&text)
            .map_err(|source| HttpError::MalformedPayload {
                request_path,
                source: Box::new(source),
            }),
    }
}

/// The vendor's `{"error": {"message": ..}}`, falling back to the raw body or the status reason.
fn vendor_message(body: &ResponseBody, status: StatusCode) -> String {
    let parsed;
    let json = match body {
        ResponseBody::Json(value) => Some(value),
        ResponseBody::Text(text) => {
            parsed = serde_json::from_str::<Value>(text).ok();
            parsed.as_ref()
        }
    };

    if let Some(message) = json
        .and_then(|v| v.pointer("/error/message"))
        .and_then(Value::as_str)
    {
        return message.to_owned();
    }

    match body {
        ResponseBody::Text(text) if !text.trim().is_empty() => text.trim().to_owned(),
        _ => status.canonical_reason().unwrap_or("no error message").to_owned(),
    }
}
