use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Uri;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::error::HttpError;
use crate::request::RequestDescriptor;
use crate::response::{ResponseBody, UpstreamResponse};

/// Sends one request and returns the response for every HTTP status.
///
/// Only failures below HTTP (connection, TLS, timeout) are errors here;
/// status classification is left to [`crate::decode`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] or [`HttpError::Timeout`] when no response arrives.
    async fn send(&self, request: &RequestDescriptor) -> Result<UpstreamResponse, HttpError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &RequestDescriptor) -> Result<UpstreamResponse, HttpError> {
        (**self).send(request).await
    }
}

#[derive(Clone, Debug)]
pub struct HyperTransportConfig {
    /// Per-attempt timeout covering connect, headers and body.
    pub request_timeout: Duration,
    pub pool_idle_timeout: Duration,
    /// Responses larger than this fail with [`HttpError::BodyTooLarge`].
    pub max_body_size: usize,
    /// Permit plain `http://` URLs, for local stubs only.
    pub allow_insecure_http: bool,
}

impl Default for HyperTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            max_body_size: 10 * 1024 * 1024,
            allow_insecure_http: false,
        }
    }
}

/// Pooled hyper client over rustls with webpki roots.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    request_timeout: Duration,
    max_body_size: usize,
}

impl HyperTransport {
    /// # Errors
    ///
    /// Returns [`HttpError::Tls`] when the TLS connector cannot be set up.
    pub fn new(config: &HyperTransportConfig) -> Result<Self, HttpError> {
        let provider = rustls::crypto::CryptoProvider::get_default()
            .cloned()
            .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

        let builder = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)
            .map_err(|e| HttpError::Tls(Box::new(e)))?;
        let connector = if config.allow_insecure_http {
            builder.https_or_http().enable_all_versions().build()
        } else {
            builder.https_only().enable_all_versions().build()
        };

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .build(connector);

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
            max_body_size: config.max_body_size,
        })
    }

    fn to_hyper_request(
        request: &RequestDescriptor,
    ) -> Result<http::Request<Full<Bytes>>, HttpError> {
        let uri: Uri = request.url().parse().map_err(|e: http::uri::InvalidUri| {
            HttpError::InvalidUri {
                url: request.url().to_owned(),
                reason: e.to_string(),
            }
        })?;

        let body = match request.body() {
            Some(value) => Bytes::from(serde_json::to_vec(value).map_err(HttpError::Encode)?),
            None => Bytes::new(),
        };

        let mut builder = http::Request::builder()
            .method(request.method().clone())
            .uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers().clone());
        }
        Ok(builder.body(Full::new(body))?)
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<UpstreamResponse, HttpError> {
        let hyper_request = Self::to_hyper_request(request)?;

        let exchange = async {
            let response = self.client.request(hyper_request).await?;
            let (parts, body) = response.into_parts();
            let bytes = Limited::new(body, self.max_body_size)
                .collect()
                .await
                .map_err(|e| {
                    if e.is::<LengthLimitError>() {
                        HttpError::BodyTooLarge {
                            request_path: request.path().to_owned(),
                            limit: self.max_body_size,
                        }
                    } else {
                        HttpError::Transport(e)
                    }
                })?
                .to_bytes();
            Ok::<_, HttpError>((parts, bytes))
        };

        let (parts, bytes) = tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| HttpError::Timeout(self.request_timeout))??;

        tracing::debug!(
            method = %request.method(),
            path = request.path(),
            status = parts.status.as_u16(),
            "upstream responded"
        );

        // Error bodies only feed the vendor message, so they may be lossy.
        let text = match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(_) if !parts.status.is_success() => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                return Err(HttpError::MalformedPayload {
                    request_path: request.path().to_owned(),
                    source: Box::new(e),
                });
            }
        };

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body: ResponseBody::Text(text),
            request_path: request.path().to_owned(),
        })
    }
}
