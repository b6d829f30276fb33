use async_trait::async_trait;
use http::Method;

use crate::error::HttpError;
use crate::policy::{TransportRetryPolicy, UpstreamRetryPolicy};
use crate::request::RequestDescriptor;
use crate::response::UpstreamResponse;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transport::Transport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryMode {
    /// Pass every call straight through.
    Off,
    /// Repeat idempotent GETs on connection failures and timeouts.
    Transport(TransportRetryPolicy),
    /// Follow the upstream's `Retry-After` hints for every call.
    Upstream(UpstreamRetryPolicy),
}

/// Wraps a transport with a retry policy.
pub struct RetryingTransport<T> {
    inner: T,
    mode: RetryMode,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, mode: RetryMode) -> Self {
        Self { inner, mode }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn run<P>(
        &self,
        policy: P,
        request: &RequestDescriptor,
    ) -> Result<UpstreamResponse, HttpError>
    where
        P: RetryPolicy<UpstreamResponse, HttpError>,
    {
        RetryExecutor::new(policy)
            .run(|| self.inner.send(request))
            .await?
            .ok_or_else(|| HttpError::NoResponse {
                request_path: request.path().to_owned(),
            })
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn send(&self, request: &RequestDescriptor) -> Result<UpstreamResponse, HttpError> {
        match self.mode {
            RetryMode::Transport(policy) if request.method() == Method::GET => {
                self.run(policy, request).await
            }
            RetryMode::Upstream(policy) => self.run(policy, request).await,
            RetryMode::Off | RetryMode::Transport(_) => self.inner.send(request).await,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::headers::{HeaderContract, StaticTokenProvider};
    use crate::request::RequestFactory;
    use crate::response::ResponseBody;
    use crate::retry::Verdict;
    use http::{HeaderMap, HeaderValue, StatusCode};
    use idm_odata::{ApiBase, QueryParams};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;
    use tracing_test::traced_test;

    /// Fails with a transport error until `fail_times` calls have been made,
    /// then answers 200, optionally carrying `Retry-After` on every answer.
    struct Flaky {
        calls: AtomicU32,
        fail_times: u32,
        retry_after: Option<&'static str>,
    }

    impl Flaky {
        fn new(fail_times: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_times,
                retry_after: None,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Flaky {
        async fn send(&self, request: &RequestDescriptor) -> Result<UpstreamResponse, HttpError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_times {
                return Err(HttpError::Transport("connection reset".into()));
            }
            let mut headers = HeaderMap::new();
            if let Some(value) = self.retry_after {
                headers.insert(http::header::RETRY_AFTER, HeaderValue::from_static(value));
            }
            Ok(UpstreamResponse::new(
                StatusCode::OK,
                ResponseBody::Text("{}".to_owned()),
                request.path(),
            )
            .with_headers(headers))
        }
    }

    fn factory() -> RequestFactory {
        RequestFactory::new(
            ApiBase::new("https://org.crm11.dynamics.com", "/api/data/v9.0").unwrap(),
            HeaderContract::default(),
            Arc::new(StaticTokenProvider::new("tok")),
        )
    }

    async fn get() -> RequestDescriptor {
        factory().get("contacts", &QueryParams::new()).await.unwrap()
    }

    async fn post() -> RequestDescriptor {
        factory()
            .post("defra_lobserviceuserlinks(l1)/Microsoft.Dynamics.CRM.defra_deleteenrolment", None)
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_transport_mode_recovers_get() {
        let transport = RetryingTransport::new(
            Flaky::new(2),
            RetryMode::Transport(TransportRetryPolicy::new(2)),
        );

        let response = transport.send(&get().await).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.inner().calls(), 3);
        assert!(logs_contain("retrying operation"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_mode_gives_up_after_budget() {
        let transport = RetryingTransport::new(
            Flaky::new(5),
            RetryMode::Transport(TransportRetryPolicy::new(2)),
        );

        let err = transport.send(&get().await).await.unwrap_err();

        assert!(matches!(err, HttpError::Transport(_)));
        assert_eq!(transport.inner().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_mode_never_repeats_post() {
        let transport = RetryingTransport::new(
            Flaky::new(1),
            RetryMode::Transport(TransportRetryPolicy::new(2)),
        );

        assert!(transport.send(&post().await).await.is_err());
        assert_eq!(transport.inner().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_mode_backs_off_by_multiplier() {
        let transport = RetryingTransport::new(
            Flaky::new(2),
            RetryMode::Upstream(UpstreamRetryPolicy::new(Duration::from_secs(3))),
        );

        let start = Instant::now();
        let response = transport.send(&get().await).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.inner().calls(), 3);
        // 1 * 3s + 2 * 3s
        assert!(start.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_mode_exhausts_on_persistent_retry_after() {
        let transport = RetryingTransport::new(
            Flaky {
                retry_after: Some("1"),
                ..Flaky::new(0)
            },
            RetryMode::Upstream(UpstreamRetryPolicy::default()),
        );

        let err = transport.send(&get().await).await.unwrap_err();

        assert!(matches!(err, HttpError::RetryExhausted { attempts: 3 }));
        assert_eq!(transport.inner().calls(), 3);
    }

    /// Stops after the first attempt, dropping any error.
    fn keep_success(
        outcome: Result<UpstreamResponse, HttpError>,
        _attempt: u32,
    ) -> Verdict<UpstreamResponse, HttpError> {
        Verdict::Stop(outcome.ok())
    }

    #[tokio::test]
    async fn test_stop_without_response_is_not_transient() {
        let transport = RetryingTransport::new(Flaky::new(1), RetryMode::Off);
        let request = get().await;

        let err = transport.run(keep_success, &request).await.unwrap_err();

        match &err {
            HttpError::NoResponse { request_path } => {
                assert_eq!(request_path, "/api/data/v9.0/contacts");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_transient());
        assert_eq!(transport.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_off_mode_passes_through() {
        let transport = RetryingTransport::new(Flaky::new(1), RetryMode::Off);
        assert!(transport.send(&get().await).await.is_err());
        assert_eq!(transport.inner().calls(), 1);
    }
}
