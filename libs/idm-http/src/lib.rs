#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! HTTP plumbing for the Dynamics web API.
//!
//! Requests are fully resolved into a [`RequestDescriptor`] by a
//! [`RequestFactory`], sent through a [`Transport`], and classified by
//! [`decode`]. Resilience is opt-in: wrap a transport in
//! [`RetryingTransport`] or drive a single call through [`RetryExecutor`]
//! with a [`RetryPolicy`] such as [`UpstreamRetryPolicy`]. Id-list reads fan
//! out through [`execute_batched`].

pub mod batch;
pub mod error;
pub mod headers;
pub mod policy;
pub mod request;
pub mod response;
pub mod retry;
pub mod retrying;
pub mod transport;

pub use batch::execute_batched;
pub use error::HttpError;
pub use headers::{HeaderContract, StaticTokenProvider, TokenProvider};
pub use policy::{TransportRetryPolicy, UpstreamRetryPolicy};
pub use request::{RequestDescriptor, RequestFactory};
pub use response::{ResponseBody, RetryAfterHint, UpstreamResponse, decode, parse_retry_after};
pub use retry::{RetryExecutor, RetryPolicy, Verdict};
pub use retrying::{RetryMode, RetryingTransport};
pub use transport::{HyperTransport, HyperTransportConfig, Transport};

pub use http::{HeaderMap, Method, StatusCode};
