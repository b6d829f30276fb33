//! idm-dynamics module
//!
//! Reads contacts, organisation links, accounts and service enrolments from
//! the Dynamics 365 web API, updates enrolment status, and aggregates role
//! claims into indexed views.
//!
//! Consumers use the [`idm_dynamics_sdk::DynamicsClient`] returned by
//! [`build_client`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

use std::sync::Arc;
use std::time::Duration;

use idm_dynamics_sdk::DynamicsClient;
use idm_http::{
    HeaderContract, HyperTransport, HyperTransportConfig, RequestFactory, RetryMode,
    RetryingTransport, TokenProvider, TransportRetryPolicy, UpstreamRetryPolicy,
};
use idm_odata::ApiBase;

pub use config::DynamicsConfig;
pub use domain::{DomainError, DynamicsLocalClient, Service};

/// Wire the hyper transport, retry decorator and request factory described by `config`.
///
/// # Errors
///
/// Fails when the configuration is invalid or the TLS connector cannot be built.
pub fn build_client(
    config: &DynamicsConfig,
    tokens: Arc<dyn TokenProvider>,
) -> Result<Arc<dyn DynamicsClient>, DomainError> {
    config.validate()?;

    let transport = HyperTransport::new(&HyperTransportConfig {
        request_timeout: config.request_timeout,
        allow_insecure_http: config.allow_insecure_http,
        ..HyperTransportConfig::default()
    })?;

    let mode = if config.upstream_retry {
        RetryMode::Upstream(UpstreamRetryPolicy::new(Duration::from_secs(
            config.retry_delay_multiplier_secs,
        )))
    } else if config.transport_retries > 0 {
        RetryMode::Transport(TransportRetryPolicy::new(config.transport_retries))
    } else {
        RetryMode::Off
    };

    let factory = RequestFactory::new(
        ApiBase::new(&config.resource_url, &config.endpoint_base)?,
        HeaderContract::new(config.max_page_size),
        tokens,
    );

    let service = Service::new(
        factory,
        Arc::new(RetryingTransport::new(transport, mode)),
        config.effective_batch_size(),
    );

    tracing::info!(
        resource_url = %config.resource_url,
        retry_mode = ?mode,
        "idm-dynamics client ready"
    );

    Ok(Arc::new(DynamicsLocalClient::new(Arc::new(service))))
}
