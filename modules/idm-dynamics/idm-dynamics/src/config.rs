//! Configuration for the idm-dynamics module.

use std::time::Duration;

use idm_odata::MAX_BATCH_SIZE;
use serde::Deserialize;

use crate::domain::DomainError;

/// Module configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DynamicsConfig {
    /// Origin of the CRM instance, e.g. `https://org.crm11.dynamics.com`.
    pub resource_url: String,

    /// Web API prefix appended to `resource_url`.
    pub endpoint_base: String,

    /// Per-attempt timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Back-off step used by the upstream retry policy when no `Retry-After` is given.
    pub retry_delay_multiplier_secs: u64,

    /// Follow `Retry-After` hints instead of only retrying connection failures.
    pub upstream_retry: bool,

    /// Value of `odata.maxpagesize` in the `Prefer` header.
    pub max_page_size: u32,

    /// Ids per request for batched reads; capped at 100.
    pub batch_size: usize,

    /// Extra attempts for GETs that fail below HTTP.
    pub transport_retries: u32,

    /// Permit `http://` resource URLs (local stubs only).
    pub allow_insecure_http: bool,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            resource_url: String::new(),
            endpoint_base: "/api/data/v9.0".to_owned(),
            request_timeout: Duration::from_secs(30),
            retry_delay_multiplier_secs: 3,
            upstream_retry: false,
            max_page_size: 500,
            batch_size: MAX_BATCH_SIZE,
            transport_retries: 2,
            allow_insecure_http: false,
        }
    }
}

impl DynamicsConfig {
    /// # Errors
    ///
    /// Returns [`DomainError::Config`] for an empty or unparseable `resource_url`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.resource_url.trim().is_empty() {
            return Err(DomainError::Config("resource_url is required".to_owned()));
        }
        url::Url::parse(&self.resource_url)
            .map_err(|e| DomainError::Config(format!("resource_url: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}
