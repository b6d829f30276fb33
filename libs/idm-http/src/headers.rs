//! The header set every upstream request carries, and where the bearer token comes from.

use async_trait::async_trait;
use http::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::HttpError;

pub const ODATA_MAX_VERSION: HeaderName = HeaderName::from_static("odata-maxversion");
pub const ODATA_VERSION: HeaderName = HeaderName::from_static("odata-version");
pub const PREFER: HeaderName = HeaderName::from_static("prefer");

pub const DEFAULT_MAX_PAGE_SIZE: u32 = 500;

/// Supplies bearer tokens for upstream calls. Issuance and caching live with the implementor.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`HttpError::Token`] when no token can be obtained.
    async fn access_token(&self) -> Result<SecretString, HttpError>;
}

/// Hands out the same token on every call.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<SecretString, HttpError> {
        Ok(self.token.clone())
    }
}

/// Fixed protocol headers plus the paging / annotation preference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderContract {
    max_page_size: u32,
}

impl Default for HeaderContract {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGE_SIZE)
    }
}

impl HeaderContract {
    #[must_use]
    pub fn new(max_page_size: u32) -> Self {
        Self { max_page_size }
    }

    /// Contract headers with `overrides` merged last; an override replaces
    /// every contract value under the same name.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidHeaderValue`] when the token cannot be a header value.
    pub fn headers(
        &self,
        token: &SecretString,
        overrides: &HeaderMap,
    ) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::with_capacity(8);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(ODATA_MAX_VERSION, HeaderValue::from_static("4.0"));
        headers.insert(ODATA_VERSION, HeaderValue::from_static("4.0"));
        headers.insert(
            PREFER,
            HeaderValue::from_str(&format!(
                "odata.maxpagesize={}, odata.include-annotations=\"*\"",
                self.max_page_size
            ))?,
        );

        for name in overrides.keys() {
            headers.remove(name);
        }
        for (name, value) in overrides {
            headers.append(name.clone(), value.clone());
        }

        Ok(headers)
    }
}
