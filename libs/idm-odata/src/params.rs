//! `$filter` / `$expand` / `$select` parameters and request URL assembly.

use url::Url;

use crate::error::ODataError;
use crate::filter::FilterExpression;

/// System query options for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct QueryParams {
    filter: Option<FilterExpression>,
    expand: Option<String>,
    select: Vec<String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Option<FilterExpression>) -> Self {
        self.filter = filter;
        self
    }

    pub fn expand(mut self, navigation: impl Into<String>) -> Self {
        self.expand = Some(navigation.into());
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn filter_expression(&self) -> Option<&FilterExpression> {
        self.filter.as_ref()
    }

    /// Percent-encoded query string without the leading `?`; empty when no option is set.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<String> = Vec::with_capacity(3);
        if let Some(filter) = &self.filter {
            pairs.push(format!("$filter={}", urlencoding::encode(filter.as_str())));
        }
        if let Some(expand) = &self.expand {
            pairs.push(format!("$expand={}", urlencoding::encode(expand)));
        }
        if !self.select.is_empty() {
            pairs.push(format!(
                "$select={}",
                urlencoding::encode(&self.select.join(","))
            ));
        }
        pairs.join("&")
    }
}

/// Resource origin plus the web API prefix, e.g. `https://org.crm11.dynamics.com` + `/api/data/v9.0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiBase {
    origin: String,
    endpoint_base: String,
}

impl ApiBase {
    /// # Errors
    ///
    /// Returns [`ODataError::InvalidBaseUrl`] when `resource_url` is not an
    /// absolute `http`/`https` URL.
    pub fn new(resource_url: &str, endpoint_base: &str) -> Result<Self, ODataError> {
        let parsed = Url::parse(resource_url).map_err(|e| ODataError::InvalidBaseUrl {
            url: resource_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ODataError::InvalidBaseUrl {
                url: resource_url.to_owned(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let trimmed = endpoint_base.trim_matches('/');
        let endpoint_base = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };

        Ok(Self {
            origin: resource_url.trim_end_matches('/').to_owned(),
            endpoint_base,
        })
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Endpoint-relative `path` (leading `/` optional) with the encoded query appended.
    #[must_use]
    pub fn path_and_query(&self, path: &str, params: &QueryParams) -> String {
        let path = path.trim_start_matches('/');
        let query = params.to_query_string();
        if query.is_empty() {
            format!("{}/{path}", self.endpoint_base)
        } else {
            format!("{}/{path}?{query}", self.endpoint_base)
        }
    }

    #[must_use]
    pub fn url(&self, path: &str, params: &QueryParams) -> String {
        format!("{}{}", self.origin, self.path_and_query(path, params))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::filter::{FilterBuilder, FilterValue};

    #[test]
    fn test_empty_params_render_nothing() {
        assert_eq!(QueryParams::new().to_query_string(), "");
    }

    #[test]
    fn test_params_are_percent_encoded_in_fixed_order() {
        let filter = FilterBuilder::new()
            .eq("statuscode", FilterValue::from(1))
            .build();
        let params = QueryParams::new()
            .select(["name", "accountid"])
            .expand("defra_ServiceRole")
            .filter(filter);
        assert_eq!(
            params.to_query_string(),
            "$filter=statuscode%20eq%201&$expand=defra_ServiceRole&$select=name%2Caccountid"
        );
    }

    #[test]
    fn test_url_joins_origin_base_and_path() {
        let base = ApiBase::new("https://org.crm11.dynamics.com/", "/api/data/v9.0/").unwrap();
        assert_eq!(
            base.url("/accounts", &QueryParams::new()),
            "https://org.crm11.dynamics.com/api/data/v9.0/accounts"
        );
        assert_eq!(
            base.path_and_query("contacts", &QueryParams::new().select(["contactid"])),
            "/api/data/v9.0/contacts?$select=contactid"
        );
    }

    #[test]
    fn test_empty_endpoint_base() {
        let base = ApiBase::new("http://127.0.0.1:8080", "").unwrap();
        assert_eq!(
            base.url("connections", &QueryParams::new()),
            "http://127.0.0.1:8080/connections"
        );
    }

    #[test]
    fn test_invalid_resource_url_is_rejected() {
        assert!(matches!(
            ApiBase::new("not a url", "/api"),
            Err(ODataError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            ApiBase::new("ftp://example.com", "/api"),
            Err(ODataError::InvalidBaseUrl { .. })
        ));
    }
}
