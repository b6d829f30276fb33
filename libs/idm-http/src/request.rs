use std::sync::Arc;

use http::{HeaderMap, Method};
use idm_odata::{ApiBase, QueryParams};
use serde_json::Value;

use crate::error::HttpError;
use crate::headers::{HeaderContract, TokenProvider};

/// A fully resolved request, ready for a [`crate::Transport`].
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    path: String,
    headers: HeaderMap,
    body: Option<Value>,
}

impl RequestDescriptor {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path and query, as reported in upstream errors.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Resolves endpoint-relative requests against one API base with fresh auth headers.
#[derive(Clone)]
pub struct RequestFactory {
    base: ApiBase,
    contract: HeaderContract,
    tokens: Arc<dyn TokenProvider>,
}

impl RequestFactory {
    pub fn new(base: ApiBase, contract: HeaderContract, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            base,
            contract,
            tokens,
        }
    }

    #[must_use]
    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    /// # Errors
    ///
    /// Fails when no token is available or it cannot be sent as a header.
    pub async fn get(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<RequestDescriptor, HttpError> {
        self.build(Method::GET, path, params, None, &HeaderMap::new())
            .await
    }

    /// POST to an action endpoint such as `/collection(<id>)/Namespace.action`.
    ///
    /// # Errors
    ///
    /// Fails when no token is available or it cannot be sent as a header.
    pub async fn post(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<RequestDescriptor, HttpError> {
        self.build(
            Method::POST,
            path,
            &QueryParams::new(),
            body,
            &HeaderMap::new(),
        )
        .await
    }

    /// # Errors
    ///
    /// Fails when no token is available or it cannot be sent as a header.
    pub async fn build(
        &self,
        method: Method,
        path: &str,
        params: &QueryParams,
        body: Option<Value>,
        extra_headers: &HeaderMap,
    ) -> Result<RequestDescriptor, HttpError> {
        let token = self.tokens.access_token().await?;
        let headers = self.contract.headers(&token, extra_headers)?;

        Ok(RequestDescriptor {
            method,
            url: self.base.url(path, params),
            path: self.base.path_and_query(path, params),
            headers,
            body,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::headers::StaticTokenProvider;
    use http::HeaderValue;
    use http::header::AUTHORIZATION;
    use idm_odata::{FilterBuilder, FilterValue};
    use serde_json::json;

    fn factory() -> RequestFactory {
        RequestFactory::new(
            ApiBase::new("https://org.crm11.dynamics.com", "/api/data/v9.0").unwrap(),
            HeaderContract::default(),
            Arc::new(StaticTokenProvider::new("tok")),
        )
    }

    #[tokio::test]
    async fn test_get_resolves_url_and_path() {
        let params = QueryParams::new().filter(
            FilterBuilder::new()
                .eq("accountid", FilterValue::literal("a1"))
                .build(),
        );
        let request = factory().get("/accounts", &params).await.unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url(),
            "https://org.crm11.dynamics.com/api/data/v9.0/accounts?$filter=accountid%20eq%20a1"
        );
        assert_eq!(
            request.path(),
            "/api/data/v9.0/accounts?$filter=accountid%20eq%20a1"
        );
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");
        assert!(request.body().is_none());
    }

    #[tokio::test]
    async fn test_post_carries_json_body() {
        let request = factory()
            .post(
                "/defra_lobserviceuserlinks(l1)/Microsoft.Dynamics.CRM.defra_updateenrolment",
                Some(json!({"UpdateEnrolmentStatus": 3})),
            )
            .await
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.body(), Some(&json!({"UpdateEnrolmentStatus": 3})));
    }

    #[tokio::test]
    async fn test_extra_headers_are_merged() {
        let mut extra = HeaderMap::new();
        extra.insert("mscrm.suppressduplicatedetection", HeaderValue::from_static("false"));
        let request = factory()
            .build(Method::GET, "contacts", &QueryParams::new(), None, &extra)
            .await
            .unwrap();
        assert_eq!(request.headers()["mscrm.suppressduplicatedetection"], "false");
    }

    #[tokio::test]
    async fn test_token_failure_propagates() {
        struct Failing;

        #[async_trait::async_trait]
        impl TokenProvider for Failing {
            async fn access_token(&self) -> Result<secrecy::SecretString, HttpError> {
                Err(HttpError::Token("identity provider unavailable".into()))
            }
        }

        let factory = RequestFactory::new(
            ApiBase::new("https://org.crm11.dynamics.com", "").unwrap(),
            HeaderContract::default(),
            Arc::new(Failing),
        );
        let err = factory.get("contacts", &QueryParams::new()).await.unwrap_err();
        assert!(matches!(err, HttpError::Token(_)));
    }
}
