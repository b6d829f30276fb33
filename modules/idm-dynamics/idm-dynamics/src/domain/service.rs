//! Entity reads and enrolment actions against the CRM web API.
//!
//! Every operation is split into a request builder, the transport call and a
//! parser, so the builders and parsers can be checked without a network.

use std::sync::Arc;

use idm_dynamics_sdk::{
    Account, Contact, ContactAccountLink, ContactFilter, Enrolment, EnrolmentFilter,
    EnrolmentRequest, EnrolmentStatus, ServiceEnrolment, ServiceRole,
};
use idm_http::{RequestDescriptor, RequestFactory, Transport, decode, execute_batched};
use idm_odata::{Clause, FilterBuilder, FilterValue, Query, QueryParams, QueryValue};
use serde_json::{Value, json};
use tracing::instrument;

use super::error::DomainError;
use super::mappings::{
    ENROLMENT_REQUEST_UNSPENT, EXPAND_SERVICE_ROLE, ServiceUserLinkStatus, action, entity, role_id,
};
use super::projection::{
    self, ACCOUNT_FIELDS, CONNECTION_FIELDS, CONTACT_FIELDS, ENROLMENT_REQUEST_FIELDS,
};
use super::roles;

// Query keys. Batched reads split on `ACCOUNT_IDS`.
const CONTACT_ID: &str = "contactId";
const CONTACT_IDS: &str = "contactIds";
const ACCOUNT_IDS: &str = "accountIds";
const ROLE_IDS: &str = "roleIds";
const LINK_IDS: &str = "linkIds";
const SERVICE_IDS: &str = "serviceIds";
const INCLUDE_ALL: &str = "includeAllServiceRecords";

fn literals<S: AsRef<str>>(ids: &[S]) -> Vec<FilterValue> {
    ids.iter().map(|id| FilterValue::literal(id.as_ref())).collect()
}

fn id_list<S: AsRef<str>>(ids: &[S]) -> QueryValue {
    QueryValue::List(literals(ids))
}

/// Entity operations over one CRM instance.
pub struct Service {
    requests: RequestFactory,
    transport: Arc<dyn Transport>,
    batch_size: usize,
}

impl Service {
    #[must_use]
    pub fn new(requests: RequestFactory, transport: Arc<dyn Transport>, batch_size: usize) -> Self {
        Self {
            requests,
            transport,
            batch_size,
        }
    }

    async fn fetch(&self, request: &RequestDescriptor) -> Result<Value, DomainError> {
        let response = self.transport.send(request).await?;
        Ok(decode(response)?)
    }

    // === Contacts ===

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_contacts_request(
        &self,
        filter: &ContactFilter,
    ) -> Result<RequestDescriptor, DomainError> {
        let clause = match filter {
            ContactFilter::Email(pattern) => Clause::matches("emailaddress1", pattern.clone()),
            ContactFilter::B2cObjectId(id) => {
                Clause::eq("defra_b2cobjectid", FilterValue::text(id.as_str()))
            }
        };
        let params = QueryParams::new()
            .filter(FilterBuilder::new().clause(clause).build())
            .select(CONTACT_FIELDS.iter().copied());
        Ok(self.requests.get(entity::CONTACTS, &params).await?)
    }

    /// # Errors
    ///
    /// Fails on transport or upstream errors.
    #[instrument(skip_all, level = "debug")]
    pub async fn read_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, DomainError> {
        let request = self.build_contacts_request(filter).await?;
        let payload = self.fetch(&request).await?;
        Ok(parse_contacts(&payload))
    }

    // === Contact / organisation links ===

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_contact_account_links_request(
        &self,
        query: &Query,
    ) -> Result<RequestDescriptor, DomainError> {
        let filter = FilterBuilder::new()
            .eq_opt("_record1id_value", query.single(CONTACT_ID).cloned())
            .any_of("_record1roleid_value", query.list(ROLE_IDS).to_vec())
            .any_of("_record2id_value", query.list(ACCOUNT_IDS).to_vec())
            .build();
        let params = QueryParams::new()
            .filter(filter)
            .select(CONNECTION_FIELDS.iter().copied());
        Ok(self.requests.get(entity::CONNECTIONS, &params).await?)
    }

    /// Links of `contact_id`, batched on `account_ids`.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    #[instrument(skip(self, account_ids, role_ids), level = "debug")]
    pub async fn read_contact_account_links(
        &self,
        contact_id: &str,
        account_ids: Option<&[String]>,
        role_ids: Option<&[String]>,
    ) -> Result<Vec<ContactAccountLink>, DomainError> {
        if account_ids.is_some_and(<[String]>::is_empty) {
            return Ok(Vec::new());
        }

        let roles = match role_ids {
            Some(ids) if !ids.is_empty() => id_list(ids),
            _ => id_list(&role_id::DEFAULT_LINK_ROLES),
        };
        let query = Query::new()
            .with(CONTACT_ID, QueryValue::Single(FilterValue::literal(contact_id)))
            .with(ROLE_IDS, roles)
            .with_opt(ACCOUNT_IDS, account_ids.map(id_list));

        execute_batched(
            self.transport.as_ref(),
            &query,
            ACCOUNT_IDS,
            self.batch_size,
            |chunk| async move { self.build_contact_account_links_request(&chunk).await },
            |payload| parse_contact_account_links(&payload),
        )
        .await
    }

    // === Service roles ===

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_service_roles_request<S: AsRef<str>>(
        &self,
        service_ids: &[S],
    ) -> Result<RequestDescriptor, DomainError> {
        let filter = FilterBuilder::new()
            .any_of("_defra_lobservice_value", literals(service_ids))
            .build();
        let params = QueryParams::new().filter(filter);
        Ok(self.requests.get(entity::SERVICE_ROLES, &params).await?)
    }

    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_service_roles(
        &self,
        service_ids: &[String],
    ) -> Result<Vec<ServiceRole>, DomainError> {
        let request = self.build_service_roles_request(service_ids).await?;
        let payload = self.fetch(&request).await?;
        parse_service_roles(&payload)
    }

    // === Enrolments (service-user links) ===

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_enrolments_request(
        &self,
        query: &Query,
    ) -> Result<RequestDescriptor, DomainError> {
        let builder = FilterBuilder::new()
            .any_of("_defra_serviceuser_value", query.list(CONTACT_IDS).to_vec())
            .eq("statuscode", ServiceUserLinkStatus::Active.code().into())
            .any_of("_defra_organisation_value", query.list(ACCOUNT_IDS).to_vec())
            .any_of("defra_lobserviceuserlinkid", query.list(LINK_IDS).to_vec());

        // Role and service lists only apply with the flag. Handshake links
        // name the service but carry no role, so the two are OR-ed.
        let builder = if query.flag(INCLUDE_ALL) {
            builder.either(
                [
                    Clause::any_of("_defra_servicerole_value", query.list(ROLE_IDS).to_vec()),
                    Clause::any_of("_defra_service_value", query.list(SERVICE_IDS).to_vec()),
                ]
                .into_iter()
                .flatten()
                .collect(),
            )
        } else {
            builder
        };

        let params = QueryParams::new()
            .filter(builder.build())
            .expand(EXPAND_SERVICE_ROLE);
        Ok(self.requests.get(entity::SERVICE_USER_LINKS, &params).await?)
    }

    /// Active service-user links, batched on account ids.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    #[instrument(skip_all, level = "debug", fields(accounts = filter.account_ids.len()))]
    pub async fn read_enrolments(
        &self,
        filter: &EnrolmentFilter,
    ) -> Result<Vec<Enrolment>, DomainError> {
        let non_empty = |ids: &[String]| (!ids.is_empty()).then(|| id_list(ids));
        let query = Query::new()
            .with_opt(CONTACT_IDS, non_empty(&filter.contact_ids))
            .with_opt(ROLE_IDS, non_empty(&filter.service_role_ids))
            .with_opt(ACCOUNT_IDS, non_empty(&filter.account_ids))
            .with_opt(LINK_IDS, non_empty(&filter.link_ids))
            .with_opt(SERVICE_IDS, non_empty(&filter.service_ids))
            .with(INCLUDE_ALL, QueryValue::Flag(filter.include_all_service_records));

        execute_batched(
            self.transport.as_ref(),
            &query,
            ACCOUNT_IDS,
            self.batch_size,
            |chunk| async move { self.build_enrolments_request(&chunk).await },
            |payload| parse_enrolments(&payload),
        )
        .await
    }

    /// Role claims `contact_id` holds for `service_id`, handshake links
    /// included only when asked.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_service_enrolment(
        &self,
        service_id: &str,
        contact_id: &str,
        include_handshake: bool,
    ) -> Result<ServiceEnrolment, DomainError> {
        let service_ids = vec![service_id.to_owned()];
        let service_roles = self.read_service_roles(&service_ids).await?;

        let filter = EnrolmentFilter {
            service_role_ids: service_roles.into_iter().map(|role| role.id).collect(),
            service_ids,
            include_all_service_records: true,
            ..EnrolmentFilter::for_contact(contact_id)
        };
        let enrolments = self.read_enrolments(&filter).await?;

        Ok(roles::service_enrolment(&enrolments, include_handshake))
    }

    // === Enrolment requests ===

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_enrolment_requests_request(
        &self,
        service_id: &str,
        contact_id: &str,
        only_unspent: bool,
    ) -> Result<RequestDescriptor, DomainError> {
        let filter = FilterBuilder::new()
            .eq("_defra_service_value", FilterValue::literal(service_id))
            .eq("_defra_serviceuser_value", FilterValue::literal(contact_id))
            .eq_opt(
                "statuscode",
                only_unspent.then_some(ENROLMENT_REQUEST_UNSPENT.into()),
            )
            .build();
        let params = QueryParams::new()
            .filter(filter)
            .select(ENROLMENT_REQUEST_FIELDS.iter().copied());
        Ok(self
            .requests
            .get(entity::SERVICE_USER_LINK_REQUESTS, &params)
            .await?)
    }

    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_enrolment_requests(
        &self,
        service_id: &str,
        contact_id: &str,
        only_unspent: bool,
    ) -> Result<Vec<EnrolmentRequest>, DomainError> {
        let request = self
            .build_enrolment_requests_request(service_id, contact_id, only_unspent)
            .await?;
        let payload = self.fetch(&request).await?;
        parse_enrolment_requests(&payload)
    }

    // === Accounts ===

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_accounts_request(
        &self,
        query: &Query,
    ) -> Result<RequestDescriptor, DomainError> {
        let filter = FilterBuilder::new()
            .any_of("accountid", query.list(ACCOUNT_IDS).to_vec())
            .build();
        let params = QueryParams::new()
            .filter(filter)
            .select(ACCOUNT_FIELDS.iter().copied());
        Ok(self.requests.get(entity::ACCOUNTS, &params).await?)
    }

    /// Accounts in input id order. No ids means no request.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    #[instrument(skip_all, level = "debug", fields(accounts = account_ids.len()))]
    pub async fn read_accounts(&self, account_ids: &[String]) -> Result<Vec<Account>, DomainError> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().with(ACCOUNT_IDS, id_list(account_ids));

        execute_batched(
            self.transport.as_ref(),
            &query,
            ACCOUNT_IDS,
            self.batch_size,
            |chunk| async move { self.build_accounts_request(&chunk).await },
            |payload| parse_accounts(&payload),
        )
        .await
    }

    // === Enrolment actions ===

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_update_enrolment_status_request(
        &self,
        link_id: &str,
        status: EnrolmentStatus,
    ) -> Result<RequestDescriptor, DomainError> {
        let path = action::path(entity::SERVICE_USER_LINKS, link_id, action::UPDATE_ENROLMENT);
        let body = json!({ "UpdateEnrolmentStatus": status.code() });
        Ok(self.requests.post(&path, Some(body)).await?)
    }

    /// # Errors
    ///
    /// Fails on transport or upstream errors.
    #[instrument(skip(self), level = "debug")]
    pub async fn update_enrolment_status(
        &self,
        link_id: &str,
        status: EnrolmentStatus,
    ) -> Result<(), DomainError> {
        let request = self
            .build_update_enrolment_status_request(link_id, status)
            .await?;
        self.fetch(&request).await?;
        tracing::info!(link_id, status = status.code(), "enrolment status updated");
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when no access token is available.
    pub async fn build_deactivate_enrolment_request(
        &self,
        link_id: &str,
    ) -> Result<RequestDescriptor, DomainError> {
        let path = action::path(entity::SERVICE_USER_LINKS, link_id, action::DELETE_ENROLMENT);
        Ok(self.requests.post(&path, None).await?)
    }

    /// # Errors
    ///
    /// Fails on transport or upstream errors.
    #[instrument(skip(self), level = "debug")]
    pub async fn deactivate_enrolment(&self, link_id: &str) -> Result<(), DomainError> {
        let request = self.build_deactivate_enrolment_request(link_id).await?;
        self.fetch(&request).await?;
        tracing::info!(link_id, "enrolment deactivated");
        Ok(())
    }
}

// === Parsers ===

/// Contacts from a collection or a single-entity response.
#[must_use]
pub fn parse_contacts(payload: &Value) -> Vec<Contact> {
    projection::rows(payload)
        .into_iter()
        .map(projection::contact)
        .collect()
}

/// # Errors
///
/// [`DomainError::UnexpectedShape`] without a `value` array.
pub fn parse_contact_account_links(
    payload: &Value,
) -> Result<Vec<ContactAccountLink>, DomainError> {
    Ok(projection::collection(payload, "read_contact_account_links")?
        .iter()
        .map(projection::contact_account_link)
        .collect())
}

/// # Errors
///
/// [`DomainError::UnexpectedShape`] without a `value` array.
pub fn parse_service_roles(payload: &Value) -> Result<Vec<ServiceRole>, DomainError> {
    Ok(projection::collection(payload, "read_service_roles")?
        .iter()
        .map(projection::service_role)
        .collect())
}

/// # Errors
///
/// [`DomainError::UnexpectedShape`] without a `value` array.
pub fn parse_enrolments(payload: &Value) -> Result<Vec<Enrolment>, DomainError> {
    Ok(projection::collection(payload, "read_enrolments")?
        .iter()
        .map(projection::enrolment)
        .collect())
}

/// # Errors
///
/// [`DomainError::UnexpectedShape`] without a `value` array.
pub fn parse_enrolment_requests(payload: &Value) -> Result<Vec<EnrolmentRequest>, DomainError> {
    Ok(projection::collection(payload, "read_enrolment_requests")?
        .iter()
        .map(projection::enrolment_request)
        .collect())
}

/// # Errors
///
/// [`DomainError::UnexpectedShape`] without a `value` array.
pub fn parse_accounts(payload: &Value) -> Result<Vec<Account>, DomainError> {
    Ok(projection::collection(payload, "read_accounts")?
        .iter()
        .map(projection::account)
        .collect())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use idm_http::{
        HeaderContract, HttpError, Method, ResponseBody, StaticTokenProvider, StatusCode,
        UpstreamResponse,
    };
    use idm_odata::{ApiBase, TextMatch};
    use std::sync::Mutex;

    /// Records every request and answers from a fixed queue, falling back to
    /// an empty collection.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<RequestDescriptor>>,
        answers: Mutex<Vec<Value>>,
    }

    impl Recording {
        fn answering(answers: Vec<Value>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                answers: Mutex::new(answers.into_iter().rev().collect()),
            }
        }

        fn filters(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|r| filter_of(r.url()))
                .collect()
        }
    }

    #[async_trait]
    impl Transport for Recording {
        async fn send(&self, request: &RequestDescriptor) -> Result<UpstreamResponse, HttpError> {
            self.seen.lock().unwrap().push(request.clone());
            let body = self
                .answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| json!({"value": []}));
            Ok(UpstreamResponse::new(
                StatusCode::OK,
                ResponseBody::Json(body),
                request.path(),
            ))
        }
    }

    fn filter_of(url: &str) -> String {
        let query = url.split_once('?').map_or("", |(_, q)| q);
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("$filter="))
            .map(|f| urlencoding::decode(f).unwrap().into_owned())
            .unwrap_or_default()
    }

    fn service(transport: Arc<Recording>, batch_size: usize) -> Service {
        let factory = RequestFactory::new(
            ApiBase::new("https://org.crm11.dynamics.com", "/api/data/v9.0").unwrap(),
            HeaderContract::default(),
            Arc::new(StaticTokenProvider::new("token")),
        );
        Service::new(factory, transport, batch_size)
    }

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[tokio::test]
    async fn test_contact_filters() {
        let svc = service(Arc::new(Recording::default()), 100);

        let by_email = svc
            .build_contacts_request(&ContactFilter::email("o'neil@example.com"))
            .await
            .unwrap();
        assert_eq!(
            filter_of(by_email.url()),
            "emailaddress1 eq 'o''neil@example.com'"
        );
        assert!(by_email.url().starts_with("https://org.crm11.dynamics.com/api/data/v9.0/contacts?"));

        let by_suffix = svc
            .build_contacts_request(&ContactFilter::Email(TextMatch::ends_with("@defra.gov.uk")))
            .await
            .unwrap();
        assert_eq!(
            filter_of(by_suffix.url()),
            "endswith(emailaddress1,'@defra.gov.uk')"
        );

        let by_sub = svc
            .build_contacts_request(&ContactFilter::b2c_object_id("sub-1"))
            .await
            .unwrap();
        assert_eq!(filter_of(by_sub.url()), "defra_b2cobjectid eq 'sub-1'");
    }

    #[tokio::test]
    async fn test_links_default_to_standard_roles() {
        let transport = Arc::new(Recording::default());
        let svc = service(transport.clone(), 100);

        svc.read_contact_account_links("c1", None, None).await.unwrap();

        assert_eq!(
            transport.filters(),
            vec![format!(
                "_record1id_value eq c1 and ( _record1roleid_value eq {} or _record1roleid_value eq {} or _record1roleid_value eq {} )",
                role_id::CITIZEN,
                role_id::EMPLOYEE,
                role_id::AGENT_CUSTOMER
            )]
        );
    }

    #[tokio::test]
    async fn test_links_are_batched_on_account_ids() {
        let transport = Arc::new(Recording::answering(vec![
            json!({"value": [{"connectionid": "k1", "_record2id_value": "a0"}]}),
            json!({"value": [{"connectionid": "k2", "_record2id_value": "a2"}]}),
        ]));
        let svc = service(transport.clone(), 2);
        let roles = vec!["r1".to_owned()];

        let links = svc
            .read_contact_account_links("c1", Some(&ids("a", 3)), Some(&roles))
            .await
            .unwrap();

        let filters = transport.filters();
        assert_eq!(filters.len(), 2);
        assert!(filters[0].ends_with("( _record2id_value eq a0 or _record2id_value eq a1 )"));
        assert!(filters[1].ends_with("( _record2id_value eq a2 )"));
        assert!(filters[1].contains("( _record1roleid_value eq r1 )"));
        let connections: Vec<&str> = links.iter().map(|l| l.connection_id.as_str()).collect();
        assert_eq!(connections, vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_links_with_empty_account_list_skip_the_call() {
        let transport = Arc::new(Recording::default());
        let svc = service(transport.clone(), 100);

        let links = svc
            .read_contact_account_links("c1", Some(&[]), None)
            .await
            .unwrap();
        assert!(links.is_empty());
        assert!(transport.filters().is_empty());
    }

    #[tokio::test]
    async fn test_enrolment_filter_with_all_service_records() {
        let svc = service(Arc::new(Recording::default()), 100);
        let query = Query::new()
            .with(CONTACT_IDS, id_list(&["c1"]))
            .with(ROLE_IDS, id_list(&["r1", "r2"]))
            .with(SERVICE_IDS, id_list(&["s1"]))
            .with(INCLUDE_ALL, QueryValue::Flag(true));

        let request = svc.build_enrolments_request(&query).await.unwrap();

        assert_eq!(
            filter_of(request.url()),
            "( _defra_serviceuser_value eq c1 ) and statuscode eq 1 and \
             ( ( _defra_servicerole_value eq r1 or _defra_servicerole_value eq r2 ) or ( _defra_service_value eq s1 ) )"
        );
        assert!(request.url().contains("$expand=defra_ServiceRole"));
    }

    #[tokio::test]
    async fn test_enrolment_filter_ignores_service_lists_without_all_service_records() {
        let svc = service(Arc::new(Recording::default()), 100);
        let query = Query::new()
            .with(CONTACT_IDS, id_list(&["c1"]))
            .with(ACCOUNT_IDS, id_list(&["a1"]))
            .with(LINK_IDS, id_list(&["l1"]))
            .with(ROLE_IDS, id_list(&["r1"]))
            .with(SERVICE_IDS, id_list(&["s1"]))
            .with(INCLUDE_ALL, QueryValue::Flag(false));

        let request = svc.build_enrolments_request(&query).await.unwrap();

        let filter = filter_of(request.url());
        assert_eq!(
            filter,
            "( _defra_serviceuser_value eq c1 ) and statuscode eq 1 and \
             ( _defra_organisation_value eq a1 ) and ( defra_lobserviceuserlinkid eq l1 )"
        );
        assert!(!filter.contains("_defra_servicerole_value"));
        assert!(!filter.contains("_defra_service_value"));
    }

    #[tokio::test]
    async fn test_service_enrolment_reads_roles_then_links() {
        let transport = Arc::new(Recording::answering(vec![
            json!({"value": [{"defra_lobserivceroleid": "r1"}]}),
            json!({"value": [
                {
                    "defra_lobserviceuserlinkid": "l1",
                    "_defra_organisation_value": "o1",
                    "_defra_organisation_value@OData.Community.Display.V1.FormattedValue": "Acme",
                    "_defra_servicerole_value": "r1",
                    "_defra_servicerole_value@OData.Community.Display.V1.FormattedValue": "Admin",
                    "defra_enrolmentstatus": 3,
                    "defra_enrolmentstatus@OData.Community.Display.V1.FormattedValue": "Complete Approved"
                },
                {
                    "defra_lobserviceuserlinkid": "l2",
                    "_defra_organisation_value": "o2",
                    "defra_enrolmentstatus": 1,
                    "defra_ishandshake": true
                }
            ]}),
        ]));
        let svc = service(transport.clone(), 100);

        let enrolment = svc.read_service_enrolment("s1", "c1", false).await.unwrap();

        assert_eq!(enrolment.roles, vec!["o1:r1:3"]);
        assert_eq!(enrolment.mappings, vec!["o1:Acme", "r1:Admin", "3:Complete Approved"]);

        let filters = transport.filters();
        assert_eq!(filters[0], "( _defra_lobservice_value eq s1 )");
        assert!(filters[1].contains(
            "( ( _defra_servicerole_value eq r1 ) or ( _defra_service_value eq s1 ) )"
        ));
    }

    #[tokio::test]
    async fn test_enrolment_request_filter() {
        let svc = service(Arc::new(Recording::default()), 100);

        let unspent = svc
            .build_enrolment_requests_request("s1", "c1", true)
            .await
            .unwrap();
        assert_eq!(
            filter_of(unspent.url()),
            "_defra_service_value eq s1 and _defra_serviceuser_value eq c1 and statuscode eq 1"
        );

        let all = svc
            .build_enrolment_requests_request("s1", "c1", false)
            .await
            .unwrap();
        assert_eq!(
            filter_of(all.url()),
            "_defra_service_value eq s1 and _defra_serviceuser_value eq c1"
        );
    }

    #[tokio::test]
    async fn test_accounts_keep_input_order_across_chunks() {
        let transport = Arc::new(Recording::answering(vec![
            json!({"value": [{"accountid": "a0", "name": "Zero"}, {"accountid": "a1", "name": "One"}]}),
            json!({"value": [{"accountid": "a2", "name": "Two"}]}),
        ]));
        let svc = service(transport.clone(), 2);

        let accounts = svc.read_accounts(&ids("a", 3)).await.unwrap();

        let names: Vec<_> = accounts.iter().filter_map(|a| a.account_name.as_deref()).collect();
        assert_eq!(names, vec!["Zero", "One", "Two"]);
        assert_eq!(transport.filters().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_account_list_makes_no_request() {
        let transport = Arc::new(Recording::default());
        let svc = service(transport.clone(), 100);
        assert!(svc.read_accounts(&[]).await.unwrap().is_empty());
        assert!(transport.filters().is_empty());
    }

    #[tokio::test]
    async fn test_enrolment_actions() {
        let svc = service(Arc::new(Recording::default()), 100);

        let update = svc
            .build_update_enrolment_status_request("l1", EnrolmentStatus::CompleteApproved)
            .await
            .unwrap();
        assert_eq!(update.method(), Method::POST);
        assert_eq!(
            update.path(),
            "/api/data/v9.0/defra_lobserviceuserlinks(l1)/Microsoft.Dynamics.CRM.defra_updateenrolment"
        );
        assert_eq!(update.body(), Some(&json!({"UpdateEnrolmentStatus": 3})));

        let deactivate = svc.build_deactivate_enrolment_request("l1").await.unwrap();
        assert!(deactivate.path().ends_with("Microsoft.Dynamics.CRM.defra_deleteenrolment"));
        assert!(deactivate.body().is_none());
    }

    #[test]
    fn test_collection_parsers_reject_bare_objects() {
        let err = parse_enrolment_requests(&json!({"statuscode": 1})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "read_enrolment_requests response has unrecognised JSON"
        );
        assert!(parse_accounts(&json!({"value": "nope"})).is_err());
    }
}
