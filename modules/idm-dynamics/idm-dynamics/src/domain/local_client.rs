//! In-process [`DynamicsClient`] backed by the domain [`Service`].

use std::sync::Arc;

use async_trait::async_trait;
use idm_dynamics_sdk::{
    Account, Contact, ContactAccountLink, ContactFilter, DynamicsClient, DynamicsError, Enrolment,
    EnrolmentFilter, EnrolmentRequest, EnrolmentStatus, RoleIndex, ServiceEnrolment, ServiceRole,
};

use super::{DomainError, Service, roles};

pub struct DynamicsLocalClient {
    svc: Arc<Service>,
}

impl DynamicsLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> DynamicsError {
    tracing::error!(operation = op, error = ?e, "idm-dynamics call failed");
    e.into()
}

#[async_trait]
impl DynamicsClient for DynamicsLocalClient {
    async fn read_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, DynamicsError> {
        self.svc
            .read_contacts(filter)
            .await
            .map_err(|e| log_and_convert("read_contacts", e))
    }

    async fn read_contact_account_links(
        &self,
        contact_id: &str,
        account_ids: Option<&[String]>,
        role_ids: Option<&[String]>,
    ) -> Result<Vec<ContactAccountLink>, DynamicsError> {
        self.svc
            .read_contact_account_links(contact_id, account_ids, role_ids)
            .await
            .map_err(|e| log_and_convert("read_contact_account_links", e))
    }

    async fn read_service_roles(
        &self,
        service_ids: &[String],
    ) -> Result<Vec<ServiceRole>, DynamicsError> {
        self.svc
            .read_service_roles(service_ids)
            .await
            .map_err(|e| log_and_convert("read_service_roles", e))
    }

    async fn read_enrolments(
        &self,
        filter: &EnrolmentFilter,
    ) -> Result<Vec<Enrolment>, DynamicsError> {
        self.svc
            .read_enrolments(filter)
            .await
            .map_err(|e| log_and_convert("read_enrolments", e))
    }

    async fn read_service_enrolment(
        &self,
        service_id: &str,
        contact_id: &str,
        include_handshake: bool,
    ) -> Result<ServiceEnrolment, DynamicsError> {
        self.svc
            .read_service_enrolment(service_id, contact_id, include_handshake)
            .await
            .map_err(|e| log_and_convert("read_service_enrolment", e))
    }

    async fn read_enrolment_requests(
        &self,
        service_id: &str,
        contact_id: &str,
        only_unspent: bool,
    ) -> Result<Vec<EnrolmentRequest>, DynamicsError> {
        self.svc
            .read_enrolment_requests(service_id, contact_id, only_unspent)
            .await
            .map_err(|e| log_and_convert("read_enrolment_requests", e))
    }

    async fn read_accounts(&self, account_ids: &[String]) -> Result<Vec<Account>, DynamicsError> {
        self.svc
            .read_accounts(account_ids)
            .await
            .map_err(|e| log_and_convert("read_accounts", e))
    }

    async fn update_enrolment_status(
        &self,
        link_id: &str,
        status: EnrolmentStatus,
    ) -> Result<(), DynamicsError> {
        self.svc
            .update_enrolment_status(link_id, status)
            .await
            .map_err(|e| log_and_convert("update_enrolment_status", e))
    }

    async fn deactivate_enrolment(&self, link_id: &str) -> Result<(), DynamicsError> {
        self.svc
            .deactivate_enrolment(link_id)
            .await
            .map_err(|e| log_and_convert("deactivate_enrolment", e))
    }

    fn aggregate_authz_claims(&self, roles: &[String], role_mappings: &[String]) -> RoleIndex {
        roles::aggregate_authz_claims(roles, role_mappings)
    }
}
