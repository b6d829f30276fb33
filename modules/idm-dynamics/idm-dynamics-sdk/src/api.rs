//! Public API trait for the idm-dynamics module.

use async_trait::async_trait;

use crate::error::DynamicsError;
use crate::models::{
    Account, Contact, ContactAccountLink, ContactFilter, Enrolment, EnrolmentFilter,
    EnrolmentRequest, EnrolmentStatus, RoleIndex, ServiceEnrolment, ServiceRole,
};

/// Read and update identity records held in the CRM.
///
/// Id-list arguments of any length are accepted; they are split into
/// bounded requests and the results concatenated in input order.
#[async_trait]
pub trait DynamicsClient: Send + Sync {
    /// Contacts matching an email predicate or a B2C object id.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors.
    async fn read_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, DynamicsError>;

    /// Organisation links of a contact, optionally narrowed to some accounts
    /// and roles. Without `role_ids` the citizen, employee and agent-customer
    /// roles are used.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    async fn read_contact_account_links(
        &self,
        contact_id: &str,
        account_ids: Option<&[String]>,
        role_ids: Option<&[String]>,
    ) -> Result<Vec<ContactAccountLink>, DynamicsError>;

    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    async fn read_service_roles(
        &self,
        service_ids: &[String],
    ) -> Result<Vec<ServiceRole>, DynamicsError>;

    /// Active service-user links matching `filter`.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    async fn read_enrolments(
        &self,
        filter: &EnrolmentFilter,
    ) -> Result<Vec<Enrolment>, DynamicsError>;

    /// Role claims a contact holds for one service.
    ///
    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    async fn read_service_enrolment(
        &self,
        service_id: &str,
        contact_id: &str,
        include_handshake: bool,
    ) -> Result<ServiceEnrolment, DynamicsError>;

    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    async fn read_enrolment_requests(
        &self,
        service_id: &str,
        contact_id: &str,
        only_unspent: bool,
    ) -> Result<Vec<EnrolmentRequest>, DynamicsError>;

    /// # Errors
    ///
    /// Fails on transport or upstream errors, or a response without `value`.
    async fn read_accounts(&self, account_ids: &[String]) -> Result<Vec<Account>, DynamicsError>;

    /// # Errors
    ///
    /// Fails on transport or upstream errors.
    async fn update_enrolment_status(
        &self,
        link_id: &str,
        status: EnrolmentStatus,
    ) -> Result<(), DynamicsError>;

    /// # Errors
    ///
    /// Fails on transport or upstream errors.
    async fn deactivate_enrolment(&self, link_id: &str) -> Result<(), DynamicsError>;

    /// Build the role views from the `roles` / `roleMappings` claims of an identity token.
    fn aggregate_authz_claims(&self, roles: &[String], role_mappings: &[String]) -> RoleIndex;
}
