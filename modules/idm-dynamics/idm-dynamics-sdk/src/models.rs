//! Public data models for the idm-dynamics module.

use chrono::{DateTime, Utc};
use idm_odata::TextMatch;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Identity-provider subject (B2C object id).
    pub sub: Option<String>,
    pub dynamics_contact_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub telephone_number: Option<String>,
    /// The CRM holds a single number; it is reported under both fields.
    pub mobile_number: Option<String>,
    pub terms_accepted_version: Option<i64>,
    pub terms_accepted_on: Option<DateTime<Utc>>,
}

/// How to find contacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactFilter {
    Email(TextMatch),
    B2cObjectId(String),
}

impl ContactFilter {
    pub fn email(address: impl Into<String>) -> Self {
        Self::Email(TextMatch::exact(address))
    }

    pub fn b2c_object_id(id: impl Into<String>) -> Self {
        Self::B2cObjectId(id.into())
    }
}

/// A connection between a contact and an organisation in a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactAccountLink {
    pub connection_id: String,
    pub connection_details_id: Option<String>,
    pub account_id: Option<String>,
    pub role_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    pub account_name: Option<String>,
}

/// A role a service can grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRole {
    pub id: String,
    pub name: Option<String>,
}

/// A service-user link: a contact enrolled in a service for an organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrolment {
    pub link_id: String,
    pub contact_id: Option<String>,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub service_id: Option<String>,
    pub service_role_id: Option<String>,
    pub service_role_name: Option<String>,
    pub enrolment_status: Option<i64>,
    pub enrolment_status_name: Option<String>,
    /// Signup still in progress: the link names the service but has no role yet.
    pub is_handshake: bool,
}

/// Which enrolments to read. Empty lists are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrolmentFilter {
    pub contact_ids: Vec<String>,
    pub service_role_ids: Vec<String>,
    pub account_ids: Vec<String>,
    pub link_ids: Vec<String>,
    pub service_ids: Vec<String>,
    /// Add `( service-role in .. or service in .. )`, so handshake links are
    /// found alongside fully assigned ones. Without it `service_role_ids`
    /// and `service_ids` are ignored.
    pub include_all_service_records: bool,
}

impl EnrolmentFilter {
    pub fn for_contact(contact_id: impl Into<String>) -> Self {
        Self {
            contact_ids: vec![contact_id.into()],
            ..Self::default()
        }
    }
}

/// A request to join an organisation's enrolment for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolmentRequest {
    pub enrolment_request_id: String,
    pub service_id: Option<String>,
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub connection_details_id: Option<String>,
    pub status: Option<i64>,
    pub state: Option<i64>,
}

/// Enrolment status option-set values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrolmentStatus {
    Incomplete,
    Pending,
    CompleteApproved,
    CompleteRejected,
}

impl EnrolmentStatus {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Incomplete => 1,
            Self::Pending => 2,
            Self::CompleteApproved => 3,
            Self::CompleteRejected => 4,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Incomplete),
            2 => Some(Self::Pending),
            3 => Some(Self::CompleteApproved),
            4 => Some(Self::CompleteRejected),
            _ => None,
        }
    }
}

/// Role claims of one service, in the form carried by identity tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEnrolment {
    /// `org:role:status`, deduplicated in first-seen order.
    pub roles: Vec<String>,
    /// `id:name` for every org, role and status mentioned in `roles`.
    pub mappings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

impl NamedRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One role held at one organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg45: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg46: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolment: Option<NamedRef>,
    pub status: NamedRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRoles {
    pub organisation: NamedRef,
    /// Keyed by role id.
    pub roles: IndexMap<String, RoleView>,
}

/// A fully denormalised role entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg45: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg46: Option<String>,
    pub role_id: String,
    pub role_name: String,
    pub org_id: String,
    pub org_name: String,
    #[serde(rename = "orgRoleStatusIdNumber")]
    pub org_role_status_id: String,
    pub org_role_status_name: String,
}

/// Four views over the same deduplicated role set.
///
/// Every role present in one view is present in the others with the same
/// values. Maps iterate in first-seen claim order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleIndex {
    /// org id -> organisation and its roles
    pub roles_by_org: IndexMap<String, OrgRoles>,
    /// status id -> org id -> organisation and its roles in that status
    pub roles_by_status: IndexMap<String, IndexMap<String, OrgRoles>>,
    /// role id -> org id -> role
    pub roles_by_role: IndexMap<String, IndexMap<String, RoleView>>,
    pub flat: Vec<FlatRole>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_enrolment_status_codes() {
        for status in [
            EnrolmentStatus::Incomplete,
            EnrolmentStatus::Pending,
            EnrolmentStatus::CompleteApproved,
            EnrolmentStatus::CompleteRejected,
        ] {
            assert_eq!(EnrolmentStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(EnrolmentStatus::CompleteApproved.code(), 3);
        assert_eq!(EnrolmentStatus::from_code(9), None);
    }

    #[test]
    fn test_flat_role_omits_absent_enrolment_fields() {
        let role = FlatRole {
            enrolment_id: None,
            enrolment_name: None,
            gpg45: None,
            gpg46: None,
            role_id: "r1".to_owned(),
            role_name: "Admin".to_owned(),
            org_id: "o1".to_owned(),
            org_name: "Acme".to_owned(),
            org_role_status_id: "3".to_owned(),
            org_role_status_name: "Complete".to_owned(),
        };
        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "roleId": "r1",
                "roleName": "Admin",
                "orgId": "o1",
                "orgName": "Acme",
                "orgRoleStatusIdNumber": "3",
                "orgRoleStatusName": "Complete"
            })
        );
    }
}
