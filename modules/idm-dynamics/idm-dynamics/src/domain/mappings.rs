//! Vendor option-set codes, well-known ids and entity names.

/// `statuscode` of a service-user link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceUserLinkStatus {
    Active,
    Inactive,
}

impl ServiceUserLinkStatus {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Active => 1,
            Self::Inactive => 2,
        }
    }
}

/// `statuscode` of an unspent enrolment request.
pub const ENROLMENT_REQUEST_UNSPENT: i64 = 1;

/// Connection role ids.
pub mod role_id {
    pub const EMPLOYEE: &str = "1eb54ab1-58b7-4d14-bf39-4f3e402616e8";
    pub const EMPLOYER: &str = "35a23b91-ec62-41ea-b5e5-c59b689ff0b4";
    pub const AGENT: &str = "caaf4df7-0229-e811-a831-000d3a2b29f8";
    pub const AGENT_CUSTOMER: &str = "776e1b5a-1268-e811-a83b-000d3ab4f7af";
    pub const CITIZEN: &str = "3fc7e717-0b90-e811-a845-000d3ab4fddf";

    /// Used for contact links when the caller names no roles.
    pub const DEFAULT_LINK_ROLES: [&str; 3] = [CITIZEN, EMPLOYEE, AGENT_CUSTOMER];
}

pub mod entity {
    pub const CONTACTS: &str = "/contacts";
    pub const CONNECTIONS: &str = "/connections";
    pub const ACCOUNTS: &str = "/accounts";
    // Entity set name as published by the CRM, misspelling included.
    pub const SERVICE_ROLES: &str = "/defra_lobserivceroles";
    pub const SERVICE_USER_LINKS: &str = "/defra_lobserviceuserlinks";
    pub const SERVICE_USER_LINK_REQUESTS: &str = "/defra_lobserviceuserlinkrequests";
}

pub mod action {
    pub const NAMESPACE: &str = "Microsoft.Dynamics.CRM";
    pub const UPDATE_ENROLMENT: &str = "defra_updateenrolment";
    pub const DELETE_ENROLMENT: &str = "defra_deleteenrolment";

    /// `/collection(<id>)/Namespace.action`
    #[must_use]
    pub fn path(collection: &str, id: &str, action: &str) -> String {
        format!("{collection}({id})/{NAMESPACE}.{action}")
    }
}

/// Suffix of the annotation carrying a lookup's or option set's display name.
pub const FORMATTED_VALUE: &str = "@OData.Community.Display.V1.FormattedValue";

/// Navigation property expanded on service-user link reads.
pub const EXPAND_SERVICE_ROLE: &str = "defra_ServiceRole";

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_action_path() {
        assert_eq!(
            action::path(entity::SERVICE_USER_LINKS, "l1", action::UPDATE_ENROLMENT),
            "/defra_lobserviceuserlinks(l1)/Microsoft.Dynamics.CRM.defra_updateenrolment"
        );
    }

    #[test]
    fn test_link_status_codes() {
        assert_eq!(ServiceUserLinkStatus::Active.code(), 1);
        assert_eq!(ServiceUserLinkStatus::Inactive.code(), 2);
    }
}
