//! Raw CRM rows to typed records.
//!
//! Vendor field names appear only here and in the `$select` lists below.

use chrono::{DateTime, Utc};
use idm_dynamics_sdk::{
    Account, Contact, ContactAccountLink, Enrolment, EnrolmentRequest, ServiceRole,
};
use serde_json::Value;

use super::error::DomainError;
use super::mappings::FORMATTED_VALUE;

pub const CONTACT_FIELDS: &[&str] = &[
    "contactid",
    "defra_b2cobjectid",
    "firstname",
    "lastname",
    "emailaddress1",
    "telephone1",
    "defra_tacsacceptedversion",
    "defra_tacsacceptedon",
];

pub const CONNECTION_FIELDS: &[&str] = &[
    "connectionid",
    "_defra_connectiondetailsid_value",
    "_record2id_value",
    "_record1roleid_value",
];

pub const ACCOUNT_FIELDS: &[&str] = &["accountid", "name"];

pub const ENROLMENT_REQUEST_FIELDS: &[&str] = &[
    "defra_lobserviceuserlinkrequestid",
    "_defra_service_value",
    "_defra_organisation_value",
    "_defra_serviceuser_value",
    "_defra_connectiondetail_value",
    "statuscode",
    "statecode",
];

/// The `value` array of a collection response.
///
/// # Errors
///
/// [`DomainError::UnexpectedShape`] when `value` is missing or not an array.
pub fn collection<'a>(
    payload: &'a Value,
    operation: &'static str,
) -> Result<&'a [Value], DomainError> {
    payload
        .get("value")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| DomainError::shape(operation))
}

/// Rows of a response that may be a collection or a single entity.
#[must_use]
pub fn rows(payload: &Value) -> Vec<&Value> {
    match payload.get("value").and_then(Value::as_array) {
        Some(rows) => rows.iter().collect(),
        None => vec![payload],
    }
}

fn text(row: &Value, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An integer given either as a JSON number or a numeric string.
fn optional_int(row: &Value, field: &str) -> Option<i64> {
    match row.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(row: &Value, field: &str) -> Option<DateTime<Utc>> {
    let raw = row.get(field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Display name the CRM attaches to a lookup or option-set field.
fn formatted(row: &Value, field: &str) -> Option<String> {
    text(row, &format!("{field}{FORMATTED_VALUE}"))
}

#[must_use]
pub fn contact(row: &Value) -> Contact {
    let telephone = text(row, "telephone1");
    Contact {
        sub: text(row, "defra_b2cobjectid"),
        dynamics_contact_id: text(row, "contactid").unwrap_or_default(),
        first_name: text(row, "firstname"),
        last_name: text(row, "lastname"),
        email: text(row, "emailaddress1"),
        mobile_number: telephone.clone(),
        telephone_number: telephone,
        terms_accepted_version: optional_int(row, "defra_tacsacceptedversion"),
        terms_accepted_on: timestamp(row, "defra_tacsacceptedon"),
    }
}

#[must_use]
pub fn contact_account_link(row: &Value) -> ContactAccountLink {
    ContactAccountLink {
        connection_id: text(row, "connectionid").unwrap_or_default(),
        connection_details_id: text(row, "_defra_connectiondetailsid_value"),
        account_id: text(row, "_record2id_value"),
        role_id: text(row, "_record1roleid_value"),
    }
}

#[must_use]
pub fn account(row: &Value) -> Account {
    Account {
        account_id: text(row, "accountid").unwrap_or_default(),
        account_name: text(row, "name"),
    }
}

#[must_use]
pub fn service_role(row: &Value) -> ServiceRole {
    ServiceRole {
        id: text(row, "defra_lobserivceroleid").unwrap_or_default(),
        name: text(row, "defra_name"),
    }
}

#[must_use]
pub fn enrolment(row: &Value) -> Enrolment {
    Enrolment {
        link_id: text(row, "defra_lobserviceuserlinkid").unwrap_or_default(),
        contact_id: text(row, "_defra_serviceuser_value"),
        account_id: text(row, "_defra_organisation_value"),
        account_name: formatted(row, "_defra_organisation_value"),
        service_id: text(row, "_defra_service_value"),
        service_role_id: text(row, "_defra_servicerole_value"),
        service_role_name: formatted(row, "_defra_servicerole_value"),
        enrolment_status: optional_int(row, "defra_enrolmentstatus"),
        enrolment_status_name: formatted(row, "defra_enrolmentstatus"),
        is_handshake: row
            .get("defra_ishandshake")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

#[must_use]
pub fn enrolment_request(row: &Value) -> EnrolmentRequest {
    EnrolmentRequest {
        enrolment_request_id: text(row, "defra_lobserviceuserlinkrequestid").unwrap_or_default(),
        service_id: text(row, "_defra_service_value"),
        account_id: text(row, "_defra_organisation_value"),
        contact_id: text(row, "_defra_serviceuser_value"),
        connection_details_id: text(row, "_defra_connectiondetail_value"),
        status: optional_int(row, "statuscode"),
        state: optional_int(row, "statecode"),
    }
}
