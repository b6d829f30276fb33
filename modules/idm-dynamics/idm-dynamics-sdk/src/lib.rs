//! idm-dynamics SDK
//!
//! Public surface of the `idm-dynamics` module:
//!
//! - [`DynamicsClient`] - API trait for consumers
//! - [`Contact`], [`ContactAccountLink`], [`Account`], [`ServiceRole`],
//!   [`Enrolment`], [`EnrolmentRequest`] - typed entity records
//! - [`RoleIndex`] - aggregated authorization views
//! - [`DynamicsError`] - error type
//!
//! ## Usage
//!
//! ```ignore
//! use idm_dynamics_sdk::{ContactFilter, DynamicsClient};
//!
//! let contacts = client
//!     .read_contacts(&ContactFilter::b2c_object_id(sub))
//!     .await?;
//!
//! let enrolment = client
//!     .read_service_enrolment(service_id, &contacts[0].dynamics_contact_id, false)
//!     .await?;
//! let index = client.aggregate_authz_claims(&enrolment.roles, &enrolment.mappings);
//! ```

pub mod api;
pub mod error;
pub mod models;

pub use api::DynamicsClient;
pub use error::DynamicsError;
pub use models::{
    Account, Contact, ContactAccountLink, ContactFilter, Enrolment, EnrolmentFilter,
    EnrolmentRequest, EnrolmentStatus, FlatRole, NamedRef, OrgRoles, RoleIndex, RoleView,
    ServiceEnrolment, ServiceRole,
};

pub use idm_odata::{MatchKind, TextMatch};
