//! Domain layer for idm-dynamics.

pub mod error;
pub mod local_client;
pub mod mappings;
pub mod projection;
pub mod roles;
pub mod service;

pub use error::DomainError;
pub use local_client::DynamicsLocalClient;
pub use service::Service;
