use idm_dynamics_sdk::DynamicsError;
use idm_http::HttpError;
use idm_odata::ODataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Filter(#[from] ODataError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("{operation} response has unrecognised JSON")]
    UnexpectedShape { operation: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DomainError {
    pub(crate) fn shape(operation: &'static str) -> Self {
        Self::UnexpectedShape { operation }
    }
}

impl From<DomainError> for DynamicsError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Filter(e) => DynamicsError::InvalidFilter(e.to_string()),
            DomainError::Http(
                e @ (HttpError::Upstream { .. }
                | HttpError::MalformedPayload { .. }
                | HttpError::BodyTooLarge { .. }),
            ) => DynamicsError::Upstream(e.to_string()),
            DomainError::Http(
                e @ (HttpError::Transport(_)
                | HttpError::Timeout(_)
                | HttpError::RetryExhausted { .. }
                | HttpError::NoResponse { .. }
                | HttpError::Token(_)
                | HttpError::Tls(_)),
            ) => DynamicsError::Unavailable(e.to_string()),
            DomainError::Http(e) => DynamicsError::Internal(e.to_string()),
            DomainError::UnexpectedShape { operation } => DynamicsError::UnexpectedShape {
                operation: operation.to_owned(),
            },
            DomainError::Config(msg) => DynamicsError::Internal(msg),
        }
    }
}
