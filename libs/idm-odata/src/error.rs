use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ODataError {
    /// A filter predicate has a shape the builder cannot express.
    #[error("unsupported predicate for `{field}`: {reason}")]
    UnsupportedPredicate { field: String, reason: String },

    #[error("invalid API base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ODataError {
    pub(crate) fn unsupported(field: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedPredicate {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}
