//! Query records and the id-list chunker.
//!
//! The upstream rejects filters with too many alternatives, so operations
//! that take id lists split their query on one field into several copies,
//! each carrying at most [`MAX_BATCH_SIZE`] ids.

use indexmap::IndexMap;

use crate::filter::FilterValue;

/// Upper bound on ids per request.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    Single(FilterValue),
    List(Vec<FilterValue>),
    Flag(bool),
}

/// Named query inputs in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    fields: IndexMap<String, QueryValue>,
}

/// The result of [`chunk_query`]; never empty.
pub type ChunkedQuery = Vec<Query>;

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: QueryValue) -> Self {
        self.insert(field, value);
        self
    }

    #[must_use]
    pub fn with_opt(self, field: impl Into<String>, value: Option<QueryValue>) -> Self {
        match value {
            Some(value) => self.with(field, value),
            None => self,
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: QueryValue) {
        self.fields.insert(field.into(), value);
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&QueryValue> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn single(&self, field: &str) -> Option<&FilterValue> {
        match self.fields.get(field) {
            Some(QueryValue::Single(value)) => Some(value),
            _ => None,
        }
    }

    /// The list under `field`, empty when absent or not a list.
    #[must_use]
    pub fn list(&self, field: &str) -> &[FilterValue] {
        match self.fields.get(field) {
            Some(QueryValue::List(values)) => values,
            _ => &[],
        }
    }

    #[must_use]
    pub fn flag(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(QueryValue::Flag(true)))
    }
}

/// Split `query` into copies whose `field` list holds at most `size` ids.
///
/// `size` is clamped to `1..=MAX_BATCH_SIZE`. When `field` is absent, not a
/// list, or already short enough, the result is the original query alone.
/// Other fields are copied unchanged into every chunk, and chunk order
/// follows the original id order.
#[must_use]
pub fn chunk_query(query: &Query, field: &str, size: usize) -> ChunkedQuery {
    let size = size.clamp(1, MAX_BATCH_SIZE);
    let values = match query.get(field) {
        Some(QueryValue::List(values)) if values.len() > size => values,
        _ => return vec![query.clone()],
    };

    values
        .chunks(size)
        .map(|chunk| {
            let mut copy = query.clone();
            copy.insert(field, QueryValue::List(chunk.to_vec()));
            copy
        })
        .collect()
}
