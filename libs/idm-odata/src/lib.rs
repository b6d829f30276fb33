#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `OData` query assembly for the Dynamics web API.
//!
//! Three layers, each usable on its own:
//!
//! - [`filter`]: typed clauses rendered into the vendor's `$filter` dialect
//! - [`query`]: an ordered query record and the id-list [`chunk_query`] splitter
//! - [`params`]: `$filter` / `$expand` / `$select` parameters and URL assembly

pub mod error;
pub mod filter;
pub mod params;
pub mod query;

pub use error::ODataError;
pub use filter::{Clause, FilterBuilder, FilterExpression, FilterValue, MatchKind, TextMatch};
pub use params::{ApiBase, QueryParams};
pub use query::{ChunkedQuery, MAX_BATCH_SIZE, Query, QueryValue, chunk_query};
