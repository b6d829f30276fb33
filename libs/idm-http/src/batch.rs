use std::fmt::Display;
use std::future::Future;

use futures::future::try_join_all;
use idm_odata::{Query, chunk_query};
use serde_json::Value;

use crate::error::HttpError;
use crate::request::RequestDescriptor;
use crate::response::decode;
use crate::transport::Transport;

/// Splits `query` on `field`, runs one request per chunk concurrently, and
/// concatenates the parsed results.
///
/// Results come back in chunk order and, within a chunk, in the order
/// `parse_response` produced them, whichever request finishes first. The first
/// failing chunk fails the whole call and the remaining in-flight requests
/// are dropped.
///
/// # Errors
///
/// The first error from building, sending, decoding or parsing any chunk.
pub async fn execute_batched<T, R, E, B, BFut, P>(
    transport: &T,
    query: &Query,
    field: &str,
    batch_size: usize,
    build_request: B,
    parse_response: P,
) -> Result<Vec<R>, E>
where
    T: Transport + ?Sized,
    E: From<HttpError> + Display,
    B: Fn(Query) -> BFut,
    BFut: Future<Output = Result<RequestDescriptor, E>>,
    P: Fn(Value) -> Result<Vec<R>, E>,
{
    let chunks = chunk_query(query, field, batch_size);
    let chunk_count = chunks.len();
    tracing::debug!(field, chunks = chunk_count, "executing batched query");

    let build_request = &build_request;
    let parse_response = &parse_response;
    let calls = chunks.into_iter().map(|chunk| async move {
        let request = build_request(chunk).await?;
        let response = transport.send(&request).await?;
        let payload = decode(response)?;
        parse_response(payload)
    });

    let per_chunk = try_join_all(calls).await.inspect_err(|err| {
        tracing::warn!(field, chunks = chunk_count, error = %err, "batched query failed");
    })?;

    Ok(per_chunk.into_iter().flatten().collect())
}
