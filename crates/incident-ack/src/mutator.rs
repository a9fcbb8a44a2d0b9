//! # Batch Mutator
//!
//! Sends acknowledge/resolve calls in fixed-size, order-preserving chunks.
//! A failed chunk is counted and the loop moves on; only errors that make
//! every further call pointless (rejected credential, missing tool) stop
//! the loop, and even then the counts gathered so far are returned.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::Action;
use crate::error::Error;
use crate::models::{BatchResult, MutateIncidentsResponse};
use crate::transport::{RpcMethod, Transport};

/// Outcome of one chunk, reported to the progress callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based batch number
    pub number: usize,
    pub batches: usize,
    pub size: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub error: Option<String>,
}

/// Counts for a mutation run, plus the error that stopped it early.
///
/// When `aborted` is set, every id that was not confirmed by the server
/// (the failing chunk and everything after it) is counted as failed.
#[derive(Debug, Default)]
pub struct MutationReport {
    pub result: BatchResult,
    pub aborted: Option<Error>,
}

/// Number of batches needed for `len` ids.
#[must_use]
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

/// Consecutive chunks of at most `batch_size` ids, in input order.
pub fn partition(ids: &[String], batch_size: usize) -> std::slice::Chunks<'_, String> {
    ids.chunks(batch_size.max(1))
}

/// Request body for a mutating call.
#[must_use]
pub fn mutate_request(ids: &[String], assign_to: Option<&str>) -> Value {
    let mut request = json!({ "incident_ids": ids });
    if let Some(assignee) = assign_to {
        request["assigned_to"] = json!({ "user_id": assignee });
    }
    request
}

/// Applies one action to many incidents through a [`Transport`].
pub struct BatchMutator<'a, T: ?Sized> {
    transport: &'a T,
    batch_size: usize,
}

impl<'a, T: Transport + ?Sized> BatchMutator<'a, T> {
    pub fn new(transport: &'a T, batch_size: usize) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
        }
    }

    /// Mutate `ids` batch by batch, calling `on_batch` after each one.
    ///
    /// Duplicate ids are sent as given. Stops early only for errors where
    /// [`Error::is_fatal_during_mutation`] holds.
    pub async fn mutate<F>(
        &self,
        action: Action,
        ids: &[String],
        assign_to: Option<&str>,
        mut on_batch: F,
    ) -> MutationReport
    where
        F: FnMut(&BatchProgress),
    {
        let method = RpcMethod::for_action(action);
        let batches = batch_count(ids.len(), self.batch_size);
        let mut result = BatchResult::default();

        for (index, chunk) in partition(ids, self.batch_size).enumerate() {
            let number = index + 1;
            debug!(%method, batch = number, batches, size = chunk.len(), "Sending batch");

            let progress = match self
                .transport
                .invoke(method, mutate_request(chunk, assign_to))
                .await
            {
                Ok(response) => {
                    let failed = rejected_in_chunk(&response, chunk);
                    let succeeded = chunk.len() - failed;
                    result.record_success(succeeded);
                    result.record_failure(failed);
                    if failed > 0 {
                        warn!(batch = number, failed, "Server rejected part of the batch");
                    }
                    BatchProgress {
                        number,
                        batches,
                        size: chunk.len(),
                        succeeded,
                        failed,
                        error: None,
                    }
                }
                Err(e) if e.is_fatal_during_mutation() => {
                    let unsent = ids.len() - result.total;
                    result.record_failure(unsent);
                    error!(
                        batch = number,
                        batches,
                        succeeded = result.succeeded,
                        unsent,
                        error = %e,
                        "Aborting remaining batches"
                    );
                    on_batch(&BatchProgress {
                        number,
                        batches,
                        size: chunk.len(),
                        succeeded: 0,
                        failed: chunk.len(),
                        error: Some(e.to_string()),
                    });
                    return MutationReport {
                        result,
                        aborted: Some(e),
                    };
                }
                Err(e) => {
                    warn!(batch = number, size = chunk.len(), error = %e, "Batch failed");
                    result.record_failure(chunk.len());
                    BatchProgress {
                        number,
                        batches,
                        size: chunk.len(),
                        succeeded: 0,
                        failed: chunk.len(),
                        error: Some(e.to_string()),
                    }
                }
            };
            on_batch(&progress);
        }

        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            total = result.total,
            "Batches complete"
        );
        MutationReport {
            result,
            aborted: None,
        }
    }
}

/// How many ids of `chunk` the response lists as failed.
///
/// A response whose shape cannot be read is logged and treated as
/// listing no failures, since the call itself succeeded.
fn rejected_in_chunk(response: &Value, chunk: &[String]) -> usize {
    let parsed = match MutateIncidentsResponse::deserialize(response) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Could not read failedIds from mutate response");
            return 0;
        }
    };
    if parsed.failed_ids.is_empty() {
        return 0;
    }
    chunk
        .iter()
        .filter(|id| parsed.failed_ids.contains(id))
        .count()
}
