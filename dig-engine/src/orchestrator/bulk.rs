//! Bulk processing
//!
//! Runs one session per record as independent tokio tasks. Sessions share
//! only the catalog and schema; each owns its record and ledger. At most
//! `max_concurrent_sessions` sessions run at once, and further input is
//! pulled only when a slot frees up, so an unbounded input stream is
//! enriched without being buffered.

use super::{Orchestrator, SessionOutcome};
use crate::error::EngineError;
use crate::record::Record;
use async_stream::stream;
use futures::stream::{self, FuturesUnordered, Stream, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Result for one input of `process_many`
#[derive(Debug)]
pub struct BulkItem {
    /// Position of the record in the input
    pub index: usize,
    pub outcome: Result<SessionOutcome, EngineError>,
}

enum Step<T> {
    Finished((T, Result<SessionOutcome, EngineError>)),
    Arrived(T, Record),
    Exhausted,
}

impl Orchestrator {
    /// Enrich many records concurrently
    ///
    /// Yields exactly one item per input record, in completion order.
    /// Tasks are spawned when the stream is first polled.
    pub fn process_many<I>(&self, records: I) -> impl Stream<Item = BulkItem>
    where
        I: IntoIterator<Item = Record>,
    {
        self.process_many_with_cancel(records, CancellationToken::new())
    }

    /// Enrich many records, cancelling every session when `cancel` fires
    pub fn process_many_with_cancel<I>(
        &self,
        records: I,
        cancel: CancellationToken,
    ) -> impl Stream<Item = BulkItem>
    where
        I: IntoIterator<Item = Record>,
    {
        let inputs: Vec<(usize, Record)> = records.into_iter().enumerate().collect();
        self.process_stream(stream::iter(inputs), cancel)
            .map(|(index, outcome)| BulkItem { index, outcome })
    }

    /// Enrich records as they arrive on `inputs`
    ///
    /// Each record carries a caller tag that is handed back with its
    /// outcome. Results are yielded in completion order; the next input is
    /// polled only while fewer than `max_concurrent_sessions` sessions are
    /// running.
    pub fn process_stream<T, S>(
        &self,
        inputs: S,
        cancel: CancellationToken,
    ) -> impl Stream<Item = (T, Result<SessionOutcome, EngineError>)>
    where
        S: Stream<Item = (T, Record)>,
    {
        let orchestrator = self.clone();
        let limit = self.config.max_concurrent_sessions.max(1);

        stream! {
            debug!(max_concurrent = limit, "Starting bulk enrichment");

            let mut inputs = Box::pin(inputs);
            let mut running = FuturesUnordered::new();
            let mut exhausted = false;
            let mut started = 0usize;

            loop {
                let step = tokio::select! {
                    Some(done) = running.next(), if !running.is_empty() => Step::Finished(done),
                    next = inputs.next(), if !exhausted && running.len() < limit => match next {
                        Some((tag, record)) => Step::Arrived(tag, record),
                        None => Step::Exhausted,
                    },
                    else => break,
                };

                match step {
                    Step::Finished(done) => yield done,
                    Step::Arrived(tag, record) => {
                        started += 1;
                        running.push(spawn_session(&orchestrator, tag, record, cancel.child_token()));
                    }
                    Step::Exhausted => exhausted = true,
                }
            }

            debug!(sessions = started, "Bulk enrichment drained");
        }
    }
}

fn spawn_session<T>(
    orchestrator: &Orchestrator,
    tag: T,
    record: Record,
    cancel: CancellationToken,
) -> impl Future<Output = (T, Result<SessionOutcome, EngineError>)> {
    let orchestrator = orchestrator.clone();
    let handle =
        tokio::spawn(async move { orchestrator.process_with_cancel(record, &cancel).await });

    async move {
        let outcome = handle.await.map_err(|e| {
            error!(error = %e, "Session task failed");
            EngineError::TaskFailed(e.to_string())
        });
        (tag, outcome)
    }
}
