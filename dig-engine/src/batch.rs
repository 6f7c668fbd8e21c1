//! JSON-lines batch runner
//!
//! Input: one request per line
//! ```json
//! {"uid": "42", "person": {"email": "jane@acme.com", "name": "Jane Smith"}}
//! ```
//! Output: one response per valid request, in completion order
//! ```json
//! {"uid": "42", "status": true, "person": {"email": "jane@acme.com", ...}}
//! ```
//! `status` is true when the record was modified; `person` is null when
//! nothing new was learned. A session interrupted by shutdown carries
//! `"cancelled": true` and its partial record only if it changed.
//! Malformed lines are logged and skipped.
//!
//! Requests are enriched as they are read and each response is flushed as
//! soon as its session ends, so a long-lived input pipe gets answers
//! without waiting for end of input.

use crate::error::EngineError;
use crate::orchestrator::{Orchestrator, SessionOutcome};
use crate::record::Record;
use async_stream::stream;
use dig_common::{Error, Result};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// One record to enrich
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRequest {
    /// Caller-chosen identifier echoed in the response
    pub uid: String,
    pub person: Record,
}

/// Result for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonResponse {
    pub uid: String,
    /// Whether the record was modified
    pub status: bool,
    pub person: Option<Record>,
    /// Session stopped by shutdown before reaching a fixed point
    #[serde(default, skip_serializing_if = "is_false")]
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PersonResponse {
    /// Build the response line for one finished session
    pub fn from_outcome(
        uid: String,
        outcome: std::result::Result<SessionOutcome, EngineError>,
    ) -> Self {
        match outcome {
            Ok(outcome) => {
                let cancelled = matches!(outcome, SessionOutcome::Cancelled { .. });
                let (status, person) = outcome.into_parts();
                Self {
                    uid,
                    status,
                    person,
                    cancelled,
                    error: None,
                }
            }
            Err(e) => Self {
                uid,
                status: false,
                person: None,
                cancelled: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Counters for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub received: usize,
    pub malformed: usize,
    pub enriched: usize,
    pub opted_out: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn count(&mut self, outcome: &std::result::Result<SessionOutcome, EngineError>) {
        match outcome {
            Ok(outcome) => {
                if outcome.modified() {
                    self.enriched += 1;
                }
                match outcome {
                    SessionOutcome::OptedOut(_) => self.opted_out += 1,
                    SessionOutcome::Cancelled { .. } => self.cancelled += 1,
                    _ => {}
                }
            }
            Err(_) => self.failed += 1,
        }
    }
}

/// Parse one input line
pub fn parse_request(line: &str) -> Result<PersonRequest> {
    serde_json::from_str(line).map_err(|e| Error::InvalidInput(format!("Malformed request: {}", e)))
}

/// Input-side counters, updated while the request stream is consumed
#[derive(Debug, Default)]
struct InputStats {
    received: AtomicUsize,
    malformed: AtomicUsize,
    read_error: Mutex<Option<std::io::Error>>,
}

/// Yield `(uid, person)` for each valid line until end of input or `cancel`
fn read_requests<R>(
    reader: R,
    stats: Arc<InputStats>,
    cancel: CancellationToken,
) -> impl Stream<Item = (String, Record)>
where
    R: AsyncBufRead + Unpin,
{
    stream! {
        let mut lines = reader.lines();
        let mut line_number = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(line = line_number, "Stopped reading batch input");
                    break;
                }
                next = lines.next_line() => next,
            };

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!(line = line_number + 1, error = %e, "Failed to read batch input");
                    *stats.read_error.lock().await = Some(e);
                    break;
                }
            };
            line_number += 1;

            if line.trim().is_empty() {
                continue;
            }
            match parse_request(&line) {
                Ok(request) => {
                    stats.received.fetch_add(1, Ordering::Relaxed);
                    yield (request.uid, request.person);
                }
                Err(e) => {
                    warn!(line = line_number, error = %e, "Skipping input line");
                    stats.malformed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

/// Enrich every request read from `reader`, writing responses to `writer`
///
/// Returns the I/O error that ended the input early, if any, after every
/// session already started has been answered.
pub async fn run_batch<R, W>(
    orchestrator: &Orchestrator,
    reader: R,
    mut writer: W,
    cancel: CancellationToken,
) -> Result<BatchSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let stats = Arc::new(InputStats::default());
    let requests = read_requests(reader, Arc::clone(&stats), cancel.clone());
    let mut results = Box::pin(orchestrator.process_stream(requests, cancel));

    let mut summary = BatchSummary::default();
    while let Some((uid, outcome)) = results.next().await {
        summary.count(&outcome);
        let response = PersonResponse::from_outcome(uid, outcome);

        let mut line = serde_json::to_string(&response)
            .map_err(|e| Error::Internal(format!("Serialize response failed: {}", e)))?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }

    summary.received = stats.received.load(Ordering::Relaxed);
    summary.malformed = stats.malformed.load(Ordering::Relaxed);

    info!(
        received = summary.received,
        malformed = summary.malformed,
        enriched = summary.enriched,
        opted_out = summary.opted_out,
        cancelled = summary.cancelled,
        failed = summary.failed,
        "Batch complete"
    );

    if let Some(e) = stats.read_error.lock().await.take() {
        return Err(Error::Io(e));
    }
    Ok(summary)
}
