//! Worklist loop of a single record session

use super::{
    EnricherFailure, MemoLedger, MergeRecord, SessionOutcome, SessionReport, ViolationRecord,
};
use crate::catalog::{EnricherCatalog, Registration};
use crate::enricher::{EnricherInput, Enrichment, Findings};
use crate::error::EnricherError;
use crate::merge::MergeEngine;
use crate::record::{FieldValue, Record};
use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Why the worklist loop stopped early
enum Stop {
    OptedOut,
    Cancelled,
}

/// State of one record's enrichment session
///
/// Owns the record and the ledger; discarded once the report is built.
pub(super) struct Session<'a> {
    id: Uuid,
    catalog: &'a EnricherCatalog,
    merge: &'a MergeEngine,
    timeout: Option<Duration>,
    record: Record,
    ledger: MemoLedger,
    modified: bool,
    merges: Vec<MergeRecord>,
    failures: Vec<EnricherFailure>,
    violations: Vec<ViolationRecord>,
    invocations: usize,
    rounds: usize,
}

impl<'a> Session<'a> {
    pub(super) fn new(
        catalog: &'a EnricherCatalog,
        merge: &'a MergeEngine,
        timeout: Option<Duration>,
        record: Record,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog,
            merge,
            timeout,
            record,
            ledger: MemoLedger::new(),
            modified: false,
            merges: Vec::new(),
            failures: Vec::new(),
            violations: Vec::new(),
            invocations: 0,
            rounds: 0,
        }
    }

    pub(super) async fn run(mut self, cancel: &CancellationToken) -> SessionReport {
        if self.record.is_opted_out() {
            info!(session_id = %self.id, "Seed record already opted out");
            return self.finish(Some(Stop::OptedOut));
        }

        self.normalize_seed();

        let mut worklist: VecDeque<String> = self
            .catalog
            .trigger_fields()
            .filter(|field| self.has_value(field))
            .map(str::to_string)
            .collect();

        debug!(
            session_id = %self.id,
            fields = self.record.len(),
            worklist = ?worklist,
            "Session started"
        );

        while let Some(field) = worklist.pop_front() {
            self.rounds += 1;

            let newly_written = match self.process_field(&field, cancel).await {
                Ok(written) => written,
                Err(stop) => return self.finish(Some(stop)),
            };

            for written in newly_written {
                if self.catalog.is_trigger(&written) && !worklist.contains(&written) {
                    debug!(session_id = %self.id, field = %written, "Field re-enqueued");
                    worklist.push_back(written);
                }
            }
        }

        self.finish(None)
    }

    /// Run every enricher of `field` once per distinct value of the field
    ///
    /// Returns the fields written, in first-write order.
    async fn process_field(
        &mut self,
        field: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, Stop> {
        let catalog = self.catalog;
        let mut newly_written: Vec<String> = Vec::new();

        for registration in catalog.enrichers_for(field) {
            let Some(current) = self.record.get(field).filter(|v| !v.is_empty()).cloned() else {
                break;
            };

            if !self.ledger.first_visit(registration.id(), field, &current) {
                debug!(
                    session_id = %self.id,
                    enricher = registration.name(),
                    field = field,
                    "Value already presented to enricher, skipping"
                );
                continue;
            }

            if cancel.is_cancelled() {
                return Err(Stop::Cancelled);
            }

            let input = registration.bind(&self.record);
            self.invocations += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = invoke(registration, input, self.timeout) => Some(result),
            };
            let Some(result) = result else {
                info!(
                    session_id = %self.id,
                    enricher = registration.name(),
                    field = field,
                    "Session cancelled during enricher invocation"
                );
                return Err(Stop::Cancelled);
            };

            match result {
                Ok(Enrichment::Found(findings)) => {
                    self.merge_findings(registration, field, findings, &mut newly_written);
                }
                Ok(Enrichment::NotFound) => {
                    debug!(
                        session_id = %self.id,
                        enricher = registration.name(),
                        field = field,
                        "Nothing found"
                    );
                }
                Ok(Enrichment::OptedOut) => {
                    info!(
                        session_id = %self.id,
                        enricher = registration.name(),
                        "Subject opted out, redacting record"
                    );
                    return Err(Stop::OptedOut);
                }
                Err(e) => {
                    warn!(
                        session_id = %self.id,
                        enricher = registration.name(),
                        field = field,
                        error = %e,
                        "Enricher failed (treated as no result)"
                    );
                    self.failures.push(EnricherFailure {
                        enricher: registration.name().to_string(),
                        trigger: field.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(newly_written)
    }

    fn merge_findings(
        &mut self,
        registration: &Registration,
        trigger: &str,
        findings: Findings,
        newly_written: &mut Vec<String>,
    ) {
        let catalog = self.catalog;
        let schema = catalog.schema();

        for (key, value) in findings {
            if value.is_empty() {
                continue;
            }

            let value = match schema.coerce(&key, value) {
                Ok(value) => value,
                Err(violation) => {
                    warn!(
                        session_id = %self.id,
                        enricher = registration.name(),
                        field = %key,
                        error = %violation,
                        "Dropped value rejected by schema"
                    );
                    self.violations.push(ViolationRecord {
                        enricher: Some(registration.name().to_string()),
                        violation,
                    });
                    continue;
                }
            };

            let outcome =
                self.merge
                    .apply(&mut self.record, &key, value.clone(), registration.policy());

            debug!(
                session_id = %self.id,
                enricher = registration.name(),
                field = %key,
                outcome = %outcome,
                "Merge decision"
            );

            if outcome.is_write() {
                self.modified = true;
                if !newly_written.contains(&key) {
                    newly_written.push(key.clone());
                }
            }

            self.merges.push(MergeRecord {
                enricher: registration.name().to_string(),
                trigger: trigger.to_string(),
                field: key,
                value,
                outcome,
            });
        }
    }

    /// Bring seed values to their declared cardinality
    ///
    /// Seed values that fail the schema are kept untouched and reported.
    /// Normalizing does not count as a modification.
    fn normalize_seed(&mut self) {
        let catalog = self.catalog;
        let schema = catalog.schema();
        let seeds: Vec<(String, FieldValue)> = self
            .record
            .iter()
            .filter(|(field, _)| schema.contains(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();

        for (field, value) in seeds {
            if value.is_empty() {
                continue;
            }
            match schema.coerce(&field, value) {
                Ok(normalized) => {
                    self.record.insert(field, normalized);
                }
                Err(violation) => {
                    warn!(
                        session_id = %self.id,
                        field = %field,
                        error = %violation,
                        "Seed value does not match schema, kept as is"
                    );
                    self.violations.push(ViolationRecord {
                        enricher: None,
                        violation,
                    });
                }
            }
        }
    }

    fn has_value(&self, field: &str) -> bool {
        self.record.get(field).is_some_and(|v| !v.is_empty())
    }

    fn finish(self, stop: Option<Stop>) -> SessionReport {
        let outcome = match stop {
            Some(Stop::OptedOut) => SessionOutcome::OptedOut(Record::redacted()),
            Some(Stop::Cancelled) => SessionOutcome::Cancelled {
                modified: self.modified,
                record: self.record,
            },
            None if self.modified => SessionOutcome::Enriched(self.record),
            None => SessionOutcome::NothingNew,
        };

        info!(
            session_id = %self.id,
            modified = outcome.modified(),
            opted_out = outcome.is_opted_out(),
            invocations = self.invocations,
            rounds = self.rounds,
            failures = self.failures.len(),
            "Session finished"
        );

        SessionReport {
            session_id: self.id,
            outcome,
            merges: self.merges,
            failures: self.failures,
            violations: self.violations,
            invocations: self.invocations,
            rounds: self.rounds,
        }
    }
}

/// Invoke one enricher with panic isolation and an optional time bound
async fn invoke(
    registration: &Registration,
    input: EnricherInput,
    timeout: Option<Duration>,
) -> Result<Enrichment, EnricherError> {
    let call = AssertUnwindSafe(registration.enricher().enrich(input)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(EnricherError::Timeout(limit)),
        },
        None => call.await,
    };

    outcome.unwrap_or_else(|panic| Err(EnricherError::Panicked(panic_message(panic.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
