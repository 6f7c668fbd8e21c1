//! Enrichment Orchestrator
//!
//! Drives one record to a fixed point: every trigger field present in the
//! record is offered to its enrichers in catalog order, merged results that
//! change a trigger field put that field back on the worklist, and the
//! session ends when the worklist is empty or the subject opts out.
//!
//! # Session states
//! ```text
//! WORKLIST-NONEMPTY → PROCESSING_FIELD → PROCESSING_ENRICHER ─┐
//!        ↑                                                   │
//!        └───────────────────────────────────────────────────┘
//! terminal: DONE | OPTED_OUT | CANCELLED
//! ```
//!
//! Enricher invocations are the only suspension points. Within a field the
//! enrichers run strictly one after another; across records (`process_many`)
//! sessions run as independent tokio tasks.
//!
//! # Example
//! ```rust,ignore
//! let catalog = Arc::new(enrichers::default_catalog(&config.enrichers)?);
//! let orchestrator = Orchestrator::with_config(catalog, OrchestratorConfig::from(&config.engine));
//!
//! let (modified, record) = orchestrator
//!     .process(Record::new().with("email", "jane@acme.com"))
//!     .await
//!     .into_parts();
//! ```

mod bulk;
mod ledger;
mod session;

pub use bulk::BulkItem;
pub use ledger::MemoLedger;

use crate::catalog::EnricherCatalog;
use crate::error::SchemaViolation;
use crate::merge::{MergeEngine, MergeOutcome};
use crate::record::{FieldValue, Record};
use dig_common::config::EngineSettings;
use session::Session;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Runtime limits of the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound for one enricher invocation; `None` waits indefinitely
    pub enricher_timeout: Option<Duration>,
    /// Sessions running at once in `process_many`
    pub max_concurrent_sessions: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for OrchestratorConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            enricher_timeout: Some(settings.enricher_timeout()),
            max_concurrent_sessions: settings.max_concurrent_sessions.max(1),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// At least one field was added or updated
    Enriched(Record),
    /// Nothing new was learned
    NothingNew,
    /// The subject opted out; only the redacted record is returned
    OptedOut(Record),
    /// Cancelled; `record` is the state after the last completed merge
    Cancelled { modified: bool, record: Record },
}

impl SessionOutcome {
    /// Whether the record gained or changed a field
    pub fn modified(&self) -> bool {
        match self {
            SessionOutcome::Enriched(_) => true,
            SessionOutcome::NothingNew | SessionOutcome::OptedOut(_) => false,
            SessionOutcome::Cancelled { modified, .. } => *modified,
        }
    }

    pub fn is_opted_out(&self) -> bool {
        matches!(self, SessionOutcome::OptedOut(_))
    }

    /// Resulting record, if any
    pub fn record(&self) -> Option<&Record> {
        match self {
            SessionOutcome::Enriched(record)
            | SessionOutcome::OptedOut(record)
            | SessionOutcome::Cancelled { record, .. } => Some(record),
            SessionOutcome::NothingNew => None,
        }
    }

    /// `(modified, record)`; the record is absent when nothing was learned
    ///
    /// A cancelled session reports its partial record only if it changed.
    pub fn into_parts(self) -> (bool, Option<Record>) {
        match self {
            SessionOutcome::Enriched(record) => (true, Some(record)),
            SessionOutcome::NothingNew => (false, None),
            SessionOutcome::OptedOut(record) => (false, Some(record)),
            SessionOutcome::Cancelled {
                modified: true,
                record,
            } => (true, Some(record)),
            SessionOutcome::Cancelled { modified: false, .. } => (false, None),
        }
    }
}

/// One merge decision taken during a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    pub enricher: String,
    pub trigger: String,
    pub field: String,
    pub value: FieldValue,
    pub outcome: MergeOutcome,
}

/// An enricher invocation that produced no usable result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnricherFailure {
    pub enricher: String,
    pub trigger: String,
    pub error: String,
}

/// A value rejected by the schema
///
/// `enricher` is `None` for seed fields of the input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    pub enricher: Option<String>,
    pub violation: SchemaViolation,
}

/// Full trace of one session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub outcome: SessionOutcome,
    /// Merge decisions in the order they were taken
    pub merges: Vec<MergeRecord>,
    pub failures: Vec<EnricherFailure>,
    pub violations: Vec<ViolationRecord>,
    /// Enricher invocations performed
    pub invocations: usize,
    /// Worklist fields processed
    pub rounds: usize,
}

impl SessionReport {
    /// Merge decisions that changed the record
    pub fn writes(&self) -> impl Iterator<Item = &MergeRecord> {
        self.merges.iter().filter(|m| m.outcome.is_write())
    }
}

/// Enrichment orchestrator
///
/// Cheap to clone: the catalog and schema are shared.
#[derive(Clone)]
pub struct Orchestrator {
    catalog: Arc<EnricherCatalog>,
    merge: MergeEngine,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Orchestrator with default limits
    pub fn new(catalog: Arc<EnricherCatalog>) -> Self {
        Self::with_config(catalog, OrchestratorConfig::default())
    }

    pub fn with_config(catalog: Arc<EnricherCatalog>, config: OrchestratorConfig) -> Self {
        let merge = MergeEngine::new(Arc::clone(catalog.schema()));
        Self {
            catalog,
            merge,
            config,
        }
    }

    /// Replace the merge engine (custom suppression rules)
    pub fn with_merge_engine(mut self, merge: MergeEngine) -> Self {
        self.merge = merge;
        self
    }

    pub fn catalog(&self) -> &Arc<EnricherCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Enrich one record to a fixed point
    pub async fn process(&self, record: Record) -> SessionOutcome {
        self.process_report(record, &CancellationToken::new())
            .await
            .outcome
    }

    /// Enrich one record, stopping early when `cancel` fires
    pub async fn process_with_cancel(
        &self,
        record: Record,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        self.process_report(record, cancel).await.outcome
    }

    /// Enrich one record and return the full session trace
    pub async fn process_report(&self, record: Record, cancel: &CancellationToken) -> SessionReport {
        Session::new(&self.catalog, &self.merge, self.config.enricher_timeout, record)
            .run(cancel)
            .await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("catalog", &self.catalog)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_parts() {
        let record = Record::new().with("email", "a@b.com");

        assert_eq!(
            SessionOutcome::Enriched(record.clone()).into_parts(),
            (true, Some(record.clone()))
        );
        assert_eq!(SessionOutcome::NothingNew.into_parts(), (false, None));
        assert_eq!(
            SessionOutcome::OptedOut(Record::redacted()).into_parts(),
            (false, Some(Record::redacted()))
        );
        let cancelled = SessionOutcome::Cancelled {
            modified: true,
            record: record.clone(),
        };
        assert!(cancelled.modified());
        assert_eq!(cancelled.into_parts(), (true, Some(record.clone())));

        let untouched = SessionOutcome::Cancelled {
            modified: false,
            record,
        };
        assert!(!untouched.modified());
        assert_eq!(untouched.into_parts(), (false, None));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = EngineSettings {
            enricher_timeout_ms: 250,
            max_concurrent_sessions: 4,
        };
        let config = OrchestratorConfig::from(&settings);
        assert_eq!(config.enricher_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.max_concurrent_sessions, 4);
    }
}
