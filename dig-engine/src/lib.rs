//! dig-engine: enrichment orchestration for sparse contact records
//!
//! A record is a sparse map of fields. Enrichers are registered on trigger
//! fields; whenever a trigger field has a value the orchestrator hands the
//! record to its enrichers, merges what they find under each field's
//! cardinality and each enricher's write policy, and repeats for every
//! trigger field that changed until nothing new is learned.
//!
//! # Modules
//! - `schema`: field table (cardinality, value kind, declaration order)
//! - `record`: `Record` and `FieldValue`
//! - `enricher`: the `Enricher` trait and its input/output types
//! - `catalog`: enricher registrations per trigger field
//! - `merge`: merge decisions and equivalence suppression
//! - `orchestrator`: fixed-point sessions, cancellation, bulk processing
//! - `enrichers`: built-in enrichers and the default catalog
//! - `batch`: JSON-lines batch runner used by the binary

pub mod batch;
pub mod catalog;
pub mod enricher;
pub mod enrichers;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod record;
pub mod schema;

pub use catalog::{CatalogBuilder, EnricherCatalog, EnricherId, WriteMode, WritePolicy};
pub use enricher::{enricher_fn, Enricher, EnricherInput, Enrichment, Findings, Parameters};
pub use error::{CatalogError, EngineError, EnricherError, SchemaViolation};
pub use merge::{MergeEngine, MergeOutcome, SuppressionRule};
pub use orchestrator::{
    BulkItem, Orchestrator, OrchestratorConfig, SessionOutcome, SessionReport,
};
pub use record::{FieldValue, Record};
pub use schema::{Cardinality, SchemaRegistry, ValueKind};
