//! Error types for dig-engine
//!
//! - `CatalogError`: misconfiguration detected while building the schema or
//!   the enricher catalog (startup only)
//! - `SchemaViolation`: an enricher proposed a value that does not fit the
//!   field's declared cardinality or kind (field dropped, session continues)
//! - `EnricherError`: an enricher invocation failed (treated as no result)
//! - `EngineError`: a bulk session could not report a result

use std::time::Duration;
use thiserror::Error;

/// Catalog or schema misconfiguration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Field declared twice in the schema
    #[error("Field declared twice in schema: {0}")]
    DuplicateField(String),

    /// Enricher registered on a field missing from the schema
    #[error("Enricher '{enricher}' registered on undeclared trigger field '{field}'")]
    UndeclaredTrigger { enricher: String, field: String },

    /// Enricher parameter names a field missing from the schema
    #[error("Enricher '{enricher}' declares parameter '{field}' which is not a schema field")]
    UndeclaredParameter { enricher: String, field: String },

    /// Write policy names a field missing from the schema
    #[error("Enricher '{enricher}' write policy names undeclared field '{field}'")]
    UndeclaredOutput { enricher: String, field: String },

    /// Enricher could not be constructed
    #[error("Enricher '{enricher}' setup failed: {reason}")]
    EnricherSetup { enricher: String, reason: String },
}

/// Enricher output that cannot be coerced to the schema
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// Field is not part of the schema
    #[error("Field '{0}' is not declared in the schema")]
    UndeclaredField(String),

    /// Several values proposed for a single-valued field
    #[error("Field '{field}' takes a single value, got {count}")]
    CardinalityMismatch { field: String, count: usize },

    /// Value rejected by the field's kind check
    #[error("Field '{field}' expects {expected}, got '{value}'")]
    InvalidValue {
        field: String,
        expected: &'static str,
        value: String,
    },
}

/// Failure raised inside an enricher invocation
#[derive(Debug, Error)]
pub enum EnricherError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Invocation exceeded the configured timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Provider answered with something unusable
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Enricher panicked
    #[error("Enricher panicked: {0}")]
    Panicked(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure outside any single enricher
#[derive(Debug, Error)]
pub enum EngineError {
    /// Session task ended without producing an outcome
    #[error("Session task failed: {0}")]
    TaskFailed(String),
}
