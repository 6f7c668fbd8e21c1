//! Enricher Catalog
//!
//! Maps each trigger field to the ordered list of enrichers registered on
//! it. Registration order is execution order for that field.
//!
//! The catalog is assembled once with `CatalogBuilder` and frozen by
//! `build()`. Every misconfiguration (unknown trigger field, unknown
//! parameter, unknown output field) is reported at registration time.

use crate::enricher::{Enricher, EnricherInput, Parameters};
use crate::error::CatalogError;
use crate::record::Record;
use crate::schema::SchemaRegistry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Stable identity of a registration within a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnricherId(usize);

impl fmt::Display for EnricherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an enricher may write one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Only when the field is absent
    InsertOnly,
    /// Add or overwrite
    Update,
}

/// Fields an enricher may write, and how
///
/// With neither list declared the policy is catch-all: every field is
/// writable in update mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePolicy {
    insert: BTreeSet<String>,
    update: BTreeSet<String>,
}

impl WritePolicy {
    /// Every field, update mode
    pub fn catch_all() -> Self {
        Self::default()
    }

    /// Listed fields may only be added when absent
    pub fn insert_only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_insert(fields)
    }

    /// Listed fields may be added or overwritten
    pub fn update<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_update(fields)
    }

    /// Add insert-only fields
    pub fn with_insert<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add update fields
    pub fn with_update<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn is_catch_all(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty()
    }

    /// Write mode for `field`, `None` when the policy does not list it
    ///
    /// A field listed in both lists is writable in update mode.
    pub fn mode_for(&self, field: &str) -> Option<WriteMode> {
        if self.is_catch_all() || self.update.contains(field) {
            Some(WriteMode::Update)
        } else if self.insert.contains(field) {
            Some(WriteMode::InsertOnly)
        } else {
            None
        }
    }

    /// Every explicitly listed field
    pub fn listed_fields(&self) -> impl Iterator<Item = &str> {
        self.insert.iter().chain(self.update.iter()).map(String::as_str)
    }
}

/// One enricher bound to a trigger field
pub struct Registration {
    id: EnricherId,
    trigger: String,
    policy: WritePolicy,
    parameters: Parameters,
    enricher: Arc<dyn Enricher>,
}

impl Registration {
    pub fn id(&self) -> EnricherId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.enricher.name()
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn enricher(&self) -> &Arc<dyn Enricher> {
        &self.enricher
    }

    /// Assemble this enricher's input from the current record
    pub fn bind(&self, record: &Record) -> EnricherInput {
        self.parameters.bind(record)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("trigger", &self.trigger)
            .field("policy", &self.policy)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Mutable catalog under construction
pub struct CatalogBuilder {
    schema: Arc<SchemaRegistry>,
    by_trigger: HashMap<String, Vec<Registration>>,
    next_id: usize,
}

impl CatalogBuilder {
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self {
            schema,
            by_trigger: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register an enricher on a trigger field
    ///
    /// # Errors
    /// `CatalogError` when the trigger field, a declared parameter or a
    /// policy field is not declared in the schema
    pub fn register(
        &mut self,
        trigger: &str,
        policy: WritePolicy,
        parameters: Parameters,
        enricher: Arc<dyn Enricher>,
    ) -> Result<EnricherId, CatalogError> {
        let name = enricher.name().to_string();

        if !self.schema.contains(trigger) {
            return Err(CatalogError::UndeclaredTrigger {
                enricher: name,
                field: trigger.to_string(),
            });
        }

        if let Parameters::Fields(fields) = &parameters {
            if let Some(unknown) = fields.iter().find(|f| !self.schema.contains(f)) {
                return Err(CatalogError::UndeclaredParameter {
                    enricher: name,
                    field: unknown.clone(),
                });
            }
        }

        if let Some(unknown) = policy.listed_fields().find(|f| !self.schema.contains(f)) {
            return Err(CatalogError::UndeclaredOutput {
                enricher: name,
                field: unknown.to_string(),
            });
        }

        let id = EnricherId(self.next_id);
        self.next_id += 1;

        debug!(
            enricher = %name,
            id = %id,
            trigger = trigger,
            whole_record = parameters.is_whole_record(),
            catch_all = policy.is_catch_all(),
            "Registered enricher"
        );

        self.by_trigger
            .entry(trigger.to_string())
            .or_default()
            .push(Registration {
                id,
                trigger: trigger.to_string(),
                policy,
                parameters,
                enricher,
            });

        Ok(id)
    }

    /// Freeze the catalog
    pub fn build(self) -> EnricherCatalog {
        let mut trigger_order: Vec<String> = self.by_trigger.keys().cloned().collect();
        trigger_order.sort_by_key(|f| self.schema.position(f));

        EnricherCatalog {
            schema: self.schema,
            by_trigger: self.by_trigger,
            trigger_order,
            len: self.next_id,
        }
    }
}

/// Frozen, read-only enricher catalog
pub struct EnricherCatalog {
    schema: Arc<SchemaRegistry>,
    by_trigger: HashMap<String, Vec<Registration>>,
    trigger_order: Vec<String>,
    len: usize,
}

impl EnricherCatalog {
    /// Start a catalog against a schema
    pub fn builder(schema: Arc<SchemaRegistry>) -> CatalogBuilder {
        CatalogBuilder::new(schema)
    }

    /// Schema the catalog was validated against
    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    /// Enrichers for a field, in registration order
    pub fn enrichers_for(&self, field: &str) -> &[Registration] {
        self.by_trigger
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Trigger fields in schema declaration order
    pub fn trigger_fields(&self) -> impl Iterator<Item = &str> {
        self.trigger_order.iter().map(String::as_str)
    }

    pub fn is_trigger(&self, field: &str) -> bool {
        self.by_trigger.contains_key(field)
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for EnricherCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnricherCatalog")
            .field("trigger_fields", &self.trigger_order)
            .field("registrations", &self.len)
            .finish()
    }
}
