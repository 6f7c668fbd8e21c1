//! Enricher contract
//!
//! An enricher is an asynchronous fact provider. It receives the record
//! fields it declared at registration time and proposes field values.
//!
//! # Example
//! ```rust,ignore
//! use dig_engine::enricher::{Enricher, EnricherInput, Enrichment, Findings};
//! use dig_engine::error::EnricherError;
//!
//! pub struct DomainEmployer;
//!
//! #[async_trait::async_trait]
//! impl Enricher for DomainEmployer {
//!     fn name(&self) -> &str { "domain-employer" }
//!
//!     async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError> {
//!         let Some(email) = input.text("email") else {
//!             return Ok(Enrichment::NotFound);
//!         };
//!         Ok(Enrichment::found(Findings::new().with("worksFor", lookup(email).await?)))
//!     }
//! }
//! ```

use crate::error::EnricherError;
use crate::record::{FieldValue, Record};
use async_trait::async_trait;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::future::Future;

/// Field values proposed by one enricher invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings(BTreeMap<String, FieldValue>);

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Findings {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, FieldValue)> for Findings {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Findings(iter.into_iter().collect())
    }
}

/// Result of one enricher invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    /// Facts were found
    Found(Findings),
    /// Nothing found
    NotFound,
    /// The subject withdrew consent; the session must stop and redact
    OptedOut,
}

impl Enrichment {
    /// `Found`, or `NotFound` when there is nothing in `findings`
    pub fn found(findings: Findings) -> Self {
        if findings.is_empty() {
            Enrichment::NotFound
        } else {
            Enrichment::Found(findings)
        }
    }
}

/// Which record fields an enricher receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameters {
    /// The whole current record
    WholeRecord,
    /// Only the named fields that are currently present
    Fields(Vec<String>),
}

impl Parameters {
    /// Bind by field name
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Parameters::Fields(names.into_iter().map(Into::into).collect())
    }

    pub fn is_whole_record(&self) -> bool {
        matches!(self, Parameters::WholeRecord)
    }

    /// Assemble the input for one invocation from the current record
    pub fn bind(&self, record: &Record) -> EnricherInput {
        let fields = match self {
            Parameters::WholeRecord => record
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Parameters::Fields(names) => names
                .iter()
                .filter_map(|name| record.get(name).map(|v| (name.clone(), v.clone())))
                .collect(),
        };
        EnricherInput { fields }
    }
}

/// Fields handed to one enricher invocation
///
/// Optional parameters that are absent from the record are simply missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnricherInput {
    fields: BTreeMap<String, FieldValue>,
}

impl EnricherInput {
    /// Input from explicit values (tests, direct calls)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// First value of a field as text
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::first)
    }

    /// All values of a field
    pub fn values(&self, field: &str) -> Vec<&str> {
        self.get(field).map(|v| v.values().collect()).unwrap_or_default()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Asynchronous fact provider
///
/// Implementations own their network access, retries and rate limiting.
/// A returned error is logged by the orchestrator and treated as an empty
/// result.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Name used in logs and session reports
    fn name(&self) -> &str;

    /// Propose field values for the bound input
    async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError>;
}

/// Enricher backed by an async closure
pub struct FnEnricher<F> {
    name: String,
    func: F,
}

/// Adapt an async closure into an `Enricher`
pub fn enricher_fn<F, Fut>(name: impl Into<String>, func: F) -> FnEnricher<F>
where
    F: Fn(EnricherInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Enrichment, EnricherError>> + Send + 'static,
{
    FnEnricher {
        name: name.into(),
        func,
    }
}

#[async_trait]
impl<F, Fut> Enricher for FnEnricher<F>
where
    F: Fn(EnricherInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Enrichment, EnricherError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError> {
        (self.func)(input).await
    }
}
