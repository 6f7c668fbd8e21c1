//! Merge Engine
//!
//! Applies one proposed (field, value) pair to a record under the field's
//! cardinality, the enricher's write policy and the field-equivalence
//! suppression rules. Every decision is returned as a `MergeOutcome`;
//! nothing here logs.
//!
//! # Rules
//! 1. Field not listed by the write policy → `NotDeclared`
//! 2. Candidate equivalent to the value of an aliased field → `Suppressed`
//!    (set candidates lose only the equivalent elements)
//! 3. Field absent → `Added`
//! 4. Candidate already contained in the stored value → `Unchanged`
//! 5. Update mode → `Updated` (scalar replaced, set unioned);
//!    insert-only → `InsertBlocked`
//!
//! Applying the same pair twice always yields `Unchanged` the second time.

use crate::catalog::{WriteMode, WritePolicy};
use crate::record::{FieldValue, Record};
use crate::schema::{Cardinality, SchemaRegistry};
use std::fmt;
use std::sync::Arc;

/// Result of one merge decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Field was absent and is now set
    Added,
    /// Stored value already contains the candidate
    Unchanged,
    /// Scalar replaced or set grown
    Updated,
    /// Candidate duplicates an equivalent field
    Suppressed,
    /// Insert-only enricher proposed a different value for a present field
    InsertBlocked,
    /// Write policy does not cover the field
    NotDeclared,
}

impl MergeOutcome {
    /// Whether the record changed
    pub fn is_write(self) -> bool {
        matches!(self, MergeOutcome::Added | MergeOutcome::Updated)
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MergeOutcome::Added => "added",
            MergeOutcome::Unchanged => "unchanged",
            MergeOutcome::Updated => "updated",
            MergeOutcome::Suppressed => "suppressed",
            MergeOutcome::InsertBlocked => "insert-blocked",
            MergeOutcome::NotDeclared => "not-declared",
        };
        f.write_str(label)
    }
}

/// `field` values equal to a value of `equivalent` are redundant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionRule {
    pub field: String,
    pub equivalent: String,
}

impl SuppressionRule {
    pub fn new(field: impl Into<String>, equivalent: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            equivalent: equivalent.into(),
        }
    }

    /// Rules for the person schema
    pub fn person_defaults() -> Vec<SuppressionRule> {
        vec![
            SuppressionRule::new("alternateName", "name"),
            SuppressionRule::new("sameAs", "url"),
        ]
    }
}

/// Applies enricher proposals to records
#[derive(Debug, Clone)]
pub struct MergeEngine {
    schema: Arc<SchemaRegistry>,
    rules: Vec<SuppressionRule>,
}

impl MergeEngine {
    /// Merge engine with the person suppression rules
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self::with_rules(schema, SuppressionRule::person_defaults())
    }

    pub fn with_rules(schema: Arc<SchemaRegistry>, rules: Vec<SuppressionRule>) -> Self {
        Self { schema, rules }
    }

    pub fn rules(&self) -> &[SuppressionRule] {
        &self.rules
    }

    /// Apply one candidate value
    ///
    /// The candidate is expected to be coerced to the field's cardinality
    /// already (see `SchemaRegistry::coerce`); a scalar reaching a set
    /// field is still stored as a set.
    pub fn apply(
        &self,
        record: &mut Record,
        field: &str,
        candidate: FieldValue,
        policy: &WritePolicy,
    ) -> MergeOutcome {
        let Some(mode) = policy.mode_for(field) else {
            return MergeOutcome::NotDeclared;
        };
        let Some(cardinality) = self.schema.cardinality(field) else {
            return MergeOutcome::NotDeclared;
        };

        let Some(candidate) = self.suppress_equivalents(record, field, candidate) else {
            return MergeOutcome::Suppressed;
        };

        let Some(existing) = record.get_mut(field) else {
            let stored = match cardinality {
                Cardinality::Set => FieldValue::Set(candidate.into_set()),
                Cardinality::Scalar => candidate,
            };
            record.insert(field, stored);
            return MergeOutcome::Added;
        };

        if candidate.is_subset_of(existing) {
            return MergeOutcome::Unchanged;
        }

        if mode == WriteMode::InsertOnly {
            return MergeOutcome::InsertBlocked;
        }

        match cardinality {
            Cardinality::Scalar => *existing = candidate,
            Cardinality::Set => {
                let mut grown = std::mem::replace(existing, FieldValue::Set(Default::default()))
                    .into_set();
                grown.extend(candidate.into_set());
                *existing = FieldValue::Set(grown);
            }
        }
        MergeOutcome::Updated
    }

    /// Remove candidate values already held by an equivalent field
    ///
    /// Returns `None` when nothing is left.
    fn suppress_equivalents(
        &self,
        record: &Record,
        field: &str,
        candidate: FieldValue,
    ) -> Option<FieldValue> {
        let equivalents: Vec<&FieldValue> = self
            .rules
            .iter()
            .filter(|rule| rule.field == field)
            .filter_map(|rule| record.get(&rule.equivalent))
            .collect();

        if equivalents.is_empty() {
            return Some(candidate);
        }

        let redundant = |v: &str| equivalents.iter().any(|eq| eq.contains(v));

        match candidate {
            FieldValue::Scalar(s) if redundant(&s) => None,
            FieldValue::Scalar(s) => Some(FieldValue::Scalar(s)),
            FieldValue::Set(set) => {
                let kept: std::collections::BTreeSet<String> =
                    set.into_iter().filter(|v| !redundant(v)).collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(FieldValue::Set(kept))
                }
            }
        }
    }
}
