//! Per-session memoization ledger
//!
//! Remembers every (enricher, trigger field, trigger value) triple already
//! presented to an enricher so no enricher sees the same value of its
//! trigger field twice within one session.

use crate::catalog::EnricherId;
use crate::record::FieldValue;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct MemoLedger {
    seen: HashSet<(EnricherId, String, FieldValue)>,
}

impl MemoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the triple, returning `false` if it was already recorded
    pub fn first_visit(&mut self, enricher: EnricherId, field: &str, value: &FieldValue) -> bool {
        self.seen
            .insert((enricher, field.to_string(), value.clone()))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
