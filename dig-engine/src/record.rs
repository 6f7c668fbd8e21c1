//! Record model
//!
//! A record is a sparse map from field name to value. Values are either a
//! single string or an ordered set of strings; ordered sets keep the
//! serialized form of a record deterministic.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Value of one record field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Single value
    Scalar(String),
    /// Growable collection of values
    Set(BTreeSet<String>),
}

impl FieldValue {
    /// Build a set value from any collection of strings
    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Set(items.into_iter().map(Into::into).collect())
    }

    /// True for an empty (or whitespace-only) scalar and for an empty set
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Scalar(s) => s.trim().is_empty(),
            FieldValue::Set(set) => set.iter().all(|s| s.trim().is_empty()),
        }
    }

    /// Number of contained values
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Scalar(_) => 1,
            FieldValue::Set(set) => set.len(),
        }
    }

    /// Iterate over the contained values
    pub fn values(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            FieldValue::Scalar(s) => Box::new(std::iter::once(s.as_str())),
            FieldValue::Set(set) => Box::new(set.iter().map(String::as_str)),
        }
    }

    /// First value (the scalar itself, or the smallest set element)
    pub fn first(&self) -> Option<&str> {
        self.values().next()
    }

    /// Whether `value` is one of the contained values
    pub fn contains(&self, value: &str) -> bool {
        match self {
            FieldValue::Scalar(s) => s == value,
            FieldValue::Set(set) => set.contains(value),
        }
    }

    /// Every value of `self` is also a value of `other`
    pub fn is_subset_of(&self, other: &FieldValue) -> bool {
        self.values().all(|v| other.contains(v))
    }

    /// Convert into a set, wrapping a scalar
    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            FieldValue::Scalar(s) => BTreeSet::from([s]),
            FieldValue::Set(set) => set,
        }
    }

    /// Drop blank strings from a set, trim a scalar
    pub(crate) fn without_blanks(self) -> Self {
        match self {
            FieldValue::Scalar(s) => FieldValue::Scalar(s.trim().to_string()),
            FieldValue::Set(set) => FieldValue::Set(
                set.into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<BTreeSet<String>> for FieldValue {
    fn from(value: BTreeSet<String>) -> Self {
        FieldValue::Set(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(s) => write!(f, "{}", s),
            FieldValue::Set(set) => {
                let joined: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
        }
    }
}

/// Partial entity being enriched
///
/// Serialized as a flat JSON object. The opt-out marker appears as
/// `"OptOut": true` and only when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "OptOut", default, skip_serializing_if = "is_false")]
    opted_out: bool,
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Record {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed field
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Minimal record left after the subject opted out
    ///
    /// Carries only the opt-out marker, no identifying field.
    pub fn redacted() -> Self {
        Self {
            opted_out: true,
            fields: BTreeMap::new(),
        }
    }

    /// Whether the subject has withdrawn consent
    pub fn is_opted_out(&self) -> bool {
        self.opted_out
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Store a value, returning the previous one
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    pub(crate) fn get_mut(&mut self, field: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(field)
    }

    /// Field names in lexical order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let record = Record::new()
            .with("email", "a@b.com")
            .with("worksFor", FieldValue::set(["B Inc"]));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"email":"a@b.com","worksFor":["B Inc"]}"#);

        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_opt_out_marker_serialization() {
        let json = serde_json::to_string(&Record::redacted()).unwrap();
        assert_eq!(json, r#"{"OptOut":true}"#);

        let parsed: Record = serde_json::from_str(r#"{"OptOut":true,"name":"X"}"#).unwrap();
        assert!(parsed.is_opted_out());
        assert_eq!(parsed.get("name"), Some(&FieldValue::from("X")));
        assert!(!parsed.contains("OptOut"));
    }

    #[test]
    fn test_subset_and_emptiness() {
        let stored = FieldValue::set(["a", "b"]);
        assert!(FieldValue::from("a").is_subset_of(&stored));
        assert!(FieldValue::set(["a", "b"]).is_subset_of(&stored));
        assert!(!FieldValue::set(["a", "c"]).is_subset_of(&stored));

        assert!(FieldValue::from("  ").is_empty());
        assert!(FieldValue::set(Vec::<String>::new()).is_empty());
        assert!(!FieldValue::set(["x"]).is_empty());
    }

    #[test]
    fn test_without_blanks() {
        let cleaned = FieldValue::set(["  a ", "", " "]).without_blanks();
        assert_eq!(cleaned, FieldValue::set(["a"]));
    }
}
