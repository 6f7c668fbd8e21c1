//! Schema Registry
//!
//! Static table of record fields. Each field has a cardinality (single value
//! or growable set) and a value kind checked when enricher output is
//! coerced. Declaration order is significant: it is the order in which
//! trigger fields present in a seed record are first processed.
//!
//! The registry is built once at startup and shared read-only.

use crate::error::{CatalogError, SchemaViolation};
use crate::record::FieldValue;
use std::collections::HashMap;

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Single value, replace semantics
    Scalar,
    /// Collection, union semantics, never shrinks
    Set,
}

/// Value kind checked on every proposed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Free text
    Text,
    /// Email address
    Email,
    /// Absolute http(s) URL
    Url,
    /// ISO 3166 alpha-2 code, upper case
    CountryCode,
    /// ISO 639-1 code, lower case
    LanguageCode,
}

impl ValueKind {
    fn label(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Email => "an email address",
            ValueKind::Url => "an http(s) URL",
            ValueKind::CountryCode => "a two-letter upper-case country code",
            ValueKind::LanguageCode => "a two-letter lower-case language code",
        }
    }

    /// Check a single value
    pub fn accepts(self, value: &str) -> bool {
        match self {
            ValueKind::Text => true,
            ValueKind::Email => is_email(value),
            ValueKind::Url => reqwest::Url::parse(value)
                .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
                .unwrap_or(false),
            ValueKind::CountryCode => {
                value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase())
            }
            ValueKind::LanguageCode => {
                value.len() == 2 && value.chars().all(|c| c.is_ascii_lowercase())
            }
        }
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Declaration of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub cardinality: Cardinality,
    pub kind: ValueKind,
}

/// Immutable table of declared fields
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Start declaring a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Person schema used by the built-in catalog
    ///
    /// Trigger fields come first so the cheap, high-yield identifiers are
    /// processed before descriptive fields.
    pub fn person() -> Self {
        use Cardinality::{Scalar, Set};
        use ValueKind::*;

        let builder = SchemaRegistry::builder()
            .field("url", Scalar, Url)
            .field("sameAs", Set, Url)
            .field("email", Scalar, Email)
            .field("image", Set, Url)
            .field("description", Set, Text)
            .field("name", Scalar, Text)
            .field("alternateName", Set, Text)
            .field("givenName", Scalar, Text)
            .field("familyName", Scalar, Text)
            .field("homeLocation", Set, Text)
            .field("identifier", Set, Text)
            .field("jobTitle", Set, Text)
            .field("knowsLanguage", Set, LanguageCode)
            .field("nationality", Set, CountryCode)
            .field("workLocation", Set, Text)
            .field("worksFor", Set, Text)
            .field("industry", Set, Text);

        match builder.build() {
            Ok(schema) => schema,
            // the table above is static and free of duplicates
            Err(e) => unreachable!("person schema is invalid: {}", e),
        }
    }

    /// Cardinality of a declared field
    pub fn cardinality(&self, field: &str) -> Option<Cardinality> {
        self.spec(field).map(|spec| spec.cardinality)
    }

    /// Value kind of a declared field
    pub fn kind(&self, field: &str) -> Option<ValueKind> {
        self.spec(field).map(|spec| spec.kind)
    }

    /// Declaration index of a field
    pub fn position(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    pub fn spec(&self, field: &str) -> Option<&FieldSpec> {
        self.index.get(field).map(|&i| &self.fields[i])
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert a raw value to the field's cardinality and check its kind
    ///
    /// Blank strings are removed first. A scalar proposed for a set field
    /// becomes a one-element set; a one-element set proposed for a scalar
    /// field becomes that scalar.
    pub fn coerce(&self, field: &str, value: FieldValue) -> Result<FieldValue, SchemaViolation> {
        let spec = self
            .spec(field)
            .ok_or_else(|| SchemaViolation::UndeclaredField(field.to_string()))?;

        let value = value.without_blanks();

        if let Some(bad) = value.values().find(|v| !spec.kind.accepts(v)) {
            return Err(SchemaViolation::InvalidValue {
                field: field.to_string(),
                expected: spec.kind.label(),
                value: bad.to_string(),
            });
        }

        match (spec.cardinality, value) {
            (Cardinality::Set, value) => Ok(FieldValue::Set(value.into_set())),
            (Cardinality::Scalar, FieldValue::Scalar(s)) => Ok(FieldValue::Scalar(s)),
            (Cardinality::Scalar, FieldValue::Set(set)) if set.len() == 1 => {
                Ok(FieldValue::Scalar(set.into_iter().next().unwrap_or_default()))
            }
            (Cardinality::Scalar, FieldValue::Set(set)) => Err(SchemaViolation::CardinalityMismatch {
                field: field.to_string(),
                count: set.len(),
            }),
        }
    }
}

/// Builder collecting field declarations
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, cardinality: Cardinality, kind: ValueKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            cardinality,
            kind,
        });
        self
    }

    /// Freeze the declarations
    ///
    /// # Errors
    /// `CatalogError::DuplicateField` if a name is declared twice
    pub fn build(self) -> Result<SchemaRegistry, CatalogError> {
        let mut index = HashMap::with_capacity(self.fields.len());
        for (i, spec) in self.fields.iter().enumerate() {
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateField(spec.name.clone()));
            }
        }
        Ok(SchemaRegistry {
            fields: self.fields,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_schema_order_and_cardinality() {
        let schema = SchemaRegistry::person();
        assert_eq!(schema.position("url"), Some(0));
        assert!(schema.position("email") < schema.position("name"));
        assert_eq!(schema.cardinality("worksFor"), Some(Cardinality::Set));
        assert_eq!(schema.cardinality("givenName"), Some(Cardinality::Scalar));
        assert_eq!(schema.cardinality("unknown"), None);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = SchemaRegistry::builder()
            .field("name", Cardinality::Scalar, ValueKind::Text)
            .field("name", Cardinality::Set, ValueKind::Text)
            .build();
        assert_eq!(result.unwrap_err(), CatalogError::DuplicateField("name".into()));
    }

    #[test]
    fn test_coerce_scalar_into_set_field() {
        let schema = SchemaRegistry::person();
        let coerced = schema.coerce("worksFor", FieldValue::from("B Inc")).unwrap();
        assert_eq!(coerced, FieldValue::set(["B Inc"]));
    }

    #[test]
    fn test_coerce_singleton_set_into_scalar_field() {
        let schema = SchemaRegistry::person();
        let coerced = schema.coerce("givenName", FieldValue::set(["John"])).unwrap();
        assert_eq!(coerced, FieldValue::from("John"));

        let err = schema
            .coerce("givenName", FieldValue::set(["John", "Jack"]))
            .unwrap_err();
        assert!(matches!(err, SchemaViolation::CardinalityMismatch { count: 2, .. }));
    }

    #[test]
    fn test_coerce_rejects_bad_kinds() {
        let schema = SchemaRegistry::person();
        assert!(schema.coerce("email", "not-an-email".into()).is_err());
        assert!(schema.coerce("image", "ftp://x.org/a.png".into()).is_err());
        assert!(schema.coerce("nationality", "fr".into()).is_err());
        assert!(schema.coerce("knowsLanguage", "fr".into()).is_ok());
        assert!(matches!(
            schema.coerce("shoeSize", "42".into()),
            Err(SchemaViolation::UndeclaredField(_))
        ));
    }

    #[test]
    fn test_email_check() {
        assert!(is_email("a@b.com"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.com"));
        assert!(!is_email("a b@c.com"));
        assert!(!is_email("a@@b.com"));
    }
}
