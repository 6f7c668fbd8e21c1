//! Employer from the email domain
//!
//! `jane@acme-labs.co.uk` → `worksFor: {"Acme Labs"}`. Addresses at public
//! mail providers say nothing about an employer and are ignored.

use super::email_domain;
use crate::enricher::{Enricher, EnricherInput, Enrichment, Findings};
use crate::error::EnricherError;
use async_trait::async_trait;
use std::collections::HashSet;

/// Second-level labels under which organizations register in ccTLDs
const SECOND_LEVEL_LABELS: &[&str] = &["ac", "co", "com", "edu", "gov", "ne", "net", "or", "org"];

/// Label identifying the organization that owns `domain`
///
/// `mail.acme.com` → `acme`, `acme.co.uk` → `acme`
pub fn organization_label(domain: &str) -> Option<&str> {
    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    let n = labels.len();
    if n < 2 {
        return None;
    }

    let country_tld = labels[n - 1].len() == 2;
    let label = if n >= 3 && country_tld && SECOND_LEVEL_LABELS.contains(&labels[n - 2]) {
        labels[n - 3]
    } else {
        labels[n - 2]
    };

    let plausible = label.len() > 1 && label.chars().any(|c| c.is_ascii_alphabetic());
    plausible.then_some(label)
}

/// `acme-labs` → `Acme Labs`
pub fn organization_name(label: &str) -> String {
    label
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Adds `worksFor` derived from a corporate email domain
#[derive(Debug, Clone)]
pub struct EmployerFromDomain {
    public_providers: HashSet<String>,
}

impl EmployerFromDomain {
    pub fn new<I, S>(public_providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            public_providers: public_providers
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Whether `domain` belongs to a public mail provider
    pub fn is_public_provider(&self, domain: &str) -> bool {
        self.public_providers.iter().any(|provider| {
            domain == provider
                || domain
                    .strip_suffix(provider.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

#[async_trait]
impl Enricher for EmployerFromDomain {
    fn name(&self) -> &str {
        "employer-from-domain"
    }

    async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError> {
        let Some(domain) = input.text("email").and_then(email_domain) else {
            return Ok(Enrichment::NotFound);
        };
        if self.is_public_provider(&domain) {
            return Ok(Enrichment::NotFound);
        }

        Ok(match organization_label(&domain) {
            Some(label) => {
                Enrichment::found(Findings::new().with("worksFor", organization_name(label)))
            }
            None => Enrichment::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_label() {
        assert_eq!(organization_label("acme.com"), Some("acme"));
        assert_eq!(organization_label("mail.acme.com"), Some("acme"));
        assert_eq!(organization_label("acme.co.uk"), Some("acme"));
        assert_eq!(organization_label("localhost"), None);
        assert_eq!(organization_label("42.com"), None);
    }

    #[test]
    fn test_organization_name() {
        assert_eq!(organization_name("acme-labs"), "Acme Labs");
        assert_eq!(organization_name("ankaboot"), "Ankaboot");
    }

    #[test]
    fn test_public_provider_match() {
        let enricher = EmployerFromDomain::new(["gmail.com", "Yahoo.fr"]);
        assert!(enricher.is_public_provider("gmail.com"));
        assert!(enricher.is_public_provider("yahoo.fr"));
        assert!(!enricher.is_public_provider("notgmail.com"));
    }

    #[tokio::test]
    async fn test_enricher() {
        let enricher = EmployerFromDomain::new(["gmail.com"]);

        let found = enricher
            .enrich(EnricherInput::from_pairs([("email", "jane@acme-labs.co.uk")]))
            .await
            .unwrap();
        assert_eq!(
            found,
            Enrichment::Found(Findings::new().with("worksFor", "Acme Labs"))
        );

        let public = enricher
            .enrich(EnricherInput::from_pairs([("email", "jane@gmail.com")]))
            .await
            .unwrap();
        assert_eq!(public, Enrichment::NotFound);
    }
}
