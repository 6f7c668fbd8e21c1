//! Built-in enrichers
//!
//! Offline enrichers derived from the email address and the display name,
//! plus an optional Gravatar lookup.
//!
//! # Default catalog
//! | trigger | enricher | parameters | writes |
//! |---|---|---|---|
//! | email | `EmployerFromDomain` | email | update `worksFor` |
//! | email | `Gravatar` (opt-in) | email | update `image` |
//! | email | `CountryFromDomain` | email | insert `workLocation` |
//! | name | `NameSplitter` | name, email | update `givenName`, `familyName`; insert `jobTitle` |

pub mod country;
pub mod employer;
pub mod gravatar;
pub mod name_splitter;

pub use country::CountryFromDomain;
pub use employer::EmployerFromDomain;
pub use gravatar::Gravatar;
pub use name_splitter::NameSplitter;

use crate::catalog::{EnricherCatalog, WritePolicy};
use crate::enricher::Parameters;
use crate::error::CatalogError;
use crate::schema::SchemaRegistry;
use dig_common::config::EnricherSettings;
use std::sync::Arc;
use tracing::info;

/// Lower-cased domain part of an email address
pub(crate) fn email_domain(email: &str) -> Option<String> {
    let (local, domain) = email.trim().rsplit_once('@')?;
    let domain = domain.trim_end_matches('.').to_lowercase();
    (!local.is_empty() && domain.contains('.')).then_some(domain)
}

/// Catalog of the built-in enrichers over the person schema
///
/// # Errors
/// `CatalogError` if a registration does not match the schema or an
/// enricher cannot be initialized
pub fn default_catalog(settings: &EnricherSettings) -> Result<EnricherCatalog, CatalogError> {
    let mut builder = EnricherCatalog::builder(Arc::new(SchemaRegistry::person()));

    builder.register(
        "email",
        WritePolicy::update(["worksFor"]),
        Parameters::fields(["email"]),
        Arc::new(EmployerFromDomain::new(&settings.public_email_providers)),
    )?;

    if settings.gravatar {
        let gravatar =
            Gravatar::new(settings.gravatar_size).map_err(|e| CatalogError::EnricherSetup {
                enricher: "gravatar".to_string(),
                reason: e.to_string(),
            })?;
        builder.register(
            "email",
            WritePolicy::update(["image"]),
            Parameters::fields(["email"]),
            Arc::new(gravatar),
        )?;
    }

    builder.register(
        "email",
        WritePolicy::insert_only(["workLocation"]),
        Parameters::fields(["email"]),
        Arc::new(CountryFromDomain::new()),
    )?;

    builder.register(
        "name",
        WritePolicy::update(["givenName", "familyName"]).with_insert(["jobTitle"]),
        Parameters::fields(["name", "email"]),
        Arc::new(NameSplitter::new()),
    )?;

    let catalog = builder.build();
    info!(
        enrichers = catalog.len(),
        gravatar = settings.gravatar,
        "Built default enricher catalog"
    );
    Ok(catalog)
}
