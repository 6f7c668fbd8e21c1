//! Gravatar profile picture
//!
//! Builds the avatar URL for an email address and confirms an image exists.
//! Gravatar answers 404 for unknown addresses thanks to `d=404`.
//! Addresses are hashed with SHA-256; Gravatar also accepts legacy MD5
//! digests but both resolve to the same avatar.
//!
//! # API Reference
//! - Endpoint: https://www.gravatar.com/avatar/{sha256(email)}?d=404&s={size}
//! - Documentation: https://docs.gravatar.com/api/avatars/images/

use super::email_domain;
use crate::enricher::{Enricher, EnricherInput, Enrichment, Findings};
use crate::error::EnricherError;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

const GRAVATAR_AVATAR_URL: &str = "https://www.gravatar.com/avatar";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("thedig/", env!("CARGO_PKG_VERSION"));

/// SHA-256 of the trimmed, lower-cased address, hex encoded
pub fn email_hash(email: &str) -> String {
    format!("{:x}", Sha256::digest(email.trim().to_lowercase().as_bytes()))
}

/// Avatar URL of `email`, 404 when no picture exists
pub fn avatar_url(email: &str, size: u32) -> String {
    format!("{}/{}?d=404&s={}", GRAVATAR_AVATAR_URL, email_hash(email), size)
}

/// Adds `image` when the address has a Gravatar picture
pub struct Gravatar {
    http_client: Client,
    size: u32,
}

impl Gravatar {
    /// Create the client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be initialized (TLS backend)
    pub fn new(size: u32) -> Result<Self, EnricherError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self { http_client, size })
    }

    async fn lookup(&self, email: &str) -> Result<Option<String>, EnricherError> {
        let url = avatar_url(email, self.size);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| EnricherError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(Some(url)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(EnricherError::MalformedResponse(format!(
                "Gravatar answered HTTP {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl Enricher for Gravatar {
    fn name(&self) -> &str {
        "gravatar"
    }

    async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError> {
        let Some(email) = input.text("email") else {
            return Ok(Enrichment::NotFound);
        };
        if email_domain(email).is_none() {
            return Ok(Enrichment::NotFound);
        }

        let found = self.lookup(email).await?;
        debug!(found = found.is_some(), "Gravatar lookup");

        Ok(match found {
            Some(url) => Enrichment::found(Findings::new().with("image", url)),
            None => Enrichment::NotFound,
        })
    }
}
