// =============================================================================
// sources/http_source.rs — JSON FEEDS OVER HTTP
// =============================================================================
//
// Generic source for any feed that serves raw listings as JSON, either a bare
// array or an object with an `items` array. One reqwest client and one
// circuit breaker per source.
// =============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ListingSource, SourceError};
use crate::circuit_breaker::{BreakerSettings, CircuitBreaker, CircuitBreakerSnapshot};
use crate::models::{DataSourceDescriptor, RawListing};

const USER_AGENT: &str = "SurplusListingEngine/0.1 (listing-directory)";

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedBody {
    Bare(Vec<RawListing>),
    Wrapped { items: Vec<RawListing> },
}

impl FeedBody {
    fn into_records(self) -> Vec<RawListing> {
        match self {
            FeedBody::Bare(items) | FeedBody::Wrapped { items } => items,
        }
    }
}

pub struct HttpJsonSource {
    descriptor: DataSourceDescriptor,
    url: String,
    client: reqwest::Client,
    breaker: CircuitBreaker,
}

impl HttpJsonSource {
    pub fn new(
        descriptor: DataSourceDescriptor,
        url: impl Into<String>,
        timeout: Duration,
        breaker: BreakerSettings,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(descriptor, url, client, breaker))
    }

    /// Use a pre-built client (custom TLS, proxies, test setups).
    pub fn with_client(
        descriptor: DataSourceDescriptor,
        url: impl Into<String>,
        client: reqwest::Client,
        breaker: BreakerSettings,
    ) -> Self {
        let breaker = CircuitBreaker::new(descriptor.id.clone(), breaker);
        Self {
            descriptor,
            url: url.into(),
            client,
            breaker,
        }
    }

    async fn request(&self) -> Result<Vec<RawListing>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let feed: FeedBody = serde_json::from_str(&body)?;
        Ok(feed.into_records())
    }
}

#[async_trait]
impl ListingSource for HttpJsonSource {
    fn descriptor(&self) -> &DataSourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self) -> Result<Vec<RawListing>, SourceError> {
        if !self.breaker.allow_request() {
            return Err(SourceError::CircuitOpen {
                source_id: self.descriptor.id.clone(),
            });
        }

        match self.request().await {
            Ok(records) => {
                self.breaker.record_success();
                debug!(
                    source = self.descriptor.id.as_str(),
                    url = self.url.as_str(),
                    records = records.len(),
                    "HTTP source responded"
                );
                Ok(records)
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(
                    source = self.descriptor.id.as_str(),
                    url = self.url.as_str(),
                    error = %e,
                    "HTTP source failed"
                );
                Err(e)
            }
        }
    }

    fn breaker(&self) -> Option<CircuitBreakerSnapshot> {
        Some(self.breaker.snapshot())
    }
}
