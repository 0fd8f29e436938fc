// =============================================================================
// sources/mod.rs — WHERE LISTINGS COME FROM
// =============================================================================
//
// A source is anything that can hand us a batch of raw listings: the mock
// fixtures today, HTTP JSON feeds as they come online. Sources are opaque to
// the rest of the pipeline; we never retry or interpret their failures. A
// failed source becomes a `{source, error}` descriptor in the fetch outcome
// and the cycle carries on with whatever the other sources returned.
// =============================================================================

pub mod http_source;
pub mod mock_source;
pub mod registry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::circuit_breaker::CircuitBreakerSnapshot;
use crate::models::{DataSourceDescriptor, FetchError, RawListing};

/// Everything that can go wrong pulling listings from one source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("circuit breaker open for {source_id}; skipping this cycle")]
    CircuitOpen { source_id: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("could not decode listings: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// An upstream provider of raw listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Registry entry this source publishes under.
    fn descriptor(&self) -> &DataSourceDescriptor;

    /// Pull the source's current listings.
    async fn fetch(&self) -> Result<Vec<RawListing>, SourceError>;

    /// Breaker state, for sources that sit behind one.
    fn breaker(&self) -> Option<CircuitBreakerSnapshot> {
        None
    }
}

/// Result of one fetch cycle across every registered source.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub cycle_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    /// Records from every successful source, in source registration order.
    pub records: Vec<RawListing>,
    pub errors: Vec<FetchError>,
}

/// Fetch every source concurrently. Never fails as a whole; per-source
/// failures land in `errors`, named by the source's display name.
pub async fn fetch_all(sources: &[Arc<dyn ListingSource>]) -> FetchOutcome {
    let cycle_id = Uuid::new_v4();
    info!(cycle_id = %cycle_id, sources = sources.len(), "Fetch cycle starting");

    let results = join_all(sources.iter().map(|source| source.fetch())).await;

    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        let descriptor = source.descriptor();
        match result {
            Ok(batch) => {
                info!(
                    cycle_id = %cycle_id,
                    source = descriptor.id.as_str(),
                    records = batch.len(),
                    "Source fetched"
                );
                records.extend(batch);
            }
            Err(e) => {
                warn!(
                    cycle_id = %cycle_id,
                    source = descriptor.id.as_str(),
                    error = %e,
                    "Source failed; continuing without it"
                );
                errors.push(FetchError {
                    source: descriptor.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        cycle_id = %cycle_id,
        records = records.len(),
        errors = errors.len(),
        "Fetch cycle complete"
    );

    FetchOutcome {
        cycle_id,
        fetched_at: Utc::now(),
        records,
        errors,
    }
}
