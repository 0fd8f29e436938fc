// =============================================================================
// catalog.rs — ONE FETCH CYCLE'S WORTH OF LISTINGS
// =============================================================================
//
// The catalog is what the site serves between fetch cycles: every record
// from the last cycle, classified once, plus the per-source errors from that
// cycle. It is never edited; the next cycle builds a new catalog with the
// next generation number and the old one is dropped.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::classify_batch;
use crate::filter::{self, FilterQuery, ListingView};
use crate::grouping::{self, GroupedView};
use crate::models::{Attribution, DataSourceDescriptor, FetchError, ListingRecord, RawListing};
use crate::sources::{registry, FetchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHealth {
    Active,
    Error,
}

/// Status-page row for one registered source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub id: String,
    pub name: String,
    pub country: String,
    pub health: SourceHealth,
    /// Records this source contributed to the catalog
    pub item_count: usize,
    /// Of those, how many are currently active
    pub active_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    generation: u64,
    cycle_id: Option<Uuid>,
    fetched_at: Option<DateTime<Utc>>,
    listings: Vec<ListingRecord>,
    errors: Vec<FetchError>,
}

impl Catalog {
    /// Catalog before the first fetch cycle has finished.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            cycle_id: None,
            fetched_at: None,
            listings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Classify a fetch outcome into a catalog. Records repeating a
    /// `(source, id)` pair already seen in this cycle are dropped; the first
    /// one wins.
    pub fn ingest(outcome: FetchOutcome, generation: u64) -> Self {
        let FetchOutcome {
            cycle_id,
            fetched_at,
            records,
            errors,
        } = outcome;

        let received = records.len();
        let unique = drop_duplicate_ids(records, cycle_id);
        let listings = classify_batch(unique);

        info!(
            cycle_id = %cycle_id,
            generation = generation,
            received = received,
            listings = listings.len(),
            errors = errors.len(),
            "Catalog built"
        );

        Self {
            generation,
            cycle_id: Some(cycle_id),
            fetched_at: Some(fetched_at),
            listings,
            errors,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cycle_id(&self) -> Option<Uuid> {
        self.cycle_id
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn listings(&self) -> &[ListingRecord] {
        &self.listings
    }

    pub fn errors(&self) -> &[FetchError] {
        &self.errors
    }

    /// First listing with this id in source registration order. Ids are only
    /// unique within a source, so when two sources publish the same id the
    /// earlier source wins; use [`Catalog::find_from`] to reach the other.
    pub fn find(&self, id: &str) -> Option<&ListingRecord> {
        self.listings.iter().find(|listing| listing.id == id)
    }

    /// Listing `id` from one source, keyed the same way duplicates are:
    /// `license_id`, or `source_name` when a record has none.
    pub fn find_from(&self, source: &str, id: &str) -> Option<&ListingRecord> {
        self.listings
            .iter()
            .find(|listing| listing.id == id && source_key(listing) == source)
    }

    /// Flat, filtered listings for one page, in source order.
    pub fn filtered(&self, view: ListingView, query: &FilterQuery) -> Vec<ListingRecord> {
        filter::filter_view(&self.listings, view, query)
    }

    /// Lifecycle pre-filter, then the visitor's query, then grouping.
    pub fn view(&self, view: ListingView, query: &FilterQuery) -> GroupedView {
        grouping::group(&self.filtered(view, query))
    }

    /// Country toggles for a page's filter panel.
    pub fn available_countries(&self, view: ListingView) -> Vec<String> {
        filter::available_countries(&self.listings, view)
    }

    /// One status row per registered source, in the order given.
    pub fn source_status(&self, sources: &[DataSourceDescriptor]) -> Vec<SourceStatus> {
        sources
            .iter()
            .map(|source| {
                let owned: Vec<&ListingRecord> = self
                    .listings
                    .iter()
                    .filter(|listing| belongs_to(listing, source))
                    .collect();

                let error = self
                    .errors
                    .iter()
                    .find(|e| {
                        e.source.eq_ignore_ascii_case(&source.name)
                            || e.source.to_lowercase().contains(&source.id.to_lowercase())
                    })
                    .map(|e| e.error.clone());

                SourceStatus {
                    id: source.id.clone(),
                    name: source.name.clone(),
                    country: source.country.clone(),
                    health: if error.is_some() {
                        SourceHealth::Error
                    } else {
                        SourceHealth::Active
                    },
                    item_count: owned.len(),
                    active_count: owned.iter().filter(|listing| listing.is_active).count(),
                    error,
                    note: registry::note_for(&source.id),
                }
            })
            .collect()
    }

    /// License block to show beside a listing, looked up through its `license_id`.
    pub fn attribution_for(&self, listing: &ListingRecord) -> Option<&'static Attribution> {
        let license_id = listing.license_id.as_deref()?;
        registry::find(license_id)?.attribution.as_ref()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::empty()
    }
}

/// The source half of a listing's `(source, id)` identity.
pub fn source_key(listing: &ListingRecord) -> &str {
    listing
        .license_id
        .as_deref()
        .unwrap_or(listing.source_name.as_str())
}

fn belongs_to(listing: &ListingRecord, source: &DataSourceDescriptor) -> bool {
    match listing.license_id.as_deref() {
        Some(license_id) => license_id == source.id,
        None => listing.source_name.eq_ignore_ascii_case(&source.name),
    }
}

fn drop_duplicate_ids(records: Vec<RawListing>, cycle_id: Uuid) -> Vec<RawListing> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|raw| {
            let source = raw
                .license_id
                .clone()
                .unwrap_or_else(|| raw.source_name.clone());
            let fresh = seen.insert((source.clone(), raw.id.clone()));
            if !fresh {
                warn!(
                    cycle_id = %cycle_id,
                    source = source.as_str(),
                    id = raw.id.as_str(),
                    "Duplicate listing id in one cycle; keeping the first"
                );
            }
            fresh
        })
        .collect()
}
