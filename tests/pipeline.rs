//! Source → classify → filter → group, through the public API only.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use surplus_listing_engine::catalog::Catalog;
use surplus_listing_engine::classifier::{classify, classify_batch, display_label, priority_rank};
use surplus_listing_engine::filter::{filter, filter_view, FilterQuery, ListingView};
use surplus_listing_engine::grouping::group;
use surplus_listing_engine::models::{AssetType, DataSourceDescriptor, ListingRecord, RawListing};
use surplus_listing_engine::sources::mock_source::MockSource;
use surplus_listing_engine::sources::{fetch_all, registry, ListingSource, SourceError};

struct DownSource {
    descriptor: DataSourceDescriptor,
}

#[async_trait]
impl ListingSource for DownSource {
    fn descriptor(&self) -> &DataSourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self) -> Result<Vec<RawListing>, SourceError> {
        Err(SourceError::Status { status: 502 })
    }
}

fn record(id: &str, country: &str, state: Option<&str>, asset_type: AssetType) -> ListingRecord {
    let mut raw = RawListing::new(id, format!("Item {id}"), country);
    raw.state = state.map(str::to_string);
    raw.is_active = true;
    ListingRecord::from_raw(raw, asset_type)
}

fn ids(listings: &[ListingRecord]) -> Vec<&str> {
    listings.iter().map(|l| l.id.as_str()).collect()
}

#[test]
fn classification_is_total() {
    let inputs = [
        (None, None, None),
        (Some(""), Some(""), Some("")),
        (Some("???"), None, Some("\u{1F69A}")),
        (None, Some("Surplus Land Parcel"), None),
        (Some("VEHICLES"), Some("2014 Sedan"), Some("runs")),
        (None, Some("Utility trailer"), Some("dual axle")),
        (None, Some("Road bicycle"), None),
        (None, Some("Police motorcycle"), None),
    ];
    for (category, title, description) in inputs {
        let asset_type = classify(category, title, description);
        assert!(AssetType::ALL.contains(&asset_type));
        assert!(!display_label(asset_type).is_empty());
    }
}

#[test]
fn land_outranks_cars() {
    assert_eq!(
        classify(None, Some("Sedan found on land parcel"), None),
        AssetType::LandBuildings
    );
    assert_eq!(classify(Some("parcel"), Some("sedan"), None), AssetType::LandBuildings);
}

#[test]
fn unmatched_text_falls_back_to_other() {
    assert_eq!(
        classify(None, Some("mystery crate of assorted bolts"), None),
        AssetType::Other
    );
}

#[test]
fn filter_is_a_conjunction() {
    let listings = vec![
        record("us-car", "US", None, AssetType::Cars),
        record("uk-car", "UK", None, AssetType::Cars),
        record("us-bike", "US", None, AssetType::Bikes),
    ];
    let query = FilterQuery::new().with_country("US").with_asset_type(AssetType::Cars);
    assert_eq!(ids(&filter(&listings, &query)), vec!["us-car"]);
}

#[test]
fn filter_keeps_input_order() {
    let listings = vec![
        record("3", "US", None, AssetType::Bikes),
        record("1", "US", None, AssetType::Cars),
        record("x", "UK", None, AssetType::Cars),
        record("2", "US", None, AssetType::LandBuildings),
    ];
    let query = FilterQuery::new().with_country("US");
    assert_eq!(ids(&filter(&listings, &query)), vec!["3", "1", "2"]);
}

#[test]
fn countries_group_in_first_seen_order() {
    let listings = vec![
        record("1", "UK", None, AssetType::Other),
        record("2", "US", None, AssetType::Other),
        record("3", "UK", None, AssetType::Other),
    ];
    let grouped = group(&listings);
    let countries: Vec<&str> = grouped.countries().map(|(c, _)| c).collect();
    assert_eq!(countries, vec!["UK", "US"]);
}

#[test]
fn sub_region_sorted_by_priority_with_stable_ties() {
    let listings = vec![
        record("bike", "US", Some("TX"), AssetType::Bikes),
        record("car-a", "US", Some("TX"), AssetType::Cars),
        record("land", "US", Some("TX"), AssetType::LandBuildings),
        record("car-b", "US", Some("TX"), AssetType::Cars),
    ];
    let grouped = group(&listings);
    let texas = grouped.sub_region("US", "TX").unwrap();
    assert_eq!(ids(texas), vec!["land", "car-a", "car-b", "bike"]);

    let ranks: Vec<usize> = texas.iter().map(|l| priority_rank(l.asset_type)).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn filter_then_group_is_deterministic() {
    let raws: Vec<RawListing> = surplus_listing_engine::sources::mock_source::fixtures(Utc::now());
    let listings = classify_batch(raws);
    let query = FilterQuery::new().with_search("government");

    let first = group(&filter_view(&listings, ListingView::Active, &query));
    let second = group(&filter_view(&listings, ListingView::Active, &query));
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn empty_inputs_give_empty_results() {
    assert!(filter(&[], &FilterQuery::new()).is_empty());
    assert!(group(&[]).is_empty());
    assert!(group(&filter(&[], &FilterQuery::new().with_search("x"))).is_empty());
}

#[tokio::test]
async fn mock_sources_end_to_end() {
    let now = Utc::now();
    let mut sources: Vec<Arc<dyn ListingSource>> = registry::all()
        .iter()
        .map(|d| Arc::new(MockSource::for_source(d.clone(), now)) as Arc<dyn ListingSource>)
        .collect();
    sources.push(Arc::new(DownSource {
        descriptor: DataSourceDescriptor {
            id: "down".into(),
            name: "Down Feed".into(),
            country: "Nowhere".into(),
            attribution: None,
        },
    }));

    let outcome = fetch_all(&sources).await;
    assert_eq!(outcome.records.len(), 7);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].source, "Down Feed");

    let catalog = Catalog::ingest(outcome, 1);

    // Home page
    let home = catalog.view(ListingView::Active, &FilterQuery::new());
    assert_eq!(home.listing_count(), 6);
    let countries: Vec<&str> = home.countries().map(|(c, _)| c).collect();
    assert_eq!(countries, vec!["United States", "United Kingdom"]);
    assert!(home.country("Canada").is_none());

    // Upcoming page: nothing announced yet
    assert!(catalog.view(ListingView::Future, &FilterQuery::new()).is_empty());

    // Visitor narrows to UK vehicles
    let query = FilterQuery::new()
        .with_country("United Kingdom")
        .with_asset_type(AssetType::Cars);
    let uk_cars = catalog.view(ListingView::Active, &query);
    assert_eq!(uk_cars.listing_count(), 1);
    let london = uk_cars.sub_region("United Kingdom", "Greater London").unwrap();
    assert_eq!(london[0].id, "uk-002");
    assert_eq!(
        catalog.attribution_for(&london[0]).map(|a| a.license.as_str()),
        Some("OGL v3.0")
    );

    // Free-text search over location
    let austin = catalog.filtered(ListingView::Active, &FilterQuery::new().with_search("austin, tx"));
    assert_eq!(ids(&austin), vec!["gsa-002"]);
}
