// =============================================================================
// filter.rs — VISITOR-DRIVEN FILTERING
// =============================================================================
//
// Two layers, applied in this order:
//
// 1. The lifecycle pre-filter (`ListingView`). Each page of the site shows a
//    single lifecycle slice: active listings on the home page, upcoming ones
//    on the future page. Exactly one flag check per record.
// 2. The visitor's `FilterQuery`: free-text substring search, selected
//    countries, selected asset types. Every active predicate must hold (AND);
//    an empty string or empty set means "no constraint".
//
// Output keeps the input's relative order. No re-sorting happens here;
// ordering is the grouping engine's job.
// =============================================================================

use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::models::{AssetType, ListingRecord};

/// Which lifecycle slice of the catalog a page displays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListingView {
    /// `is_active` listings (home page)
    Active,
    /// `is_future` listings (upcoming page)
    Future,
    /// Neither flag set
    Historical,
}

impl ListingView {
    pub fn admits(&self, listing: &ListingRecord) -> bool {
        match self {
            ListingView::Active => listing.is_active,
            ListingView::Future => listing.is_future,
            ListingView::Historical => !listing.is_active && !listing.is_future,
        }
    }

    pub fn from_param(param: &str) -> Option<ListingView> {
        match param.to_ascii_lowercase().as_str() {
            "active" => Some(ListingView::Active),
            "future" => Some(ListingView::Future),
            "historical" => Some(ListingView::Historical),
            _ => None,
        }
    }
}

impl fmt::Display for ListingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingView::Active => write!(f, "active"),
            ListingView::Future => write!(f, "future"),
            ListingView::Historical => write!(f, "historical"),
        }
    }
}

/// The visitor's current filter selections.
///
/// Sets are ordered so the query hashes deterministically; the view cache
/// keys on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FilterQuery {
    /// Case-insensitive substring matched against title, short description,
    /// description and location. Empty means no text constraint.
    pub search_text: String,
    /// Exact country names. Empty means every country.
    pub countries: BTreeSet<String>,
    /// Empty means every asset type.
    pub asset_types: BTreeSet<AssetType>,
}

impl FilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.countries.insert(country.into());
        self
    }

    pub fn with_asset_type(mut self, asset_type: AssetType) -> Self {
        self.asset_types.insert(asset_type);
        self
    }

    /// Select the country if unselected, unselect it otherwise.
    pub fn toggle_country(&mut self, country: &str) {
        if !self.countries.remove(country) {
            self.countries.insert(country.to_string());
        }
    }

    /// Select the asset type if unselected, unselect it otherwise.
    pub fn toggle_asset_type(&mut self, asset_type: AssetType) {
        if !self.asset_types.remove(&asset_type) {
            self.asset_types.insert(asset_type);
        }
    }

    /// Reset to "no constraint" everywhere.
    pub fn clear(&mut self) {
        self.search_text.clear();
        self.countries.clear();
        self.asset_types.clear();
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search_text.is_empty() || !self.countries.is_empty() || !self.asset_types.is_empty()
    }
}

/// Apply `query` to `listings`. Stable: survivors keep their input order.
/// The lifecycle pre-filter is NOT applied here; see [`filter_view`].
pub fn filter(listings: &[ListingRecord], query: &FilterQuery) -> Vec<ListingRecord> {
    let needle = query.search_text.to_lowercase();
    let finder = (!needle.is_empty()).then(|| memmem::Finder::new(needle.as_bytes()));

    let out: Vec<ListingRecord> = listings
        .iter()
        .filter(|listing| {
            if let Some(finder) = &finder {
                let hit = [
                    &listing.title,
                    &listing.short_description,
                    &listing.description,
                    &listing.location,
                ]
                .into_iter()
                .any(|field| finder.find(field.to_lowercase().as_bytes()).is_some());
                if !hit {
                    return false;
                }
            }

            if !query.countries.is_empty() && !query.countries.contains(&listing.country) {
                return false;
            }

            if !query.asset_types.is_empty() && !query.asset_types.contains(&listing.asset_type) {
                return false;
            }

            true
        })
        .cloned()
        .collect();

    debug!(
        input = listings.len(),
        output = out.len(),
        search = query.search_text.as_str(),
        countries = query.countries.len(),
        asset_types = query.asset_types.len(),
        "Filter applied"
    );

    out
}

/// Lifecycle pre-filter followed by [`filter`], as each page does it.
pub fn filter_view(listings: &[ListingRecord], view: ListingView, query: &FilterQuery) -> Vec<ListingRecord> {
    let in_view: Vec<ListingRecord> = listings
        .iter()
        .filter(|listing| view.admits(listing))
        .cloned()
        .collect();
    filter(&in_view, query)
}

/// Distinct countries among listings in `view`, first-seen order. These are
/// the country toggles the filter panel offers.
pub fn available_countries(listings: &[ListingRecord], view: ListingView) -> Vec<String> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut countries = Vec::new();
    for listing in listings.iter().filter(|l| view.admits(l)) {
        if seen.insert(listing.country.as_str()) {
            countries.push(listing.country.clone());
        }
    }
    countries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawListing;

    fn listing(id: &str, country: &str, asset_type: AssetType) -> ListingRecord {
        let mut raw = RawListing::new(id, format!("Listing {id}"), country);
        raw.is_active = true;
        ListingRecord::from_raw(raw, asset_type)
    }

    fn ids(listings: &[ListingRecord]) -> Vec<&str> {
        listings.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_conjunction_of_country_and_asset_type() {
        let listings = vec![
            listing("1", "US", AssetType::Cars),
            listing("2", "UK", AssetType::Cars),
            listing("3", "US", AssetType::Bikes),
        ];
        let query = FilterQuery::new().with_country("US").with_asset_type(AssetType::Cars);
        assert_eq!(ids(&filter(&listings, &query)), vec!["1"]);
    }

    #[test]
    fn test_empty_query_passes_everything_in_order() {
        let listings = vec![
            listing("b", "UK", AssetType::Other),
            listing("a", "US", AssetType::Cars),
            listing("c", "UK", AssetType::Bikes),
        ];
        assert_eq!(ids(&filter(&listings, &FilterQuery::new())), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_search_covers_all_text_fields_case_insensitively() {
        let mut by_title = listing("title", "US", AssetType::Cars);
        by_title.title = "Ford PICKUP".into();
        let mut by_short = listing("short", "US", AssetType::Cars);
        by_short.short_description = "pickup, 4WD".into();
        let mut by_desc = listing("desc", "US", AssetType::Cars);
        by_desc.description = "A pickup in good condition".into();
        let mut by_location = listing("loc", "US", AssetType::Cars);
        by_location.location = "Pickup Falls, ID".into();
        let miss = listing("miss", "US", AssetType::Cars);

        let listings = vec![by_title, by_short, by_desc, by_location, miss];
        let query = FilterQuery::new().with_search("PickUp");
        assert_eq!(ids(&filter(&listings, &query)), vec!["title", "short", "desc", "loc"]);
    }

    #[test]
    fn test_search_does_not_touch_country_field() {
        let listings = vec![listing("1", "Canada", AssetType::Other)];
        let query = FilterQuery::new().with_search("canada");
        assert!(filter(&listings, &query).is_empty());
    }

    #[test]
    fn test_stable_order_survivors() {
        let listings = vec![
            listing("1", "US", AssetType::Cars),
            listing("2", "UK", AssetType::Cars),
            listing("3", "US", AssetType::Bikes),
            listing("4", "US", AssetType::Cars),
        ];
        let query = FilterQuery::new().with_country("US");
        assert_eq!(ids(&filter(&listings, &query)), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        let query = FilterQuery::new().with_search("anything");
        assert!(filter(&[], &query).is_empty());
        assert!(filter_view(&[], ListingView::Future, &query).is_empty());
    }

    #[test]
    fn test_views_check_a_single_flag() {
        let active = listing("active", "US", AssetType::Cars);
        let mut future = listing("future", "US", AssetType::Cars);
        future.is_active = false;
        future.is_future = true;
        let mut historical = listing("historical", "Canada", AssetType::Other);
        historical.is_active = false;

        let listings = vec![active, future, historical];
        let q = FilterQuery::new();
        assert_eq!(ids(&filter_view(&listings, ListingView::Active, &q)), vec!["active"]);
        assert_eq!(ids(&filter_view(&listings, ListingView::Future, &q)), vec!["future"]);
        assert_eq!(ids(&filter_view(&listings, ListingView::Historical, &q)), vec!["historical"]);
    }

    #[test]
    fn test_toggles_and_clear() {
        let mut query = FilterQuery::new();
        assert!(!query.has_active_filters());

        query.toggle_country("United Kingdom");
        query.toggle_asset_type(AssetType::Cars);
        assert!(query.countries.contains("United Kingdom"));
        assert!(query.asset_types.contains(&AssetType::Cars));
        assert!(query.has_active_filters());

        query.toggle_country("United Kingdom");
        query.toggle_asset_type(AssetType::Cars);
        assert!(query.countries.is_empty());
        assert!(query.asset_types.is_empty());

        query.search_text = "truck".into();
        query.toggle_country("Canada");
        query.clear();
        assert_eq!(query, FilterQuery::new());
    }

    #[test]
    fn test_available_countries_first_seen_within_view() {
        let mut historical = listing("h", "Canada", AssetType::Other);
        historical.is_active = false;
        let listings = vec![
            listing("1", "United Kingdom", AssetType::Cars),
            historical,
            listing("2", "United States", AssetType::Cars),
            listing("3", "United Kingdom", AssetType::Bikes),
        ];
        assert_eq!(
            available_countries(&listings, ListingView::Active),
            vec!["United Kingdom".to_string(), "United States".to_string()]
        );
        assert_eq!(
            available_countries(&listings, ListingView::Historical),
            vec!["Canada".to_string()]
        );
    }

    #[test]
    fn test_view_param_parsing() {
        assert_eq!(ListingView::from_param("Active"), Some(ListingView::Active));
        assert_eq!(ListingView::from_param("future"), Some(ListingView::Future));
        assert_eq!(ListingView::from_param("sold"), None);
    }
}
