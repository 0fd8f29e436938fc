// =============================================================================
// grouping.rs — COUNTRY / SUB-REGION GROUPING
// =============================================================================
//
// Turns a flat (already filtered) listing sequence into the two-level
// structure the page renders: country → sub-region → listings.
//
// Ordering rules, all of which the front end relies on:
// - Countries and sub-regions appear in first-seen order, NOT alphabetical.
// - Within a sub-region, listings are sorted by asset-type priority with a
//   stable sort, so equal types keep the order the sources returned them in.
//
// A fresh structure is built on every call; nothing is updated in place.
// =============================================================================

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::classifier::priority_rank;
use crate::models::ListingRecord;

/// Sub-region label for listings without a state, region, or city.
pub const FALLBACK_SUB_REGION: &str = "Other";

/// Listings under one sub-region, in display order.
pub type SubRegionGroup = Vec<ListingRecord>;

/// Sub-regions of one country, in first-seen order.
pub type CountryGroup = IndexMap<String, SubRegionGroup>;

/// The grouped view: country → sub-region → listings, every level in
/// display order. Serializes as nested JSON objects with keys in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GroupedView {
    countries: IndexMap<String, CountryGroup>,
}

impl GroupedView {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Number of countries.
    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// Total listings across every group.
    pub fn listing_count(&self) -> usize {
        self.countries
            .values()
            .flat_map(|regions| regions.values())
            .map(Vec::len)
            .sum()
    }

    pub fn country(&self, country: &str) -> Option<&CountryGroup> {
        self.countries.get(country)
    }

    pub fn sub_region(&self, country: &str, sub_region: &str) -> Option<&[ListingRecord]> {
        self.countries
            .get(country)?
            .get(sub_region)
            .map(Vec::as_slice)
    }

    /// Countries in display order.
    pub fn countries(&self) -> impl Iterator<Item = (&str, &CountryGroup)> {
        self.countries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flattened `(country, sub_region, listings)` triples in display order.
    pub fn iter_groups(&self) -> impl Iterator<Item = (&str, &str, &[ListingRecord])> {
        self.countries.iter().flat_map(|(country, regions)| {
            regions
                .iter()
                .map(move |(region, items)| (country.as_str(), region.as_str(), items.as_slice()))
        })
    }
}

/// Grouping key beneath country: the first of state, region, city that is
/// present AND non-empty, otherwise [`FALLBACK_SUB_REGION`].
pub fn sub_region_key(listing: &ListingRecord) -> &str {
    [&listing.state, &listing.region, &listing.city]
        .into_iter()
        .find_map(|field| field.as_deref().filter(|value| !value.is_empty()))
        .unwrap_or(FALLBACK_SUB_REGION)
}

/// Group `listings` by country and sub-region. Empty input yields an empty view.
pub fn group(listings: &[ListingRecord]) -> GroupedView {
    let mut countries: IndexMap<String, CountryGroup> = IndexMap::new();

    for listing in listings {
        countries
            .entry(listing.country.clone())
            .or_default()
            .entry(sub_region_key(listing).to_string())
            .or_default()
            .push(listing.clone());
    }

    for regions in countries.values_mut() {
        for items in regions.values_mut() {
            // sort_by_key is stable
            items.sort_by_key(|listing| priority_rank(listing.asset_type));
        }
    }

    debug!(
        listings = listings.len(),
        countries = countries.len(),
        "Listings grouped"
    );

    GroupedView { countries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetType, RawListing};

    fn listing(id: &str, country: &str, state: Option<&str>, asset_type: AssetType) -> ListingRecord {
        let mut raw = RawListing::new(id, id, country);
        raw.state = state.map(str::to_string);
        ListingRecord::from_raw(raw, asset_type)
    }

    #[test]
    fn test_countries_in_first_seen_order() {
        let listings = vec![
            listing("1", "UK", None, AssetType::Cars),
            listing("2", "US", None, AssetType::Cars),
            listing("3", "UK", None, AssetType::Cars),
        ];
        let view = group(&listings);
        let countries: Vec<&str> = view.countries().map(|(c, _)| c).collect();
        assert_eq!(countries, vec!["UK", "US"]);
        assert_eq!(view.listing_count(), 3);
    }

    #[test]
    fn test_sub_regions_in_first_seen_order() {
        let listings = vec![
            listing("1", "US", Some("Texas"), AssetType::Cars),
            listing("2", "US", Some("Arizona"), AssetType::Cars),
            listing("3", "US", Some("Texas"), AssetType::Cars),
        ];
        let view = group(&listings);
        let regions: Vec<&str> = view
            .country("US")
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(regions, vec!["Texas", "Arizona"]);
    }

    #[test]
    fn test_intra_region_stable_priority_sort() {
        let listings = vec![
            listing("bike", "US", Some("TX"), AssetType::Bikes),
            listing("car-1", "US", Some("TX"), AssetType::Cars),
            listing("land", "US", Some("TX"), AssetType::LandBuildings),
            listing("car-2", "US", Some("TX"), AssetType::Cars),
        ];
        let view = group(&listings);
        let ids: Vec<&str> = view
            .sub_region("US", "TX")
            .unwrap()
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids, vec!["land", "car-1", "car-2", "bike"]);
    }

    #[test]
    fn test_sub_region_precedence() {
        let mut all = listing("1", "US", Some("Texas"), AssetType::Cars);
        all.region = Some("South".into());
        all.city = Some("Austin".into());
        assert_eq!(sub_region_key(&all), "Texas");

        let mut region_city = listing("2", "UK", None, AssetType::Cars);
        region_city.region = Some("Greater London".into());
        region_city.city = Some("London".into());
        assert_eq!(sub_region_key(&region_city), "Greater London");

        let mut city_only = listing("3", "Canada", None, AssetType::Other);
        city_only.city = Some("Ottawa".into());
        assert_eq!(sub_region_key(&city_only), "Ottawa");

        let nothing = listing("4", "Canada", None, AssetType::Other);
        assert_eq!(sub_region_key(&nothing), FALLBACK_SUB_REGION);
    }

    #[test]
    fn test_empty_strings_fall_through() {
        let mut record = listing("1", "UK", Some(""), AssetType::Cars);
        record.region = Some(String::new());
        record.city = Some("Leeds".into());
        assert_eq!(sub_region_key(&record), "Leeds");

        record.city = Some(String::new());
        assert_eq!(sub_region_key(&record), "Other");
    }

    #[test]
    fn test_empty_input_groups_to_empty_view() {
        let view = group(&[]);
        assert!(view.is_empty());
        assert_eq!(view.listing_count(), 0);
        assert_eq!(view.iter_groups().count(), 0);
    }

    #[test]
    fn test_grouping_is_deterministic() {
        let listings = vec![
            listing("1", "UK", Some("Kent"), AssetType::Other),
            listing("2", "US", None, AssetType::Cars),
            listing("3", "UK", Some("Kent"), AssetType::Trailers),
        ];
        assert_eq!(group(&listings), group(&listings));
    }

    #[test]
    fn test_serializes_in_display_order() {
        let listings = vec![
            listing("z", "Zambia", Some("Lusaka"), AssetType::Other),
            listing("a", "Austria", Some("Tyrol"), AssetType::Other),
        ];
        let json = serde_json::to_string(&group(&listings)).unwrap();
        let zambia = json.find("Zambia").unwrap();
        let austria = json.find("Austria").unwrap();
        assert!(zambia < austria);
    }
}
