// =============================================================================
// sources/mock_source.rs — FIXTURE LISTINGS
// =============================================================================
//
// Stand-in for the real government feeds until their integrations land.
// One `MockSource` per registry entry, each serving its own slice of the
// fixture set. Dates are relative to `now` so active auctions always end
// two weeks out.
// =============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::registry::{CANADA_GCSURPLUS, GSA_US, UK_SURPLUS};
use super::{ListingSource, SourceError};
use crate::models::{DataSourceDescriptor, RawListing};

const GSA_URL: &str = "https://gsaauctions.gov/";
const UK_DATASET_URL: &str = "https://www.data.gov.uk/dataset/49b15726-1603-4618-b7bb-38af6ed111e8";
const UK_URL: &str = "https://www.data.gov.uk/";
const CANADA_URL: &str = "https://open.canada.ca/data/en/dataset/1a09c5c1-3554-4b70-9e53-6322a72ec7d4";

pub struct MockSource {
    descriptor: DataSourceDescriptor,
    /// Fixed clock for tests; `None` reads the wall clock on every fetch.
    pinned_now: Option<DateTime<Utc>>,
}

impl MockSource {
    pub fn new(descriptor: DataSourceDescriptor) -> Self {
        Self {
            descriptor,
            pinned_now: None,
        }
    }

    pub fn for_source(descriptor: DataSourceDescriptor, now: DateTime<Utc>) -> Self {
        Self {
            descriptor,
            pinned_now: Some(now),
        }
    }
}

#[async_trait]
impl ListingSource for MockSource {
    fn descriptor(&self) -> &DataSourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self) -> Result<Vec<RawListing>, SourceError> {
        let now = self.pinned_now.unwrap_or_else(Utc::now);
        Ok(fixtures(now)
            .into_iter()
            .filter(|raw| raw.license_id.as_deref() == Some(self.descriptor.id.as_str()))
            .collect())
    }
}

struct Fixture {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    short_description: &'static str,
    location: &'static str,
    country: &'static str,
    state: Option<&'static str>,
    region: Option<&'static str>,
    city: &'static str,
    source_url: &'static str,
    source_name: &'static str,
    license_id: &'static str,
}

impl Fixture {
    fn into_raw(self, now: DateTime<Utc>) -> RawListing {
        RawListing {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            short_description: self.short_description.to_string(),
            location: self.location.to_string(),
            country: self.country.to_string(),
            state: self.state.map(str::to_string),
            region: self.region.map(str::to_string),
            city: Some(self.city.to_string()),
            source_url: self.source_url.to_string(),
            source_name: self.source_name.to_string(),
            license_id: Some(self.license_id.to_string()),
            created_at: Some(now),
            ..Default::default()
        }
    }
}

/// The full fixture set, all sources, in source table order.
pub fn fixtures(now: DateTime<Utc>) -> Vec<RawListing> {
    let end = now + Duration::days(14);

    let open_with_start = |fixture: Fixture| {
        let mut raw = fixture.into_raw(now);
        raw.auction_start_date = Some(now);
        raw.auction_end_date = Some(end);
        raw.is_active = true;
        raw
    };
    let open_without_start = |fixture: Fixture| {
        let mut raw = fixture.into_raw(now);
        raw.auction_end_date = Some(end);
        raw.is_active = true;
        raw
    };

    vec![
        open_with_start(Fixture {
            id: "gsa-001",
            title: "Commercial Building - Downtown Office Space",
            description: "Well-maintained 5-story commercial office building in prime downtown location. Approximately 25,000 sq ft of leasable space.",
            short_description: "5-story commercial office building, 25,000 sq ft",
            location: "Washington, DC",
            country: "United States",
            state: Some("District of Columbia"),
            region: None,
            city: "Washington",
            source_url: GSA_URL,
            source_name: "GSA Auctions",
            license_id: GSA_US,
        }),
        open_with_start(Fixture {
            id: "gsa-002",
            title: "2018 Ford F-150 Pickup Truck",
            description: "Government surplus pickup truck in good condition. 4WD, V8 engine, approximately 45,000 miles.",
            short_description: "2018 Ford F-150, 4WD, 45k miles",
            location: "Austin, TX",
            country: "United States",
            state: Some("Texas"),
            region: None,
            city: "Austin",
            source_url: GSA_URL,
            source_name: "GSA Auctions",
            license_id: GSA_US,
        }),
        open_with_start(Fixture {
            id: "gsa-003",
            title: "Utility Trailer - Dual Axle",
            description: "Heavy-duty utility trailer with dual axles. 16-foot bed, excellent for hauling equipment or vehicles.",
            short_description: "Heavy-duty 16-foot dual axle utility trailer",
            location: "Phoenix, AZ",
            country: "United States",
            state: Some("Arizona"),
            region: None,
            city: "Phoenix",
            source_url: GSA_URL,
            source_name: "GSA Auctions",
            license_id: GSA_US,
        }),
        open_with_start(Fixture {
            id: "gsa-004",
            title: "Harley-Davidson Police Motorcycle",
            description: "Retired police motorcycle in working condition. Well-maintained, ready for civilian use.",
            short_description: "Retired police motorcycle, working condition",
            location: "Miami, FL",
            country: "United States",
            state: Some("Florida"),
            region: None,
            city: "Miami",
            source_url: GSA_URL,
            source_name: "GSA Auctions",
            license_id: GSA_US,
        }),
        open_without_start(Fixture {
            id: "uk-001",
            title: "Surplus Land Parcel - Former Council Property",
            description: "Approximately 2.5 acres of land formerly used for council operations. Zoned for mixed-use development.",
            short_description: "2.5 acres surplus land, mixed-use zoning",
            location: "Manchester",
            country: "United Kingdom",
            state: None,
            region: Some("Greater Manchester"),
            city: "Manchester",
            source_url: UK_DATASET_URL,
            source_name: "UK Register of Surplus Land",
            license_id: UK_SURPLUS,
        }),
        open_without_start(Fixture {
            id: "uk-002",
            title: "Government Fleet Vehicle - 2019 Vauxhall Astra",
            description: "Former government fleet vehicle in good condition. Regular maintenance records available.",
            short_description: "2019 Vauxhall Astra, ex-government fleet",
            location: "London",
            country: "United Kingdom",
            state: None,
            region: Some("Greater London"),
            city: "London",
            source_url: UK_URL,
            source_name: "UK Register of Surplus Land",
            license_id: UK_SURPLUS,
        }),
        // Sold already: neither active nor future
        Fixture {
            id: "canada-001",
            title: "Office Furniture Lot - Desks and Chairs",
            description: "Previously sold government surplus office furniture. Historical listing for reference.",
            short_description: "Office furniture lot (Historical)",
            location: "Ottawa, ON",
            country: "Canada",
            state: None,
            region: Some("Ontario"),
            city: "Ottawa",
            source_url: CANADA_URL,
            source_name: "GCSurplus Historical Sold Items",
            license_id: CANADA_GCSURPLUS,
        }
        .into_raw(now),
    ]
}
