// =============================================================================
// models.rs — LISTINGS, SOURCES, AND THE ASSET TAXONOMY
// =============================================================================
//
// A listing arrives from a source as a `RawListing` (no asset type), gets
// classified exactly once at ingestion, and lives on as an immutable
// `ListingRecord` until the next fetch cycle replaces the whole catalog.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed asset taxonomy. Declaration order IS the priority order:
/// `Ord` follows it, and so do `AssetType::ALL` and `priority_rank`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AssetType {
    /// Land parcels, buildings, offices, warehouses
    LandBuildings,
    Trailers,
    Cars,
    Motorcycles,
    /// Pedal bikes and e-bikes (motorbikes are `Motorcycles`)
    Bikes,
    /// Anything no keyword list claimed
    Other,
}

impl AssetType {
    /// All six types in canonical priority order. Filter UIs list options in this order.
    pub const ALL: [AssetType; 6] = [
        AssetType::LandBuildings,
        AssetType::Trailers,
        AssetType::Cars,
        AssetType::Motorcycles,
        AssetType::Bikes,
        AssetType::Other,
    ];

    /// The kebab-case wire name, e.g. `land-buildings`.
    pub fn slug(&self) -> &'static str {
        match self {
            AssetType::LandBuildings => "land-buildings",
            AssetType::Trailers => "trailers",
            AssetType::Cars => "cars",
            AssetType::Motorcycles => "motorcycles",
            AssetType::Bikes => "bikes",
            AssetType::Other => "other",
        }
    }

    /// Inverse of [`AssetType::slug`]. Unknown slugs yield `None`.
    pub fn from_slug(slug: &str) -> Option<AssetType> {
        AssetType::ALL.into_iter().find(|t| t.slug() == slug)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Where a listing sits in its auction lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Auction currently open
    Active,
    /// Announced, not open yet
    Future,
    /// Neither flag set: sold or closed, kept for reference
    Historical,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Active => write!(f, "Active"),
            Lifecycle::Future => write!(f, "Future"),
            Lifecycle::Historical => write!(f, "Historical"),
        }
    }
}

/// License/credit block some sources require us to display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribution {
    /// Whether the license obliges us to show `text` next to the data
    pub required: bool,
    pub text: String,
    pub link: String,
    pub license: String,
}

/// Static reference data about one upstream data source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSourceDescriptor {
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

/// A listing exactly as a source hands it over. Field names follow the
/// camelCase JSON the front end and the HTTP sources already speak.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub location: String,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Upstream category text, when the source has one. Only feeds the classifier.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub auction_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auction_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_name: String,
    /// Id of the registry entry whose license covers this record
    #[serde(default)]
    pub license_id: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_future: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RawListing {
    /// Minimal record; everything else defaults to empty/absent/false.
    pub fn new(id: impl Into<String>, title: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            country: country.into(),
            ..Default::default()
        }
    }
}

/// A classified listing. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub short_description: String,
    pub location: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub asset_type: AssetType,
    pub auction_start_date: Option<DateTime<Utc>>,
    pub auction_end_date: Option<DateTime<Utc>>,
    pub source_url: String,
    pub source_name: String,
    pub license_id: Option<String>,
    pub is_active: bool,
    pub is_future: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ListingRecord {
    /// Attach a derived asset type to a raw record. The upstream `category`
    /// has done its job by now and is not carried further.
    pub fn from_raw(raw: RawListing, asset_type: AssetType) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            description: raw.description,
            short_description: raw.short_description,
            location: raw.location,
            country: raw.country,
            state: raw.state,
            region: raw.region,
            city: raw.city,
            asset_type,
            auction_start_date: raw.auction_start_date,
            auction_end_date: raw.auction_end_date,
            source_url: raw.source_url,
            source_name: raw.source_name,
            license_id: raw.license_id,
            is_active: raw.is_active,
            is_future: raw.is_future,
            image_url: raw.image_url,
            images: raw.images,
            created_at: raw.created_at,
        }
    }

    /// `is_active` wins over `is_future` if a source ever sets both.
    pub fn lifecycle(&self) -> Lifecycle {
        if self.is_active {
            Lifecycle::Active
        } else if self.is_future {
            Lifecycle::Future
        } else {
            Lifecycle::Historical
        }
    }

    /// First gallery image, else the single `image_url`.
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(String::as_str)
            .or(self.image_url.as_deref())
    }

    /// Card countdown label: `Ended`, or `Ending in Nd/Nh/Nm` using the
    /// largest non-zero unit. `None` when the listing has no end date.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<String> {
        let end = self.auction_end_date?;
        let diff = end - now;
        if diff.num_milliseconds() <= 0 {
            return Some("Ended".to_string());
        }

        let days = diff.num_days();
        let hours = diff.num_hours() % 24;
        let minutes = diff.num_minutes() % 60;

        Some(if days > 0 {
            format!("Ending in {days}d")
        } else if hours > 0 {
            format!("Ending in {hours}h")
        } else {
            format!("Ending in {minutes}m")
        })
    }
}

/// A source that failed during a fetch cycle. Shown to visitors as
/// "some data sources are currently unavailable".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchError {
    pub source: String,
    pub error: String,
}

/// Deep link that scrolls to a card and opens its detail modal.
/// The link carries only the listing id; if two sources share an id it
/// resolves to the first source's listing.
pub fn share_link(base_url: &str, listing_id: &str) -> String {
    let base = base_url.split('#').next().unwrap_or(base_url);
    format!("{}#item-{}+expand", base, urlencoding::encode(listing_id))
}

/// Parse a URL fragment produced by [`share_link`] (or the plain
/// `#item-{id}` anchor). Returns the listing id and whether the modal
/// should open.
pub fn parse_deep_link(fragment: &str) -> Option<(String, bool)> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let rest = fragment.strip_prefix("item-")?;
    let (encoded, expand) = match rest.strip_suffix("+expand") {
        Some(id) => (id, true),
        None => (rest, false),
    };
    if encoded.is_empty() {
        return None;
    }
    let id = urlencoding::decode(encoded).ok()?.into_owned();
    Some((id, expand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record_ending_at(end: Option<DateTime<Utc>>) -> ListingRecord {
        let mut raw = RawListing::new("gsa-001", "Office Building", "United States");
        raw.auction_end_date = end;
        ListingRecord::from_raw(raw, AssetType::LandBuildings)
    }

    #[test]
    fn test_asset_type_slugs_round_trip() {
        for t in AssetType::ALL {
            assert_eq!(AssetType::from_slug(t.slug()), Some(t));
        }
        assert_eq!(AssetType::from_slug("boats"), None);
    }

    #[test]
    fn test_asset_type_serializes_kebab_case() {
        let json = serde_json::to_string(&AssetType::LandBuildings).unwrap();
        assert_eq!(json, "\"land-buildings\"");
    }

    #[test]
    fn test_raw_listing_decodes_camel_case_with_defaults() {
        let json = r#"{
            "id": "uk-001",
            "title": "Surplus Land Parcel",
            "shortDescription": "2.5 acres",
            "country": "United Kingdom",
            "region": "Greater Manchester",
            "isActive": true
        }"#;
        let raw: RawListing = serde_json::from_str(json).unwrap();
        assert_eq!(raw.short_description, "2.5 acres");
        assert_eq!(raw.region.as_deref(), Some("Greater Manchester"));
        assert!(raw.state.is_none());
        assert!(raw.is_active);
        assert!(!raw.is_future);
    }

    #[test]
    fn test_lifecycle_from_flags() {
        let mut record = record_ending_at(None);
        assert_eq!(record.lifecycle(), Lifecycle::Historical);
        record.is_future = true;
        assert_eq!(record.lifecycle(), Lifecycle::Future);
        record.is_active = true;
        assert_eq!(record.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn test_time_remaining_picks_largest_unit() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(record_ending_at(None).time_remaining(now), None);
        assert_eq!(
            record_ending_at(Some(now - Duration::minutes(1))).time_remaining(now).as_deref(),
            Some("Ended")
        );
        assert_eq!(
            record_ending_at(Some(now)).time_remaining(now).as_deref(),
            Some("Ended")
        );
        assert_eq!(
            record_ending_at(Some(now + Duration::days(14))).time_remaining(now).as_deref(),
            Some("Ending in 14d")
        );
        assert_eq!(
            record_ending_at(Some(now + Duration::hours(5) + Duration::minutes(3)))
                .time_remaining(now)
                .as_deref(),
            Some("Ending in 5h")
        );
        assert_eq!(
            record_ending_at(Some(now + Duration::minutes(42))).time_remaining(now).as_deref(),
            Some("Ending in 42m")
        );
    }

    #[test]
    fn test_share_link_and_parse() {
        let link = share_link("https://example.org/future#old", "gsa 002");
        assert_eq!(link, "https://example.org/future#item-gsa%20002+expand");

        let fragment = link.split_once('#').map(|(_, f)| f).unwrap();
        assert_eq!(parse_deep_link(fragment), Some(("gsa 002".to_string(), true)));
        assert_eq!(parse_deep_link("#item-uk-001"), Some(("uk-001".to_string(), false)));
        assert_eq!(parse_deep_link("#item-"), None);
        assert_eq!(parse_deep_link("#comments"), None);
    }

    #[test]
    fn test_primary_image_prefers_gallery() {
        let mut record = record_ending_at(None);
        assert_eq!(record.primary_image(), None);
        record.image_url = Some("single.jpg".into());
        assert_eq!(record.primary_image(), Some("single.jpg"));
        record.images = vec!["gallery-1.jpg".into()];
        assert_eq!(record.primary_image(), Some("gallery-1.jpg"));
    }
}
