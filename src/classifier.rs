// =============================================================================
// classifier.rs — ASSET TYPE CLASSIFICATION
// =============================================================================
//
// Every listing gets exactly one asset type, derived from whatever free text
// the source gave us (category, title, description). The rules:
//
// 1. Join the present fields with spaces and lower-case the result.
// 2. Walk the asset types in priority order (land-buildings, trailers, cars,
//    motorcycles, bikes). The first type with ANY keyword occurring as a
//    substring wins.
// 3. Nothing matched? `Other`.
//
// Substring means substring: "car" matches inside "cargo" and "lot" inside
// "pilot". The keyword tables are what the front end has always used, so
// changing either the lists or the order changes which tab a listing shows
// up under.
//
// Each keyword list is compiled into its own Aho-Corasick automaton once per
// process, so a check is a single pass over the text per asset type.
// =============================================================================

use aho_corasick::AhoCorasick;
use rayon::prelude::*;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::{AssetType, ListingRecord, RawListing};

/// Keyword table in priority order. `Other` has no keywords and is never
/// tested; it is the fallback.
const ASSET_KEYWORDS: &[(AssetType, &[&str])] = &[
    (
        AssetType::LandBuildings,
        &[
            "land",
            "parcel",
            "property",
            "building",
            "lot",
            "acreage",
            "real estate",
            "commercial property",
            "residential property",
            "warehouse",
            "office",
            "facility",
            "estate",
            "tract",
        ],
    ),
    (
        AssetType::Trailers,
        &[
            "trailer",
            "semi-trailer",
            "hauler",
            "utility trailer",
            "cargo trailer",
            "flatbed trailer",
        ],
    ),
    (
        AssetType::Cars,
        &[
            "car",
            "sedan",
            "coupe",
            "hatchback",
            "suv",
            "vehicle",
            "automobile",
            "truck",
            "van",
            "pickup",
        ],
    ),
    (
        AssetType::Motorcycles,
        &[
            "motorcycle",
            "motorbike",
            "bike with engine",
            "scooter",
            "dirt bike",
            "sport bike",
            "cruiser",
        ],
    ),
    (
        AssetType::Bikes,
        &[
            "bicycle",
            "e-bike",
            "electric bike",
            "mountain bike",
            "road bike",
            "cycle",
            "pedal bike",
        ],
    ),
];

/// One automaton per keyword list, same order as `ASSET_KEYWORDS`.
/// Keywords are already lower-case and the haystack is lower-cased before
/// matching, so the automata are case-sensitive.
static ASSET_AUTOMATA: LazyLock<Vec<(AssetType, AhoCorasick)>> = LazyLock::new(|| {
    ASSET_KEYWORDS
        .iter()
        .map(|(asset_type, keywords)| {
            let automaton = AhoCorasick::new(keywords.iter())
                .expect("static asset keyword lists always compile");
            (*asset_type, automaton)
        })
        .collect()
});

/// Classify a listing from its free-text fields. Any field may be absent or
/// empty. Total and deterministic: every input maps to exactly one type.
pub fn classify(category: Option<&str>, title: Option<&str>, description: Option<&str>) -> AssetType {
    let search_text = [category, title, description]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if search_text.is_empty() {
        return AssetType::Other;
    }

    for (asset_type, automaton) in ASSET_AUTOMATA.iter() {
        if automaton.is_match(&search_text) {
            debug!(asset_type = %asset_type, "Listing text classified");
            return *asset_type;
        }
    }

    AssetType::Other
}

/// Classify a raw listing from its category, title and description.
pub fn classify_listing(raw: &RawListing) -> AssetType {
    classify(
        raw.category.as_deref(),
        Some(raw.title.as_str()),
        Some(raw.description.as_str()),
    )
}

/// Classify a whole fetch cycle in parallel. Output order matches input order.
pub fn classify_batch(raws: Vec<RawListing>) -> Vec<ListingRecord> {
    raws.into_par_iter()
        .map(|raw| {
            let asset_type = classify_listing(&raw);
            ListingRecord::from_raw(raw, asset_type)
        })
        .collect()
}

/// Zero-based position of `asset_type` in the fixed priority sequence
/// `[land-buildings, trailers, cars, motorcycles, bikes, other]`.
pub fn priority_rank(asset_type: AssetType) -> usize {
    match asset_type {
        AssetType::LandBuildings => 0,
        AssetType::Trailers => 1,
        AssetType::Cars => 2,
        AssetType::Motorcycles => 3,
        AssetType::Bikes => 4,
        AssetType::Other => 5,
    }
}

/// Human-readable label for badges and filter toggles.
pub fn display_label(asset_type: AssetType) -> &'static str {
    match asset_type {
        AssetType::LandBuildings => "Land & Buildings",
        AssetType::Trailers => "Trailers",
        AssetType::Cars => "Cars",
        AssetType::Motorcycles => "Motorcycles",
        AssetType::Bikes => "Bikes",
        AssetType::Other => "Other",
    }
}
