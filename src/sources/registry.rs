// =============================================================================
// sources/registry.rs — THE DATA SOURCE TABLE
// =============================================================================
//
// Every government source we list, with the license terms that come with it.
// Built once per process and never mutated. Listings point back here through
// `license_id` so the detail view can show the right attribution.
// =============================================================================

use std::sync::LazyLock;

use crate::models::{Attribution, DataSourceDescriptor};

pub const GSA_US: &str = "gsa-us";
pub const UK_SURPLUS: &str = "uk-surplus";
/// Publishes sold items only, so everything from it is historical.
pub const CANADA_GCSURPLUS: &str = "canada-gcsurplus";

static DATA_SOURCES: LazyLock<Vec<DataSourceDescriptor>> = LazyLock::new(|| {
    vec![
        DataSourceDescriptor {
            id: GSA_US.to_string(),
            name: "GSA Auctions".to_string(),
            country: "United States".to_string(),
            attribution: Some(Attribution {
                required: false,
                text: "Source: GSA Auctions (public domain)".to_string(),
                link: "https://gsaauctions.gov/".to_string(),
                license: "Public Domain".to_string(),
            }),
        },
        DataSourceDescriptor {
            id: UK_SURPLUS.to_string(),
            name: "UK Register of Surplus Land".to_string(),
            country: "United Kingdom".to_string(),
            attribution: Some(Attribution {
                required: true,
                text: "Contains public sector information licensed under the Open Government Licence v3.0"
                    .to_string(),
                link: "https://www.nationalarchives.gov.uk/doc/open-government-licence/version/3/"
                    .to_string(),
                license: "OGL v3.0".to_string(),
            }),
        },
        DataSourceDescriptor {
            id: CANADA_GCSURPLUS.to_string(),
            name: "GCSurplus Historical Sold Items".to_string(),
            country: "Canada".to_string(),
            attribution: Some(Attribution {
                required: true,
                text: "Contains information licensed under the Open Government Licence – Canada"
                    .to_string(),
                link: "https://open.canada.ca/en/open-government-licence-canada".to_string(),
                license: "OGL-Canada".to_string(),
            }),
        },
    ]
});

/// Every registered source, in table order.
pub fn all() -> &'static [DataSourceDescriptor] {
    &DATA_SOURCES
}

pub fn find(id: &str) -> Option<&'static DataSourceDescriptor> {
    DATA_SOURCES.iter().find(|source| source.id == id)
}

/// Sources carrying an attribution block, in table order.
pub fn with_attribution() -> Vec<&'static DataSourceDescriptor> {
    DATA_SOURCES
        .iter()
        .filter(|source| source.attribution.is_some())
        .collect()
}

/// Status-page note for sources with known dataset limitations.
pub fn note_for(id: &str) -> Option<&'static str> {
    match id {
        CANADA_GCSURPLUS => Some(
            "This dataset contains historical sold items. Active auction listings are not available from this source.",
        ),
        _ => None,
    }
}
