use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Column names of the CSV export, in order. Matches the serde names of
/// [`ListingRecord`].
pub const LISTING_CSV_HEADER: [&str; 12] = [
    "zpid",
    "address",
    "zipcode",
    "price",
    "bedrooms",
    "bathrooms",
    "living_area",
    "home_type",
    "status_type",
    "latitude",
    "longitude",
    "detail_url",
];

/// A listing after flattening and type coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub zpid: Option<String>,
    pub address: String,
    #[serde(rename = "zipcode")]
    pub zip_code: u32,
    pub price: f64,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub living_area: Option<f64>,
    pub home_type: Option<String>,
    pub status_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub detail_url: Option<String>,

    /// Every provider field, keyed by its dotted path.
    #[serde(skip)]
    pub attributes: BTreeMap<String, Value>,
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub const DEFAULT_MIN: f64 = 10_000.0;
    pub const DEFAULT_MAX: f64 = 300_000.0;

    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}
