use serde_json::Value;

/// Path of the search results inside a listing response.
pub const MAP_RESULTS_POINTER: &str = "/data/cat1/searchResults/mapResults";

/// Search results exactly as the provider returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListingsResponse {
    pub results: Vec<Value>,
}

/// Street address used to look up a ZPID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressQuery {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
}
