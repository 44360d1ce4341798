use crate::config::{ProviderSettings, Secret, Settings};
use crate::error::{Error, Result};
use crate::ingest::types::{AddressQuery, RawListingsResponse, MAP_RESULTS_POINTER};
use serde_json::Value;
use std::time::Duration;

const LISTING_PATH: &str = "/v1/scrapers/zillow/listing";
const PROPERTY_PATH: &str = "/v1/scrapers/zillow/property";
const ZPID_BY_ADDRESS_PATH: &str = "/v1/scrapers/zillow/zpidByAddress";

// Error bodies can be whole HTML pages; keep messages readable.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[async_trait::async_trait]
pub trait ListingProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Runs the saved search at `search_url` and returns its result entries.
    async fn fetch_listings(&self, search_url: &str) -> Result<RawListingsResponse>;

    async fn fetch_property_detail(&self, zpid: &str) -> Result<Value>;

    async fn resolve_property_id(&self, address: &AddressQuery) -> Result<Value>;
}

/// Client for the Scrapeak Zillow endpoints. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct ScrapeakClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Secret,
}

impl ScrapeakClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = build_http_client(&settings.provider)?;
        Ok(Self::with_http(
            http,
            &settings.provider.base_url,
            settings.api_key.clone(),
        ))
    }

    pub fn with_http(http: reqwest::Client, base_url: &str, api_key: Secret) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut query = Vec::with_capacity(params.len() + 1);
        query.push(("api_key", self.api_key.expose()));
        query.extend_from_slice(params);

        let res = self
            .http
            .get(self.url(path))
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(path, "request", e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| transport_error(path, "response read", e))?;
        tracing::debug!(path, %status, bytes = text.len(), "provider response");

        if !status.is_success() {
            return Err(Error::Network(format!(
                "{path} returned HTTP {status}: {}",
                truncate(&text, MAX_ERROR_BODY_CHARS)
            )));
        }

        serde_json::from_str::<Value>(&text)
            .map_err(|e| Error::Schema(format!("{path} response is not valid JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl ListingProvider for ScrapeakClient {
    fn provider_name(&self) -> &'static str {
        "scrapeak"
    }

    async fn fetch_listings(&self, search_url: &str) -> Result<RawListingsResponse> {
        let raw = self
            .get_json(LISTING_PATH, &[("url", search_url)])
            .await?;
        let results = extract_map_results(raw)?;
        tracing::info!(
            provider = self.provider_name(),
            results = results.len(),
            "fetched listing search results"
        );
        Ok(RawListingsResponse { results })
    }

    async fn fetch_property_detail(&self, zpid: &str) -> Result<Value> {
        let raw = self.get_json(PROPERTY_PATH, &[("zpid", zpid)]).await?;
        take_data(raw, PROPERTY_PATH)
    }

    async fn resolve_property_id(&self, address: &AddressQuery) -> Result<Value> {
        let mut params = vec![
            ("street", address.street.as_str()),
            ("city", address.city.as_str()),
            ("state", address.state.as_str()),
        ];
        if let Some(zip) = address.zip_code.as_deref() {
            params.push(("zip_code", zip));
        }

        let raw = self.get_json(ZPID_BY_ADDRESS_PATH, &params).await?;
        take_data(raw, ZPID_BY_ADDRESS_PATH)
    }
}

fn build_http_client(settings: &ProviderSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| Error::Network(format!("failed to build provider http client: {e}")))
}

/// Describes a reqwest failure with its cause chain, e.g.
/// `request timed out: error sending request: operation timed out`.
fn transport_error(path: &str, stage: &str, err: reqwest::Error) -> Error {
    let outcome = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "could not connect"
    } else {
        "failed"
    };

    // The URL carries the API key; drop it from the error.
    let err = err.without_url();
    let mut detail = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }

    Error::Network(format!("{path} {stage} {outcome}: {detail}"))
}

/// Pulls `data.cat1.searchResults.mapResults` out of a listing response.
pub fn extract_map_results(mut raw: Value) -> Result<Vec<Value>> {
    match raw.pointer_mut(MAP_RESULTS_POINTER).map(Value::take) {
        Some(Value::Array(results)) => Ok(results),
        Some(other) => Err(Error::Schema(format!(
            "data.cat1.searchResults.mapResults is not a list (got {})",
            json_type(&other)
        ))),
        None => Err(Error::Schema(
            "response has no data.cat1.searchResults.mapResults".to_string(),
        )),
    }
}

fn take_data(mut raw: Value, path: &str) -> Result<Value> {
    match raw.get_mut("data").map(Value::take) {
        Some(data) => Ok(data),
        None => Err(Error::Schema(format!("{path} response has no `data` member"))),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
