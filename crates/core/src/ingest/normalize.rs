//! Turns raw search results into typed, filtered listing records.
//!
//! Each result entry is flattened into dotted-path fields first
//! (`hdpData.homeInfo.zipcode`), then the fields we care about are coerced.
//! Entries without a zip code are dropped silently; entries whose zip code or
//! price cannot be coerced are skipped and reported as [`DataError`]s.

use crate::domain::listing::{ListingRecord, PriceRange};
use crate::error::DataError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

const ZIP_CODE_FIELD: &str = "hdpData.homeInfo.zipcode";
const PRICE_FIELD: &str = "hdpData.homeInfo.price";

#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<ListingRecord>,
    /// Entries dropped because they carry no zip code.
    pub missing_zip: usize,
    pub rejected: Vec<DataError>,
}

/// Flattens nested objects into dotted keys. Arrays and scalars are kept as
/// values. Non-object entries flatten to nothing.
pub fn flatten(entry: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = entry {
        flatten_into("", map, &mut out);
    }
    out
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut BTreeMap<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&path, inner, out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}

pub fn normalize(results: &[Value]) -> Normalized {
    let mut out = Normalized::default();

    for (index, entry) in results.iter().enumerate() {
        let fields = flatten(entry);
        match to_record(index, fields) {
            Ok(Some(record)) => out.records.push(record),
            Ok(None) => out.missing_zip += 1,
            Err(err) => {
                tracing::warn!(error = %err, "skipping listing");
                out.rejected.push(err);
            }
        }
    }

    tracing::debug!(
        total = results.len(),
        records = out.records.len(),
        missing_zip = out.missing_zip,
        rejected = out.rejected.len(),
        "normalized listings"
    );
    out
}

/// Keeps records in the configured zip codes and price range, in input order.
pub fn filter(
    records: Vec<ListingRecord>,
    zip_codes: &BTreeSet<u32>,
    price_range: PriceRange,
) -> Vec<ListingRecord> {
    records
        .into_iter()
        .filter(|r| zip_codes.contains(&r.zip_code) && price_range.contains(r.price))
        .collect()
}

/// [`normalize`] then [`filter`], for callers that do not need the drop and
/// rejection counts. The worker calls the two steps itself to report them.
pub fn normalize_and_filter(
    results: &[Value],
    zip_codes: &BTreeSet<u32>,
    price_range: PriceRange,
) -> Vec<ListingRecord> {
    filter(normalize(results).records, zip_codes, price_range)
}

fn to_record(
    index: usize,
    fields: BTreeMap<String, Value>,
) -> Result<Option<ListingRecord>, DataError> {
    let zip_code = match fields.get(ZIP_CODE_FIELD) {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => coerce_zip_code(v).ok_or_else(|| DataError::InvalidZipCode {
            index,
            value: v.to_string(),
        })?,
    };

    let price = match fields.get(PRICE_FIELD) {
        None | Some(Value::Null) => return Err(DataError::MissingPrice { index }),
        Some(v) => coerce_number(v).ok_or_else(|| DataError::InvalidPrice {
            index,
            value: v.to_string(),
        })?,
    };

    Ok(Some(ListingRecord {
        zpid: text(&fields, "zpid").or_else(|| text(&fields, "hdpData.homeInfo.zpid")),
        address: text(&fields, "address").unwrap_or_default(),
        zip_code,
        price,
        bedrooms: number(&fields, "hdpData.homeInfo.bedrooms"),
        bathrooms: number(&fields, "hdpData.homeInfo.bathrooms"),
        living_area: number(&fields, "hdpData.homeInfo.livingArea"),
        home_type: text(&fields, "hdpData.homeInfo.homeType"),
        status_type: text(&fields, "statusType"),
        latitude: number(&fields, "latLong.latitude"),
        longitude: number(&fields, "latLong.longitude"),
        detail_url: text(&fields, "detailUrl"),
        attributes: fields,
    }))
}

fn coerce_zip_code(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                return u32::try_from(i).ok();
            }
            let f = n.as_f64()?;
            (f.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&f)).then_some(f as u32)
        }
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn coerce_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn text(fields: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Optional attributes are best effort: anything non-numeric reads as absent.
fn number(fields: &BTreeMap<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(coerce_number)
}
