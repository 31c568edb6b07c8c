//! Search results and response normalization
//!
//! Maps a transport outcome into a `SearchResult`, decorates successful
//! payloads with country metadata, and applies the optional post-processing
//! steps (the synthetic "All States" row and self-country exclusion).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::fmt;

use crate::country::CountryRecord;
use crate::transport::TransportError;

/// Identifier carried by the synthetic "All States" row
pub const ALL_STATES_ID: u64 = 683735635;

/// Display name of the synthetic "All States" row
pub const ALL_STATES_NAME: &str = "All States";

/// Message attached to empty results
pub const EMPTY_MESSAGE: &str = "Empty response data.";

/// Outcome of a lookup, serialized as its numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum SearchStatus {
    /// The provider returned at least one place
    Success,
    /// Well-formed response without matches
    Empty,
    /// Network, TLS or timeout failure
    TransportError,
}

impl SearchStatus {
    pub fn code(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Empty => 201,
            Self::TransportError => 202,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::Success => "has_data",
            Self::Empty => "data_empty",
            Self::TransportError => "request_error",
        }
    }
}

impl From<SearchStatus> for u16 {
    fn from(status: SearchStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for SearchStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Self::Success),
            201 => Ok(Self::Empty),
            202 => Ok(Self::TransportError),
            other => Err(format!("unknown search status {}", other)),
        }
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.text())
    }
}

/// Tagged result record returned by every lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub status: SearchStatus,
    #[serde(rename = "statusText")]
    pub status_text: String,
    /// Provider payload (merged with country metadata on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Request URL, kept on empty results for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchResult {
    pub fn success(data: Map<String, Value>) -> Self {
        Self {
            status: SearchStatus::Success,
            status_text: SearchStatus::Success.text().to_string(),
            data: Some(Value::Object(data)),
            url: None,
            message: None,
        }
    }

    pub fn empty(url: impl Into<String>, payload: Value) -> Self {
        Self {
            status: SearchStatus::Empty,
            status_text: SearchStatus::Empty.text().to_string(),
            data: Some(payload),
            url: Some(url.into()),
            message: Some(EMPTY_MESSAGE.to_string()),
        }
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            status: SearchStatus::TransportError,
            status_text: SearchStatus::TransportError.text().to_string(),
            data: None,
            url: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SearchStatus::Success
    }

    /// The `geonames` collection, if present
    pub fn places_raw(&self) -> Option<&Vec<Value>> {
        self.data.as_ref()?.get("geonames")?.as_array()
    }

    fn places_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.data.as_mut()?.get_mut("geonames")?.as_array_mut()
    }

    /// Typed view of the `geonames` collection; records that do not fit are skipped
    pub fn places(&self) -> Vec<Place> {
        self.places_raw()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A metadata field merged into the payload (`ISO`, `prefix`, `country`)
    pub fn meta(&self, field: &str) -> Option<&str> {
        self.data.as_ref()?.get(field)?.as_str()
    }

    /// Appends the synthetic "All States" row and re-sorts the collection
    ///
    /// Only applies to successful results.
    pub fn add_all_states(&mut self) {
        if !self.is_success() {
            return;
        }
        if let Some(places) = self.places_mut() {
            places.push(all_states_row());
            places.sort_by(loose_cmp);
        }
    }

    /// Removes the first place named like the country filter or the active country
    ///
    /// Only applies to successful results; at most one entry is removed.
    pub fn exclude_country(&mut self, country_filter: &str, active_country: &str) {
        if !self.is_success() {
            return;
        }
        let Some(places) = self.places_mut() else {
            return;
        };
        let position = places.iter().position(|place| {
            place
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| {
                    (!country_filter.is_empty() && name == country_filter)
                        || (!active_country.is_empty() && name == active_country)
                })
        });
        if let Some(index) = position {
            places.remove(index);
        }
    }
}

/// One place record as returned with the SHORT style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub geoname_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub toponym_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lng: Option<String>,
    #[serde(default)]
    pub fcl: Option<String>,
    #[serde(default)]
    pub fcode: Option<String>,
}

/// Maps a transport outcome into a `SearchResult`
///
/// A body that is not JSON, lacks a non-empty `geonames` array, or reports
/// `totalResultsCount < 1` is an empty result. Otherwise the payload is merged
/// over the `ISO`, `prefix` and `country` fields of `country`; provider fields
/// win on a name clash and unresolved metadata is `null`.
pub fn normalize(
    url: &str,
    outcome: Result<Vec<u8>, TransportError>,
    country: Option<&CountryRecord>,
) -> SearchResult {
    let body = match outcome {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "request failed");
            return SearchResult::transport_error(e.to_string());
        }
    };

    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    if !has_results(&payload) {
        if let Some(status) = payload.get("status") {
            tracing::warn!(provider_status = %status, "provider reported an error");
        }
        return SearchResult::empty(url, payload);
    }

    let mut merged = Map::new();
    merged.insert("ISO".to_string(), opt_string(country.map(|c| c.short_name.as_str())));
    merged.insert("prefix".to_string(), opt_string(country.and_then(|c| c.prefix_or_code())));
    merged.insert("country".to_string(), opt_string(country.map(|c| c.name.as_str())));
    if let Value::Object(fields) = payload {
        merged.extend(fields);
    }
    SearchResult::success(merged)
}

fn has_results(payload: &Value) -> bool {
    let non_empty = payload
        .get("geonames")
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty());
    let total = payload
        .get("totalResultsCount")
        .map(loose_int)
        .unwrap_or(0);
    non_empty && total >= 1
}

fn opt_string(value: Option<&str>) -> Value {
    value
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null)
}

/// Integer view of a count that may arrive as a number or a numeric string
fn loose_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

fn all_states_row() -> Value {
    json!({
        "lng": null,
        "geonameId": ALL_STATES_ID,
        "countryCode": null,
        "name": ALL_STATES_NAME,
        "toponymName": ALL_STATES_NAME,
        "lat": null,
        "fcl": null,
        "fcode": null,
    })
}

/// Generic, field-agnostic ordering of heterogeneous JSON records
///
/// Records compare by field count first, then field by field in the order the
/// left record lists them. Records with different field names compare by
/// their field names. Scalars
/// compare loosely: `null` is below any non-empty value, numeric strings and
/// numbers compare numerically, other strings compare bytewise.
pub fn loose_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            let by_len = x.len().cmp(&y.len());
            if by_len != Ordering::Equal {
                return by_len;
            }
            for (key, left) in x {
                let Some(right) = y.get(key) else {
                    return x.keys().cmp(y.keys());
                };
                let ord = loose_cmp(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(l, r)| loose_cmp(l, r))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Array(_) | Value::Object(_), _) => Ordering::Greater,
        (_, Value::Array(_) | Value::Object(_)) => Ordering::Less,
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, Value::String(s)) => "".cmp(s.as_str()),
        (Value::String(s), Value::Null) => s.as_str().cmp(""),
        (Value::Null | Value::Bool(_), _) | (_, Value::Null | Value::Bool(_)) => {
            truthy(a).cmp(&truthy(b))
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => scalar_text(a).cmp(&scalar_text(b)),
        },
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, lng: &str, id: u64) -> Value {
        json!({
            "lng": lng,
            "geonameId": id,
            "countryCode": "NG",
            "name": name,
            "toponymName": name,
            "lat": "6.5",
            "fcl": "A",
            "fcode": "ADM1",
        })
    }

    fn body(places: Vec<Value>) -> Vec<u8> {
        let total = places.len();
        serde_json::to_vec(&json!({ "totalResultsCount": total, "geonames": places })).unwrap()
    }

    fn nigeria() -> CountryRecord {
        CountryRecord::new("NG", "Nigeria").with_prefix("+234")
    }

    fn success(places: Vec<Value>) -> SearchResult {
        normalize("http://x", Ok(body(places)), Some(&nigeria()))
    }

    #[test]
    fn test_transport_failure_maps_to_request_error() {
        let result = normalize(
            "http://x",
            Err(TransportError::Other("timed out".to_string())),
            None,
        );

        assert_eq!(result.status, SearchStatus::TransportError);
        assert_eq!(result.status_text, "request_error");
        assert_eq!(result.message.as_deref(), Some("timed out"));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_zero_total_is_empty_even_with_places() {
        let raw = json!({ "totalResultsCount": 0, "geonames": [place("Lagos", "3.3", 1)] });
        let result = normalize("http://x?q=a", Ok(serde_json::to_vec(&raw).unwrap()), None);

        assert_eq!(result.status, SearchStatus::Empty);
        assert_eq!(result.url.as_deref(), Some("http://x?q=a"));
        assert_eq!(result.message.as_deref(), Some(EMPTY_MESSAGE));
        assert_eq!(result.data, Some(raw));
    }

    #[test]
    fn test_missing_or_empty_collection_is_empty() {
        let missing = json!({ "totalResultsCount": 4 });
        let result = normalize("u", Ok(serde_json::to_vec(&missing).unwrap()), None);
        assert_eq!(result.status, SearchStatus::Empty);

        let empty = json!({ "totalResultsCount": 4, "geonames": [] });
        let result = normalize("u", Ok(serde_json::to_vec(&empty).unwrap()), None);
        assert_eq!(result.status, SearchStatus::Empty);
    }

    #[test]
    fn test_undecodable_body_is_empty_with_null_payload() {
        let result = normalize("u", Ok(b"<geonames/>".to_vec()), None);
        assert_eq!(result.status, SearchStatus::Empty);
        assert_eq!(result.data, Some(Value::Null));
    }

    #[test]
    fn test_provider_error_payload_is_empty() {
        let raw = json!({ "status": { "message": "user does not exist.", "value": 10 } });
        let result = normalize("u", Ok(serde_json::to_vec(&raw).unwrap()), None);
        assert_eq!(result.status, SearchStatus::Empty);
    }

    #[test]
    fn test_string_total_count_is_accepted() {
        let raw = json!({ "totalResultsCount": "2", "geonames": [place("Lagos", "3.3", 1)] });
        let result = normalize("u", Ok(serde_json::to_vec(&raw).unwrap()), None);
        assert!(result.is_success());
    }

    #[test]
    fn test_success_merges_country_metadata() {
        let result = success(vec![place("Lagos", "3.3", 1)]);

        assert!(result.is_success());
        assert_eq!(result.status_text, "has_data");
        assert_eq!(result.meta("ISO"), Some("NG"));
        assert_eq!(result.meta("prefix"), Some("+234"));
        assert_eq!(result.meta("country"), Some("Nigeria"));
        assert_eq!(result.places().len(), 1);
    }

    #[test]
    fn test_unresolved_country_metadata_is_null() {
        let result = normalize("u", Ok(body(vec![place("Lagos", "3.3", 1)])), None);
        let data = result.data.as_ref().unwrap();

        assert!(result.is_success());
        assert_eq!(data["ISO"], Value::Null);
        assert_eq!(data["prefix"], Value::Null);
        assert_eq!(data["country"], Value::Null);
    }

    #[test]
    fn test_prefix_falls_back_to_code() {
        let record = CountryRecord::new("GH", "Ghana").with_code("GHA");
        let result = normalize("u", Ok(body(vec![place("Accra", "0.1", 1)])), Some(&record));
        assert_eq!(result.meta("prefix"), Some("GHA"));
    }

    #[test]
    fn test_all_states_adds_exactly_one_null_row() {
        let mut result = success(vec![place("Lagos", "3.3", 1), place("Kano", "8.5", 2)]);
        result.add_all_states();

        let places = result.places_raw().unwrap();
        assert_eq!(places.len(), 3);
        let row = places
            .iter()
            .find(|p| p["name"] == ALL_STATES_NAME)
            .expect("All States row present");
        for field in ["lng", "lat", "countryCode", "fcl", "fcode"] {
            assert_eq!(row[field], Value::Null, "{} should be null", field);
        }
        assert_eq!(row["geonameId"], json!(ALL_STATES_ID));
    }

    #[test]
    fn test_all_states_sorts_by_leading_field() {
        let mut result = success(vec![
            place("Kano", "8.5", 2),
            place("Lagos", "3.3", 1),
            place("Borno", "13.1", 3),
        ]);
        result.add_all_states();

        let names: Vec<String> = result.places().into_iter().map(|p| p.name).collect();
        // null lng first, then longitudes compared numerically
        assert_eq!(names, vec!["All States", "Lagos", "Kano", "Borno"]);
    }

    #[test]
    fn test_all_states_ignored_for_non_success() {
        let mut result = SearchResult::transport_error("down");
        result.add_all_states();
        assert!(result.data.is_none());
    }

    #[test]
    fn test_exclude_country_removes_only_first_match() {
        let mut result = success(vec![
            place("Nigeria", "8.0", 1),
            place("Lagos", "3.3", 2),
            place("Nigeria", "8.0", 3),
        ]);
        result.exclude_country("", "Nigeria");

        let ids: Vec<Option<u64>> = result.places().into_iter().map(|p| p.geoname_id).collect();
        assert_eq!(ids, vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_exclude_country_matches_filter_too() {
        let mut result = success(vec![place("Lagos", "3.3", 1), place("Ghana", "1.0", 2)]);
        result.exclude_country("Ghana", "Nigeria");
        assert_eq!(result.places().len(), 1);
    }

    #[test]
    fn test_exclude_country_without_match_keeps_everything() {
        let mut result = success(vec![place("Lagos", "3.3", 1)]);
        result.exclude_country("", "Nigeria");
        assert_eq!(result.places().len(), 1);
    }

    #[test]
    fn test_status_serializes_as_code() {
        let result = SearchResult::transport_error("boom");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], json!(202));
        assert_eq!(json["statusText"], json!("request_error"));

        let back: SearchResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_unknown_status_code_is_rejected() {
        let raw = json!({ "status": 500, "statusText": "x" });
        assert!(serde_json::from_value::<SearchResult>(raw).is_err());
    }

    #[test]
    fn test_loose_cmp_scalars() {
        assert_eq!(loose_cmp(&json!(null), &json!("3.3")), Ordering::Less);
        assert_eq!(loose_cmp(&json!("10.5"), &json!("9.1")), Ordering::Greater);
        assert_eq!(loose_cmp(&json!("abc"), &json!("abd")), Ordering::Less);
        assert_eq!(loose_cmp(&json!(2), &json!("2.0")), Ordering::Equal);
        assert_eq!(loose_cmp(&json!(null), &json!(0)), Ordering::Equal);
    }

    #[test]
    fn test_loose_cmp_prefers_smaller_records() {
        let small = json!({ "name": "Z" });
        let large = json!({ "name": "A", "lng": "1" });
        assert_eq!(loose_cmp(&small, &large), Ordering::Less);
    }
}
