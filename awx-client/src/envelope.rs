//! Response envelopes
//!
//! Item shape: a bare object keyed by id. Count shape: `{count, next, results}`
//! returned by filtered list queries.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::codec::Record;
use crate::error::{ApiError, ApiResult};

/// Which envelope a GET is expected to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Item,
    Count,
}

/// A page of a count-shape response
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<JsonValue>,
}

/// Decode an item-shape body
pub fn decode_object(url: &str, body: &[u8]) -> ApiResult<Record> {
    let value: JsonValue = serde_json::from_slice(body)
        .map_err(|e| ApiError::decode(url, format!("invalid JSON: {}", e)))?;
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(ApiError::decode(
            url,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
    }
}

/// Decode a count-shape body
pub fn decode_list(url: &str, body: &[u8]) -> ApiResult<ListEnvelope> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::decode(url, format!("expected {{count, results}}: {}", e)))
}

/// Results of a page as records
pub fn records(url: &str, envelope: ListEnvelope) -> ApiResult<Vec<Record>> {
    envelope
        .results
        .into_iter()
        .map(|item| match item {
            JsonValue::Object(map) => Ok(map),
            other => Err(ApiError::decode(
                url,
                format!("list item is {}, expected an object", json_kind(&other)),
            )),
        })
        .collect()
}

/// Reduce a lookup result to zero or one record
///
/// More than one match is a cardinality error listing the returned ids.
pub fn expect_single(url: &str, envelope: ListEnvelope) -> ApiResult<Option<Record>> {
    match envelope.count {
        0 => Ok(None),
        1 => {
            let mut rows = records(url, envelope)?;
            if rows.len() != 1 {
                return Err(ApiError::decode(
                    url,
                    format!("count is 1 but {} results were returned", rows.len()),
                ));
            }
            Ok(rows.pop())
        }
        count => Err(ApiError::Cardinality {
            url: url.to_string(),
            count,
            ids: envelope
                .results
                .iter()
                .filter_map(|item| item.get("id").and_then(JsonValue::as_i64))
                .collect(),
        }),
    }
}

/// The `id` of a record
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(JsonValue::as_i64)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://awx.example.com/api/v2/credentials/?name=bob";

    #[test]
    fn decode_object_rejects_non_objects() {
        assert!(decode_object(URL, br#"{"id": 1}"#).is_ok());
        assert!(matches!(
            decode_object(URL, b"[1, 2]"),
            Err(ApiError::Decode { .. })
        ));
        assert!(matches!(
            decode_object(URL, b"<html>"),
            Err(ApiError::Decode { .. })
        ));
    }

    #[test]
    fn item_shape_is_not_a_count_shape() {
        assert!(matches!(
            decode_list(URL, br#"{"id": 3, "name": "bob"}"#),
            Err(ApiError::Decode { .. })
        ));
    }

    #[test]
    fn expect_single_zero_is_absent() {
        let envelope = decode_list(URL, br#"{"count": 0, "results": []}"#).unwrap();
        assert!(expect_single(URL, envelope).unwrap().is_none());
    }

    #[test]
    fn expect_single_one_returns_record() {
        let envelope =
            decode_list(URL, br#"{"count": 1, "results": [{"id": 5, "name": "bob"}]}"#).unwrap();
        let record = expect_single(URL, envelope).unwrap().unwrap();
        assert_eq!(record_id(&record), Some(5));
    }

    #[test]
    fn expect_single_many_is_cardinality_error() {
        let envelope = decode_list(
            URL,
            br#"{"count": 2, "results": [{"id": 4, "name": "bob"}, {"id": 9, "name": "bob"}]}"#,
        )
        .unwrap();
        match expect_single(URL, envelope) {
            Err(ApiError::Cardinality { count, ids, .. }) => {
                assert_eq!(count, 2);
                assert_eq!(ids, vec![4, 9]);
            }
            other => panic!("expected cardinality error, got {:?}", other),
        }
    }

    #[test]
    fn count_one_without_results_is_decode_error() {
        let envelope = decode_list(URL, br#"{"count": 1, "results": []}"#).unwrap();
        assert!(matches!(
            expect_single(URL, envelope),
            Err(ApiError::Decode { .. })
        ));
    }
}
