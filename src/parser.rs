//! Feed response decoding.
//!
//! A Waze partner feed answers with a single JSON object:
//!
//! ```json
//! {
//!   "alerts": [{"type":"HAZARD","subtype":"","pubMillis":1700000000000,
//!               "location":{"x":-74.0,"y":40.7},"reportRating":3,
//!               "confidence":1,"reliability":7, "uuid":"..."}],
//!   "jams": [{"pubMillis":1700000000000, "street":"..."}],
//!   "endTimeMillis": 1700000060000
//! }
//! ```
//!
//! Either category may be absent (or `null`), in which case it decodes as an
//! empty list. Fields the pipeline does not use are kept in `extra` so the
//! records can be logged or forwarded unchanged.
//!
//! Records are decoded one by one: an alert missing `type`, `pubMillis` or
//! `location` is set aside in [`FeedResponse::invalid_records`] and the rest
//! of the response is kept. Only a body that is not a JSON object fails.

use crate::error::ParseError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// One decoded feed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedResponse {
    pub alerts: Vec<RawAlert>,
    pub jams: Vec<RawJam>,
    /// End of the window covered by this response, used as the next watermark.
    pub end_time_millis: Option<i64>,
    /// Why each skipped record could not be decoded.
    pub invalid_records: Vec<String>,
}

/// Response envelope as sent on the wire, records still undecoded.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    alerts: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    jams: Vec<Value>,
    #[serde(default)]
    end_time_millis: Option<i64>,
}

/// A user-reported traffic alert.
///
/// Numeric fields stay as [`Number`] so they render exactly as the feed
/// wrote them (`-74.0` stays `-74.0`, `3` stays `3`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAlert {
    #[serde(rename = "type")]
    pub alert_type: String,
    /// Empty string means "no subtype".
    #[serde(default)]
    pub subtype: String,
    pub pub_millis: i64,
    pub location: Location,
    #[serde(default = "zero")]
    pub report_rating: Number,
    #[serde(default = "zero")]
    pub confidence: Number,
    #[serde(default = "zero")]
    pub reliability: Number,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Alert coordinates (x = longitude, y = latitude).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: Number,
    pub y: Number,
}

/// A traffic jam record. Only the publication time is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJam {
    pub pub_millis: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn zero() -> Number {
    Number::from(0)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn decode_records<T: DeserializeOwned>(
    kind: &str,
    values: Vec<Value>,
    invalid: &mut Vec<String>,
) -> Vec<T> {
    let mut records = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => invalid.push(format!("{}[{}]: {}", kind, index, e)),
        }
    }
    records
}

/// Decode a feed response body.
///
/// Records that lack a required field are skipped and described in
/// `invalid_records`; the remaining records and `endTimeMillis` are kept.
///
/// # Errors
///
/// Returns `ParseError::InvalidJson` if the body is not a JSON object with
/// list-valued `alerts`/`jams`.
pub fn parse_feed(body: &str) -> Result<FeedResponse, ParseError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let mut invalid_records = Vec::new();
    let alerts = decode_records("alerts", envelope.alerts, &mut invalid_records);
    let jams = decode_records("jams", envelope.jams, &mut invalid_records);

    Ok(FeedResponse {
        alerts,
        jams,
        end_time_millis: envelope.end_time_millis,
        invalid_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_response() {
        let body = r#"{
            "alerts": [{
                "type": "HAZARD",
                "subtype": "HAZARD_ON_ROAD_POT_HOLE",
                "pubMillis": 1700000000000,
                "location": {"x": -74.0, "y": 40.7},
                "reportRating": 3,
                "confidence": 1,
                "reliability": 7,
                "uuid": "a1b2",
                "street": "Broadway"
            }],
            "jams": [{"pubMillis": 1700000000500, "level": 4}],
            "endTimeMillis": 1700000060000,
            "startTimeMillis": 1700000000000
        }"#;

        let feed = parse_feed(body).unwrap();

        assert_eq!(feed.alerts.len(), 1);
        assert_eq!(feed.jams.len(), 1);
        assert_eq!(feed.end_time_millis, Some(1_700_000_060_000));

        let alert = &feed.alerts[0];
        assert_eq!(alert.alert_type, "HAZARD");
        assert_eq!(alert.subtype, "HAZARD_ON_ROAD_POT_HOLE");
        assert_eq!(alert.pub_millis, 1_700_000_000_000);
        assert_eq!(alert.extra.get("uuid"), Some(&Value::from("a1b2")));
        assert_eq!(alert.extra.get("street"), Some(&Value::from("Broadway")));
        assert_eq!(feed.jams[0].extra.get("level"), Some(&Value::from(4)));
    }

    #[test]
    fn numbers_keep_their_textual_form() {
        let body = r#"{"alerts": [{"type": "JAM", "pubMillis": 1,
            "location": {"x": -74.0, "y": 40.7128},
            "reportRating": 0, "confidence": 2, "reliability": 5.5}]}"#;

        let alert = &parse_feed(body).unwrap().alerts[0];
        assert_eq!(alert.location.x.to_string(), "-74.0");
        assert_eq!(alert.location.y.to_string(), "40.7128");
        assert_eq!(alert.confidence.to_string(), "2");
        assert_eq!(alert.reliability.to_string(), "5.5");
    }

    #[test]
    fn missing_categories_decode_as_empty() {
        let feed = parse_feed(r#"{"endTimeMillis": 10}"#).unwrap();
        assert!(feed.alerts.is_empty());
        assert!(feed.jams.is_empty());
        assert_eq!(feed.end_time_millis, Some(10));

        let feed = parse_feed("{}").unwrap();
        assert_eq!(feed, FeedResponse::default());
    }

    #[test]
    fn null_categories_decode_as_empty() {
        let feed = parse_feed(r#"{"alerts": null, "jams": null}"#).unwrap();
        assert!(feed.alerts.is_empty());
        assert!(feed.jams.is_empty());
        assert_eq!(feed.end_time_millis, None);
    }

    #[test]
    fn missing_subtype_and_quality_signals_use_defaults() {
        let body = r#"{"alerts": [{"type": "ACCIDENT", "pubMillis": 5,
            "location": {"x": 1, "y": 2}}]}"#;

        let alert = &parse_feed(body).unwrap().alerts[0];
        assert_eq!(alert.subtype, "");
        assert_eq!(alert.report_rating, Number::from(0));
        assert_eq!(alert.confidence, Number::from(0));
        assert_eq!(alert.reliability, Number::from(0));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let result = parse_feed("<html>502 Bad Gateway</html>");
        assert!(matches!(result, Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn incomplete_alert_is_skipped_and_the_rest_kept() {
        let body = r#"{
            "alerts": [
                {"type": "ACCIDENT", "subtype": "ACCIDENT_MAJOR", "pubMillis": 100,
                 "location": {"x": 1, "y": 2}},
                {"type": "HAZARD", "subtype": "", "pubMillis": 200}
            ],
            "jams": [{"street": "Broadway"}, {"pubMillis": 150}],
            "endTimeMillis": 300
        }"#;

        let feed = parse_feed(body).unwrap();

        assert_eq!(feed.alerts.len(), 1);
        assert_eq!(feed.alerts[0].subtype, "ACCIDENT_MAJOR");
        assert_eq!(feed.jams.len(), 1);
        assert_eq!(feed.jams[0].pub_millis, 150);
        assert_eq!(feed.end_time_millis, Some(300));

        assert_eq!(feed.invalid_records.len(), 2);
        assert!(feed.invalid_records[0].starts_with("alerts[1]"));
        assert!(feed.invalid_records[0].contains("location"));
        assert!(feed.invalid_records[1].starts_with("jams[0]"));
        assert!(feed.invalid_records[1].contains("pubMillis"));
    }

    #[test]
    fn non_list_category_is_rejected() {
        let result = parse_feed(r#"{"alerts": "none"}"#);
        assert!(matches!(result, Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn alert_serializes_back_with_feed_field_names() {
        let body = r#"{"alerts": [{"type": "HAZARD", "subtype": "", "pubMillis": 7,
            "location": {"x": 1.5, "y": 2.5}, "uuid": "u-1"}]}"#;

        let alert = &parse_feed(body).unwrap().alerts[0];
        let json = serde_json::to_value(alert).unwrap();
        assert_eq!(json["type"], "HAZARD");
        assert_eq!(json["pubMillis"], 7);
        assert_eq!(json["uuid"], "u-1");
    }
}
