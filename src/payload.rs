//! Briefing payload - the JSON document published by the briefing generator.
//!
//! Decoding is tolerant: collections may be missing or `null`, and malformed
//! scalars or tags decode as absent rather than failing the payload. Only a
//! document that is not a JSON object is rejected.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Keyword matches per category (`verticals` / `compliance`), then per tag key.
pub type KeywordHits = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Root document of `latest.json` / `sample.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BriefingPayload {
    /// When the generator produced this payload
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub generated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: Summary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,
}

/// Snapshot metadata shown in the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// `None` when the field is missing or not a non-negative integer
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_items: Option<u64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub vertical_counts: Vec<LabeledCount>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub compliance_counts: Vec<LabeledCount>,
}

/// A tag together with the number of items carrying it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCount {
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_count_or_zero")]
    pub count: u64,
}

/// Category identifier. `key` is stable, `label` is for display.
///
/// A tag without a key decodes with an empty one and never becomes a filter
/// option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// All items of one vertical, split into compliance segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "lenient_entry")]
    pub vertical: Option<Tag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub segments: Vec<Segment>,
}

/// Items sharing one compliance focus within a section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, deserialize_with = "lenient_entry")]
    pub compliance: Option<Tag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
}

/// A single news item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    /// Publication timestamp as sent by the generator, not necessarily valid.
    /// Numbers are read as epoch milliseconds.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub published: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub verticals: Vec<Tag>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub compliance: Vec<Tag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keyword_hits: KeywordHits,
}

impl BriefingPayload {
    /// Parse a payload from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Number of items across all sections and segments
    pub fn item_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|section| &section.segments)
            .map(|segment| segment.items.len())
            .sum()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as u64)
        }),
        _ => None,
    })
}

fn lenient_count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_count(deserializer)?.unwrap_or(0))
}

/// Strings as-is, numbers and booleans as their text, anything else absent
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Like `lenient_text`, but integer numbers are epoch milliseconds
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let millis = match &value {
        Value::Number(number) => number.as_i64(),
        _ => None,
    };
    Ok(millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.to_rfc3339())
        .or_else(|| scalar_text(value)))
}

/// An entry that does not decode is treated as absent
fn lenient_entry<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Array entries that do not decode are dropped, a non-array is empty
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_generator_output() {
        let json = r#"{
            "generated_at": "2024-05-02T06:00:00+00:00",
            "summary": {
                "total_items": 1,
                "sources": ["FinCEN"],
                "vertical_counts": [{"key": "banking", "label": "Banking", "count": 1}],
                "compliance_counts": [{"key": "aml", "label": "AML", "count": 1}]
            },
            "sections": [{
                "vertical": {"key": "banking", "label": "Banking"},
                "segments": [{
                    "compliance": {"key": "aml", "label": "AML"},
                    "items": [{
                        "title": "New AML guidance",
                        "link": "https://example.org/aml",
                        "source": "FinCEN",
                        "published": "2024-05-01T12:00:00+00:00",
                        "summary": "Guidance text",
                        "verticals": [{"key": "banking", "label": "Banking"}],
                        "compliance": [{"key": "aml", "label": "AML"}],
                        "raw_categories": ["Press"],
                        "keyword_hits": {"compliance": {"aml": ["money laundering"]}},
                        "score": 2
                    }]
                }]
            }]
        }"#;

        let payload = BriefingPayload::from_slice(json.as_bytes()).unwrap();
        assert_eq!(payload.summary.total_items, Some(1));
        assert_eq!(payload.summary.sources, vec!["FinCEN".to_string()]);
        assert_eq!(payload.item_count(), 1);
        let item = &payload.sections[0].segments[0].items[0];
        assert_eq!(item.title.as_deref(), Some("New AML guidance"));
        assert_eq!(item.keyword_hits["compliance"]["aml"], vec!["money laundering"]);
    }

    #[test]
    fn tolerates_missing_and_null_collections() {
        let json = r#"{
            "generated_at": null,
            "summary": {"total_items": "many", "sources": "FinCEN"},
            "sections": [{"vertical": null, "segments": [{"items": null}]}, {"segments": null}]
        }"#;

        let payload = BriefingPayload::from_slice(json.as_bytes()).unwrap();
        assert_eq!(payload.generated_at, None);
        assert_eq!(payload.summary.total_items, None);
        assert!(payload.summary.sources.is_empty());
        assert_eq!(payload.item_count(), 0);
    }

    #[test]
    fn keyless_tags_decode_with_empty_key() {
        let json = r#"{
            "summary": {"vertical_counts": [{"label": "Unknown", "count": "3"}, 7]},
            "sections": [{
                "vertical": {"label": "Unknown"},
                "segments": [{
                    "compliance": "aml",
                    "items": [{"title": "Kept", "verticals": [{"label": "Unknown"}, null]}]
                }]
            }]
        }"#;

        let payload = BriefingPayload::from_slice(json.as_bytes()).unwrap();
        assert_eq!(
            payload.summary.vertical_counts,
            vec![LabeledCount {
                key: String::new(),
                label: "Unknown".to_string(),
                count: 0,
            }]
        );
        let section = &payload.sections[0];
        assert_eq!(section.vertical, Some(Tag::new("", "Unknown")));
        assert_eq!(section.segments[0].compliance, None);
        let item = &section.segments[0].items[0];
        assert_eq!(item.title.as_deref(), Some("Kept"));
        assert_eq!(item.verticals, vec![Tag::new("", "Unknown")]);
    }

    #[test]
    fn non_string_scalars_do_not_fail_the_payload() {
        let json = r#"{
            "generated_at": 1714629600000,
            "sections": [{"segments": [{"items": [
                {"title": 42, "link": {"href": "x"}, "published": 1714500000000, "summary": ["a"]},
                {"title": "Second", "published": "yesterday"}
            ]}]}]
        }"#;

        let payload = BriefingPayload::from_slice(json.as_bytes()).unwrap();
        assert_eq!(payload.generated_at.as_deref(), Some("2024-05-02T06:00:00+00:00"));
        let items = &payload.sections[0].segments[0].items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("42"));
        assert_eq!(items[0].link, None);
        assert_eq!(items[0].published.as_deref(), Some("2024-04-30T18:00:00+00:00"));
        assert_eq!(items[0].summary, None);
        assert_eq!(items[1].published.as_deref(), Some("yesterday"));
    }

    #[test]
    fn empty_object_is_an_empty_payload() {
        let payload = BriefingPayload::from_slice(b"{}").unwrap();
        assert_eq!(payload, BriefingPayload::default());
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(BriefingPayload::from_slice(b"[1, 2, 3]").is_err());
        assert!(BriefingPayload::from_slice(b"<html>").is_err());
    }
}
