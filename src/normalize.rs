//! Flattening of the nested payload into a single, date-ordered item list.

use crate::payload::{BriefingPayload, Item, Tag};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Reverse;

/// Flatten and sort the payload's items, newest first
pub fn normalize(payload: &BriefingPayload) -> Vec<Item> {
    sort_by_published_descending(flatten(payload))
}

/// Flatten sections -> segments -> items into one list.
///
/// Items without verticals inherit their section's vertical, and items without
/// compliance tags inherit their segment's compliance tag. Nothing is dropped
/// or de-duplicated, and the payload itself is left untouched.
pub fn flatten(payload: &BriefingPayload) -> Vec<Item> {
    let mut items = Vec::with_capacity(payload.item_count());

    for section in &payload.sections {
        for segment in &section.segments {
            for item in &segment.items {
                items.push(inherit_tags(
                    item,
                    section.vertical.as_ref(),
                    segment.compliance.as_ref(),
                ));
            }
        }
    }

    items
}

/// Copy of `item` with empty tag lists replaced by the parent tags
pub fn inherit_tags(item: &Item, vertical: Option<&Tag>, compliance: Option<&Tag>) -> Item {
    let mut item = item.clone();
    if item.verticals.is_empty() {
        item.verticals = vertical.into_iter().cloned().collect();
    }
    if item.compliance.is_empty() {
        item.compliance = compliance.into_iter().cloned().collect();
    }
    item
}

/// Stable sort by publication time, newest first. Missing or unparsable
/// timestamps count as the Unix epoch.
pub fn sort_by_published_descending(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(|item| Reverse(published_millis(item)));
    items
}

/// Publication time of an item in milliseconds since the epoch, or 0
pub fn published_millis(item: &Item) -> i64 {
    item.published
        .as_deref()
        .and_then(parse_timestamp)
        .map(|ts| ts.timestamp_millis())
        .unwrap_or(0)
}

/// Parse the timestamp formats the feed is known to carry.
///
/// Accepts RFC 3339, RFC 2822, naive ISO-8601 date-times (read as UTC) and
/// plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
