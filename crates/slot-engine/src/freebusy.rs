//! Read busy periods from a free/busy JSON document.
//!
//! Three shapes are accepted:
//!
//! - a plain array: `[{"start": "...", "end": "..."}]`
//! - a single busy list: `{"busy": [...]}`
//! - a calendar service response: `{"calendars": {"primary": {"busy": [...]}}}`,
//!   where the busy lists of all calendars are combined.
//!
//! Timestamps are RFC 3339, or naive `YYYY-MM-DDTHH:MM[:SS]` interpreted in the
//! output zone. Entries that cannot be read are logged and skipped.

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dst::resolve_local;
use crate::error::{Result, SlotError};
use crate::event::BusyInterval;

#[derive(Debug, Deserialize)]
struct RawPeriod {
    start: String,
    end: String,
}

/// Parse a free/busy document into busy intervals in `tz`.
///
/// The result is in document order; merging happens in the finder.
///
/// # Errors
/// Returns `SlotError::Json` for invalid JSON and `SlotError::Parse` when the
/// document has none of the accepted shapes.
pub fn parse_freebusy(json: &str, tz: Tz) -> Result<Vec<BusyInterval>> {
    let document: Value = serde_json::from_str(json)?;
    let entries = busy_entries(&document).ok_or_else(|| {
        SlotError::parse(0, "free/busy document has no 'busy' list or 'calendars' map")
    })?;

    let mut intervals = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        match read_period(entry, tz) {
            Some(interval) => intervals.push(interval),
            None => warn!(index = idx, entry = %entry, "skipping unreadable busy period"),
        }
    }
    debug!(count = intervals.len(), "read busy periods");
    Ok(intervals)
}

fn busy_entries(document: &Value) -> Option<Vec<&Value>> {
    match document {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(map) => {
            if let Some(Value::Array(busy)) = map.get("busy") {
                return Some(busy.iter().collect());
            }
            let Some(Value::Object(calendars)) = map.get("calendars") else {
                return None;
            };
            Some(
                calendars
                    .values()
                    .filter_map(|calendar| calendar.get("busy").and_then(Value::as_array))
                    .flatten()
                    .collect(),
            )
        }
        _ => None,
    }
}

fn read_period(entry: &Value, tz: Tz) -> Option<BusyInterval> {
    let raw = RawPeriod::deserialize(entry).ok()?;
    let start = parse_timestamp(&raw.start, tz)?;
    let end = parse_timestamp(&raw.end, tz)?;
    (start <= end).then(|| BusyInterval::new(start, end))
}

/// Parse an RFC 3339 timestamp, or a naive one interpreted in `tz`.
pub fn parse_timestamp(value: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&tz));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|local| resolve_local(tz, local))
}
