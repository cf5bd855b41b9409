//! Days on which the calendar owner is already near an ad's location.
//!
//! An event "mentions" a city when its `LOCATION` or `SUMMARY` contains the
//! city name, case-insensitively. Those days are good candidates for a pickup
//! and are marked in slot listings.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;

use crate::config::MAX_HORIZON_DAYS;
use crate::event::{CalendarEvent, EventTime};

fn postcode_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{5}\s+(.*)$").expect("postcode pattern is valid"))
}

/// City part of an ad location, lowercased. `"12345 Berlin"` becomes `"berlin"`.
pub fn city_from_location(location: &str) -> String {
    let city = postcode_prefix()
        .captures(location)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(location);
    city.trim().to_lowercase()
}

/// Sorted, de-duplicated dates of events that mention the ad's city.
///
/// Multi-day events contribute every day they cover. An empty location
/// yields no dates.
pub fn highlight_dates(events: &[CalendarEvent], ad_location: &str) -> Vec<NaiveDate> {
    let city = city_from_location(ad_location);
    if city.is_empty() {
        return Vec::new();
    }

    let mut dates = BTreeSet::new();
    for event in events.iter().filter(|e| mentions(e, &city)) {
        let first = day_of(&event.start);
        let last = event.end.as_ref().map(day_of).unwrap_or(first).max(first);
        let mut day = first;
        while day <= last {
            dates.insert(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }
    dates.into_iter().collect()
}

/// Horizon in days that reaches the first highlighted day after `today`.
///
/// Returns `base_days` unless that day lies beyond it, in which case the
/// horizon is extended to cover the whole of that day, up to
/// [`MAX_HORIZON_DAYS`].
pub fn extended_horizon_days(today: NaiveDate, base_days: u32, highlights: &[NaiveDate]) -> u32 {
    let Some(first) = highlights.iter().copied().find(|d| *d >= today) else {
        return base_days;
    };
    let needed = (first - today + Duration::days(1)).num_days();
    if needed > i64::from(base_days) {
        u32::try_from(needed)
            .unwrap_or(u32::MAX)
            .min(MAX_HORIZON_DAYS)
            .max(base_days)
    } else {
        base_days
    }
}

fn mentions(event: &CalendarEvent, city: &str) -> bool {
    [&event.location, &event.summary]
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(city))
}

/// Calendar day of a value in its own frame.
fn day_of(time: &EventTime) -> NaiveDate {
    match time {
        EventTime::Date(date) => *date,
        other => other.local_naive().date(),
    }
}
