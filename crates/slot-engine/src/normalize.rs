//! Turn raw calendar events into merged busy intervals.
//!
//! 1. Resolve every event (after recurrence expansion) to a concrete
//!    `[start, end]` in the output zone.
//! 2. Drop intervals that ended before `now` or start after the horizon.
//! 3. Sort by start.
//! 4. Merge overlapping or touching intervals.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::config::{MissingEndPolicy, SlotConfig};
use crate::event::{BusyInterval, CalendarEvent};
use crate::expander::expand_event;

/// Normalize `events` into sorted, disjoint busy intervals relevant to the
/// search window `[now, now + horizon_days]`.
///
/// Malformed events are logged and skipped; they never fail the computation.
pub fn normalize_events(
    events: &[CalendarEvent],
    now: DateTime<Tz>,
    config: &SlotConfig,
) -> Vec<BusyInterval> {
    let Some(lookahead) = lookahead_end(now, config) else {
        warn!(
            %now,
            horizon_days = config.horizon_days,
            "search window exceeds the supported date range"
        );
        return Vec::new();
    };

    let mut intervals = Vec::new();
    for event in events {
        let occurrences = match expand_event(event, config.timezone, now, lookahead) {
            Ok(occurrences) => occurrences,
            Err(err) => {
                warn!(summary = ?event.summary, error = %err, "skipping event with bad recurrence");
                continue;
            }
        };
        intervals.extend(
            occurrences
                .iter()
                .filter_map(|occurrence| resolve_interval(occurrence, config))
                .filter(|interval| interval.end >= now && interval.start <= lookahead),
        );
    }

    merge_busy_intervals(intervals)
}

/// Latest start of a busy interval that can still collide with a slot.
///
/// A slot may start right before the horizon, so anything within one slot
/// plus buffer past it is kept.
pub(crate) fn lookahead_end(now: DateTime<Tz>, config: &SlotConfig) -> Option<DateTime<Tz>> {
    let reach = Duration::try_days(i64::from(config.horizon_days))?
        .checked_add(&config.slot_duration)?
        .checked_add(&config.buffer)?;
    now.checked_add_signed(reach)
}

/// Resolve one (non-recurring) event to a blocking interval.
///
/// Returns `None` for events that block nothing (transparent or zero-length)
/// and for malformed events whose end precedes their start.
pub fn resolve_interval(event: &CalendarEvent, config: &SlotConfig) -> Option<BusyInterval> {
    if event.transparent {
        debug!(summary = ?event.summary, "transparent event does not block time");
        return None;
    }

    let tz = config.timezone;
    let start = event.start.resolve(tz, false);
    let end = match (event.end, event.duration) {
        (Some(end), _) => Some(end.resolve(tz, end.is_date())),
        (None, Some(duration)) => start.checked_add_signed(duration),
        (None, None) if event.is_all_day() => Some(event.start.resolve(tz, true)),
        (None, None) => match config.missing_end {
            MissingEndPolicy::ZeroLength => Some(start),
            MissingEndPolicy::SlotDuration => start.checked_add_signed(config.slot_duration),
        },
    };
    let Some(end) = end else {
        warn!(summary = ?event.summary, %start, "skipping event whose end is out of range");
        return None;
    };

    if end < start {
        warn!(summary = ?event.summary, %start, %end, "skipping event that ends before it starts");
        return None;
    }
    if end == start {
        debug!(summary = ?event.summary, %start, "zero-length event does not block time");
        return None;
    }
    Some(BusyInterval::new(start, end))
}

/// Sort intervals by start and merge those that overlap or touch.
///
/// The result is sorted and pairwise disjoint (`a.end < b.start`).
pub fn merge_busy_intervals(mut intervals: Vec<BusyInterval>) -> Vec<BusyInterval> {
    intervals.sort_by_key(|interval| (interval.start, interval.end));

    let mut merged: Vec<BusyInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}
