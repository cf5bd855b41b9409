//! RRULE expansion -- turns a recurring event into its concrete occurrences.
//!
//! Wraps the `rrule` crate (v0.13). Every occurrence keeps the length of the
//! master event: all-day events shift by whole days, timed events by wall-clock
//! time in the frame of their `DTSTART`, so DST changes do not move them.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::debug;

use crate::dst::resolve_local;
use crate::error::{Result, SlotError};
use crate::event::{CalendarEvent, EventTime};

/// Hard cap on generated instances per event.
pub const MAX_INSTANCES: u16 = 500;

const ICAL_DATE_TIME: &str = "%Y%m%dT%H%M%S";

/// Expand a recurring event into occurrences that may touch `[window_start, window_end]`.
///
/// Events without a recurrence are returned unchanged as a single element.
/// Occurrences that started before `window_start` but may still be running are
/// included; filtering by resolved end happens during normalization.
///
/// # Errors
/// Returns `SlotError::InvalidRule` if the RRULE cannot be parsed.
pub fn expand_event(
    event: &CalendarEvent,
    tz: Tz,
    window_start: DateTime<Tz>,
    window_end: DateTime<Tz>,
) -> Result<Vec<CalendarEvent>> {
    let Some(recurrence) = &event.recurrence else {
        return Ok(vec![event.clone()]);
    };
    if recurrence.rule.trim().is_empty() {
        return Err(SlotError::InvalidRule("empty RRULE string".to_string()));
    }

    // Wall-clock frame of the master DTSTART.
    let (frame, frame_name) = match event.start {
        EventTime::Zoned(_, zone) => (zone, zone.name().to_string()),
        EventTime::Instant(_) => (chrono_tz::UTC, "UTC".to_string()),
        EventTime::Date(_) | EventTime::Floating(_) => (tz, tz.name().to_string()),
    };
    let master_local = event.start.local_naive();

    let mut rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        frame_name,
        master_local.format(ICAL_DATE_TIME),
        utc_until(recurrence.rule.trim(), frame)
    );
    if !recurrence.exdates.is_empty() {
        let exdates: Vec<String> = recurrence
            .exdates
            .iter()
            .map(|ex| in_frame(ex, frame, tz).format(ICAL_DATE_TIME).to_string())
            .collect();
        rrule_text.push_str(&format!("\nEXDATE;TZID={}:{}", frame_name, exdates.join(",")));
    }

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| SlotError::InvalidRule(format!("{}", e)))?;

    // Occurrences are looked up from one master length before the window so
    // that events already running at `window_start` are kept.
    let master_start = event.start.resolve(tz, false);
    let after = master_span(event, tz)
        .checked_add(&Duration::days(1))
        .and_then(|lookback| window_start.checked_sub_signed(lookback))
        .or_else(|| master_start.checked_sub_signed(Duration::days(1)))
        .unwrap_or(master_start)
        .with_timezone(&rrule::Tz::UTC);
    let before = window_end.with_timezone(&rrule::Tz::UTC);
    let instances = rrule_set.after(after).before(before).all(MAX_INSTANCES);
    if instances.limited {
        debug!(rule = %recurrence.rule, "recurrence expansion hit the instance cap");
    }

    let occurrences = instances
        .dates
        .into_iter()
        .map(|dt| {
            let local = dt.with_timezone(&Utc).with_timezone(&frame).naive_local();
            let delta = local - master_local;
            CalendarEvent {
                start: event.start.shifted(delta),
                end: event.end.map(|end| end.shifted(delta)),
                recurrence: None,
                ..event.clone()
            }
        })
        .collect();

    Ok(occurrences)
}

/// Rewrite a local `UNTIL` as UTC, as RFC 5545 requires next to a `TZID` start.
fn utc_until(rule: &str, frame: Tz) -> String {
    rule.split(';')
        .map(|part| {
            let Some((key, value)) = part.split_once('=') else {
                return part.to_string();
            };
            if !key.trim().eq_ignore_ascii_case("UNTIL") || value.ends_with(['Z', 'z']) {
                return part.to_string();
            }
            let local = NaiveDateTime::parse_from_str(value, ICAL_DATE_TIME).ok().or_else(|| {
                NaiveDate::parse_from_str(value, "%Y%m%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(23, 59, 59))
            });
            match local {
                Some(local) => format!(
                    "UNTIL={}Z",
                    resolve_local(frame, local)
                        .with_timezone(&Utc)
                        .format(ICAL_DATE_TIME)
                ),
                None => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Wall-clock value of `time` in `frame`.
fn in_frame(time: &EventTime, frame: Tz, tz: Tz) -> NaiveDateTime {
    match time {
        EventTime::Date(date) => date.and_time(NaiveTime::MIN),
        other => other.resolve(tz, false).with_timezone(&frame).naive_local(),
    }
}

/// Approximate length of the master event, used only to widen the lookup.
fn master_span(event: &CalendarEvent, tz: Tz) -> Duration {
    let start = event.start.resolve(tz, false);
    let end = match (&event.end, event.duration) {
        (Some(end), _) => end.resolve(tz, true),
        (None, Some(duration)) => return duration.max(Duration::zero()),
        (None, None) => start,
    };
    (end - start).max(Duration::zero())
}
