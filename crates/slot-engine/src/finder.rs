//! Greedy sweep for free meeting slots.
//!
//! A cursor walks forward from `now`. At every step it is moved into the
//! working-hours window of its day and snapped to the slot grid, then the
//! candidate `[cursor, cursor + slot_duration)` is tested against the merged
//! busy intervals, widened by the buffer on both sides. A conflict moves the
//! cursor past the busy interval; it never searches inside one. The sweep is
//! monotonic, so slots come out in chronological order.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

use crate::config::SlotConfig;
use crate::dst::resolve_local;
use crate::error::{Result, SlotError};
use crate::event::{BusyInterval, CalendarEvent, FreeSlot};
use crate::normalize::{lookahead_end, merge_busy_intervals, normalize_events};

/// Find up to `config.max_slots` free slots for the given calendar events.
///
/// `now` may be in any zone; it is converted to `config.timezone`. An empty
/// event list is not an error, and neither is an empty result.
///
/// # Errors
/// Returns `SlotError::InvalidConfig` if `config` fails validation or the
/// search window runs past the supported date range.
pub fn find_free_slots<T: TimeZone>(
    events: &[CalendarEvent],
    now: &DateTime<T>,
    config: &SlotConfig,
) -> Result<Vec<FreeSlot>> {
    config.validate()?;
    let now = now.with_timezone(&config.timezone);
    let (horizon, _) = search_window(now, config)?;
    let busy = normalize_events(events, now, config);
    Ok(sweep(&busy, now, horizon, config))
}

/// Like [`find_free_slots`], but starting from already known busy intervals
/// (e.g. a calendar service's free/busy answer). Intervals may be unsorted and
/// overlapping.
///
/// # Errors
/// Returns `SlotError::InvalidConfig` if `config` fails validation or the
/// search window runs past the supported date range.
pub fn find_free_slots_in_busy<T: TimeZone>(
    busy: &[BusyInterval],
    now: &DateTime<T>,
    config: &SlotConfig,
) -> Result<Vec<FreeSlot>> {
    config.validate()?;
    let tz = config.timezone;
    let now = now.with_timezone(&tz);
    let (horizon, lookahead) = search_window(now, config)?;

    let relevant = busy
        .iter()
        .map(|b| BusyInterval::new(b.start.with_timezone(&tz), b.end.with_timezone(&tz)))
        .filter(|b| b.start < b.end && b.end >= now && b.start <= lookahead)
        .collect();
    let merged = merge_busy_intervals(relevant);
    Ok(sweep(&merged, now, horizon, config))
}

/// End of the search window, or `None` past the supported date range.
pub fn horizon_end(now: DateTime<Tz>, config: &SlotConfig) -> Option<DateTime<Tz>> {
    now.checked_add_signed(Duration::try_days(i64::from(config.horizon_days))?)
}

/// Horizon end and busy lookahead for a search starting at `now`.
fn search_window(now: DateTime<Tz>, config: &SlotConfig) -> Result<(DateTime<Tz>, DateTime<Tz>)> {
    horizon_end(now, config)
        .zip(lookahead_end(now, config))
        .ok_or_else(|| {
            SlotError::InvalidConfig(format!(
                "a {} day search from {} exceeds the supported date range",
                config.horizon_days, now
            ))
        })
}

/// Run the sweep over sorted, disjoint busy intervals.
fn sweep(
    busy: &[BusyInterval],
    now: DateTime<Tz>,
    horizon_end: DateTime<Tz>,
    config: &SlotConfig,
) -> Vec<FreeSlot> {
    let tz = config.timezone;
    let hours = config.working_hours;

    let mut slots = Vec::with_capacity(config.max_slots);
    let mut cursor = now;

    while slots.len() < config.max_slots && cursor < horizon_end {
        let day = cursor.date_naive();
        let day_start = at_time(tz, day, hours.start);
        let day_end = at_time(tz, day, hours.end);

        cursor = if cursor < day_start {
            day_start
        } else {
            align_up(cursor, day_start, config.slot_step)
        };

        if cursor >= day_end {
            let Some(next) = next_day_start(tz, day, hours.start) else {
                break;
            };
            cursor = next;
            continue;
        }
        if cursor >= horizon_end {
            break;
        }

        let candidate_end = cursor + config.slot_duration;

        if let Some(conflict) = first_conflict(busy, cursor, candidate_end, config.buffer) {
            debug!(%cursor, busy_end = %conflict.end, "candidate conflicts, jumping past busy interval");
            let Some(next) = conflict.end.checked_add_signed(config.buffer) else {
                break;
            };
            cursor = next;
            continue;
        }

        if candidate_end > day_end {
            let Some(next) = next_day_start(tz, day, hours.start) else {
                break;
            };
            cursor = next;
            continue;
        }

        debug!(start = %cursor, end = %candidate_end, "accepted free slot");
        slots.push(FreeSlot {
            start: cursor,
            end: candidate_end,
        });
        cursor = candidate_end + config.buffer;
    }

    slots
}

/// First busy interval that overlaps `[start, end)` once widened by `buffer`.
///
/// `busy` must be sorted and disjoint, which makes interval ends sorted too.
fn first_conflict(
    busy: &[BusyInterval],
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    buffer: Duration,
) -> Option<&BusyInterval> {
    let idx = busy.partition_point(|b| {
        b.end
            .checked_add_signed(buffer)
            .is_some_and(|widened| widened <= start)
    });
    busy.get(idx).filter(|b| {
        b.start
            .checked_sub_signed(buffer)
            .map_or(true, |widened| widened < end)
    })
}

fn at_time(tz: Tz, day: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    resolve_local(tz, day.and_time(time))
}

fn next_day_start(tz: Tz, day: NaiveDate, start: NaiveTime) -> Option<DateTime<Tz>> {
    day.succ_opt().map(|next| at_time(tz, next, start))
}

/// Round `cursor` up to the next multiple of `step` after `anchor`.
fn align_up(cursor: DateTime<Tz>, anchor: DateTime<Tz>, step: Duration) -> DateTime<Tz> {
    let offset = cursor - anchor;
    let step_secs = step.num_seconds().max(1);
    let whole_secs = offset.num_seconds();
    let remainder = whole_secs.rem_euclid(step_secs);
    let on_grid = remainder == 0 && anchor + Duration::seconds(whole_secs) == cursor;
    if on_grid {
        cursor
    } else {
        anchor + Duration::seconds(whole_secs - remainder + step_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berlin(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        chrono_tz::Europe::Berlin
            .with_ymd_and_hms(2025, 1, 6, h, m, s)
            .unwrap()
    }

    #[test]
    fn align_up_keeps_grid_points() {
        let step = Duration::minutes(30);
        assert_eq!(align_up(berlin(10, 30, 0), berlin(9, 0, 0), step), berlin(10, 30, 0));
    }

    #[test]
    fn align_up_rounds_to_next_grid_point() {
        let step = Duration::minutes(30);
        assert_eq!(align_up(berlin(10, 15, 0), berlin(9, 0, 0), step), berlin(10, 30, 0));
        assert_eq!(align_up(berlin(10, 30, 1), berlin(9, 0, 0), step), berlin(11, 0, 0));
    }

    #[test]
    fn first_conflict_respects_buffer() {
        let busy = vec![BusyInterval::new(berlin(10, 0, 0), berlin(11, 0, 0))];
        let buffer = Duration::minutes(15);
        // Ends exactly 15 minutes before the meeting: fine.
        assert!(first_conflict(&busy, berlin(8, 45, 0), berlin(9, 45, 0), buffer).is_none());
        // Ends 5 minutes before: too close.
        assert!(first_conflict(&busy, berlin(8, 55, 0), berlin(9, 55, 0), buffer).is_some());
        // Starts 15 minutes after: fine.
        assert!(first_conflict(&busy, berlin(11, 15, 0), berlin(12, 15, 0), buffer).is_none());
    }
}
