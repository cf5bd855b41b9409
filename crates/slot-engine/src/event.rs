//! Calendar data model: raw events, busy intervals and free slots.
//!
//! Event timestamps arrive in several shapes (plain dates, naive wall-clock
//! times, zoned times, UTC instants). [`EventTime`] keeps that distinction until
//! [`EventTime::resolve`] turns every value into a `DateTime<Tz>` in the output
//! zone. Nothing is ever compared in mixed form.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::dst::resolve_local;

/// Minutes from midnight to the nominal end of an all-day event (23:59).
const END_OF_DAY_MINUTES: i64 = 23 * 60 + 59;

/// A calendar timestamp before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// All-day value without a time component.
    Date(NaiveDate),
    /// Naive wall-clock time, interpreted in the configured output zone.
    Floating(NaiveDateTime),
    /// Wall-clock time in an explicit IANA zone.
    Zoned(NaiveDateTime, Tz),
    /// Absolute instant.
    Instant(DateTime<Utc>),
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Resolve to a concrete instant in `tz`.
    ///
    /// Dates resolve to 00:00, or to 23:59 when `end_of_day` is set.
    pub fn resolve(&self, tz: Tz, end_of_day: bool) -> DateTime<Tz> {
        match *self {
            EventTime::Date(date) => {
                let mut local = date.and_time(NaiveTime::MIN);
                if end_of_day {
                    local += Duration::minutes(END_OF_DAY_MINUTES);
                }
                resolve_local(tz, local)
            }
            EventTime::Floating(local) => resolve_local(tz, local),
            EventTime::Zoned(local, zone) => resolve_local(zone, local).with_timezone(&tz),
            EventTime::Instant(instant) => instant.with_timezone(&tz),
        }
    }

    /// The wall-clock value in the value's own frame. Floating and date values
    /// are taken as-is; instants are expressed in UTC.
    pub(crate) fn local_naive(&self) -> NaiveDateTime {
        match *self {
            EventTime::Date(date) => date.and_time(NaiveTime::MIN),
            EventTime::Floating(local) | EventTime::Zoned(local, _) => local,
            EventTime::Instant(instant) => instant.naive_utc(),
        }
    }

    /// Move the value by a wall-clock delta, keeping its kind.
    pub(crate) fn shifted(&self, delta: Duration) -> EventTime {
        match *self {
            EventTime::Date(date) => EventTime::Date(date + Duration::days(delta.num_days())),
            EventTime::Floating(local) => EventTime::Floating(local + delta),
            EventTime::Zoned(local, zone) => EventTime::Zoned(local + delta, zone),
            EventTime::Instant(instant) => EventTime::Instant(instant + delta),
        }
    }
}

/// RRULE plus exception dates attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    /// RFC 5545 RRULE value, e.g. `FREQ=WEEKLY;BYDAY=MO`.
    pub rule: String,
    pub exdates: Vec<EventTime>,
}

/// An event as read from a calendar source.
///
/// A `Date` end is the last day the event covers (inclusive). When both `end`
/// and `duration` are absent the configured missing-end policy applies.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub duration: Option<Duration>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub recurrence: Option<Recurrence>,
    /// Transparent events do not block time.
    pub transparent: bool,
}

impl CalendarEvent {
    /// An event with only a start value.
    pub fn starting_at(start: EventTime) -> Self {
        Self {
            start,
            end: None,
            duration: None,
            summary: None,
            location: None,
            recurrence: None,
            transparent: false,
        }
    }

    /// A floating (naive) event from `start` to `end`.
    pub fn timed(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            end: Some(EventTime::Floating(end)),
            ..Self::starting_at(EventTime::Floating(start))
        }
    }

    /// An all-day event on a single date.
    pub fn all_day(date: NaiveDate) -> Self {
        Self::starting_at(EventTime::Date(date))
    }

    /// An all-day event covering `first..=last`.
    pub fn all_day_span(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            end: Some(EventTime::Date(last)),
            ..Self::all_day(first)
        }
    }

    pub fn with_end(mut self, end: EventTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }
}

/// A normalized busy range in the output zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// Half-open overlap test. Touching intervals do not overlap.
    pub fn overlaps(&self, start: &DateTime<Tz>, end: &DateTime<Tz>) -> bool {
        self.start < *end && *start < self.end
    }
}

/// A proposed meeting slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl FreeSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}
