//! # slot-engine
//!
//! Deterministic free-slot finder for proposing meeting times from a calendar.
//!
//! Given calendar events (an iCalendar document or a free/busy answer), the
//! current time and a [`SlotConfig`], the engine proposes a short list of
//! fixed-length slots inside working hours that keep a buffer to every busy
//! interval. The computation is pure: no I/O, no system clock.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone};
//! use slot_engine::{find_free_slots, CalendarEvent, SlotConfig};
//!
//! let config = SlotConfig::in_timezone(chrono_tz::Europe::Berlin);
//! let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
//! let events = vec![CalendarEvent::timed(
//!     day.and_hms_opt(9, 0, 0).unwrap(),
//!     day.and_hms_opt(12, 0, 0).unwrap(),
//! )];
//! let now = chrono_tz::Europe::Berlin.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
//!
//! let slots = find_free_slots(&events, &now, &config).unwrap();
//! assert_eq!(slots[0].start.format("%H:%M").to_string(), "12:30");
//! ```
//!
//! ## Modules
//!
//! - [`event`]: `EventTime`, `CalendarEvent`, `BusyInterval`, `FreeSlot`
//! - [`config`]: `SlotConfig` and its TOML form
//! - [`ics`]: iCalendar `VEVENT` reader
//! - [`freebusy`]: free/busy JSON reader
//! - [`expander`]: RRULE expansion of recurring events
//! - [`normalize`]: event → merged busy intervals
//! - [`finder`]: the slot sweep
//! - [`highlight`]: days spent near an ad's location
//! - [`display`]: localized slot labels
//! - [`export`]: chosen slots as iCalendar meetings
//! - [`clock`]: injectable time source
//! - [`error`]: Error types

pub mod clock;
pub mod config;
pub mod display;
pub mod dst;
pub mod error;
pub mod event;
pub mod expander;
pub mod export;
pub mod finder;
pub mod freebusy;
pub mod highlight;
pub mod ics;
pub mod normalize;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{MissingEndPolicy, SlotConfig, SlotSettings, WorkingHours};
pub use display::{format_slot, format_slots, Language};
pub use error::SlotError;
pub use event::{BusyInterval, CalendarEvent, EventTime, FreeSlot, Recurrence};
pub use export::{meeting_summary, slots_to_ics, MeetingDetails};
pub use finder::{find_free_slots, find_free_slots_in_busy};
pub use freebusy::parse_freebusy;
pub use highlight::{extended_horizon_days, highlight_dates};
pub use ics::{parse_calendar, ParsedCalendar};
pub use normalize::{merge_busy_intervals, normalize_events};
