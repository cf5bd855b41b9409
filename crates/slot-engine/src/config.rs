//! Finder configuration.
//!
//! [`SlotConfig`] is the validated, typed form passed to the finder.
//! [`SlotSettings`] is the file form (TOML), where every key is optional and
//! falls back to the defaults below.

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

pub const DEFAULT_HORIZON_DAYS: u32 = 7;
pub const DEFAULT_SLOT_MINUTES: i64 = 60;
pub const DEFAULT_MAX_SLOTS: usize = 2;
pub const DEFAULT_BUFFER_MINUTES: i64 = 15;
pub const DEFAULT_STEP_MINUTES: i64 = 30;
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

/// Longest accepted search horizon.
pub const MAX_HORIZON_DAYS: u32 = 3650;
/// Longest accepted buffer and slot step, in minutes (one day).
pub const MAX_GAP_MINUTES: i64 = 24 * 60;

/// How to treat a timed event that has neither an end nor a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingEndPolicy {
    /// The event ends when it starts and blocks nothing.
    ZeroLength,
    /// The event blocks one slot duration from its start.
    #[default]
    SlotDuration,
}

/// Daily window in which slots may be proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    /// Build from hour/minute pairs. Returns `None` for out-of-range values.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::MIN + Duration::hours(9),
            end: NaiveTime::MIN + Duration::hours(20),
        }
    }
}

/// Validated finder configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotConfig {
    pub horizon_days: u32,
    pub slot_duration: Duration,
    pub max_slots: usize,
    pub working_hours: WorkingHours,
    /// Gap kept after every accepted slot and on both sides of busy intervals.
    pub buffer: Duration,
    /// Grid the cursor snaps to, anchored at the working-hours start.
    pub slot_step: Duration,
    /// Output zone; floating event times are interpreted in it.
    pub timezone: Tz,
    pub missing_end: MissingEndPolicy,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            slot_duration: Duration::minutes(DEFAULT_SLOT_MINUTES),
            max_slots: DEFAULT_MAX_SLOTS,
            working_hours: WorkingHours::default(),
            buffer: Duration::minutes(DEFAULT_BUFFER_MINUTES),
            slot_step: Duration::minutes(DEFAULT_STEP_MINUTES),
            timezone: chrono_tz::Europe::Berlin,
            missing_end: MissingEndPolicy::default(),
        }
    }
}

impl SlotConfig {
    /// Default configuration in the given zone.
    pub fn in_timezone(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Self::default()
        }
    }

    /// Reject configurations that can only come from a caller bug.
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(SlotError::InvalidConfig(
                "horizon_days must be positive".to_string(),
            ));
        }
        if self.horizon_days > MAX_HORIZON_DAYS {
            return Err(SlotError::InvalidConfig(format!(
                "horizon_days must be at most {}, got {}",
                MAX_HORIZON_DAYS, self.horizon_days
            )));
        }
        if self.slot_duration <= Duration::zero() {
            return Err(SlotError::InvalidConfig(
                "slot duration must be positive".to_string(),
            ));
        }
        if self.max_slots == 0 {
            return Err(SlotError::InvalidConfig(
                "max_slots must be positive".to_string(),
            ));
        }
        if self.buffer < Duration::zero() {
            return Err(SlotError::InvalidConfig(
                "buffer must not be negative".to_string(),
            ));
        }
        if self.slot_step <= Duration::zero() {
            return Err(SlotError::InvalidConfig(
                "slot step must be positive".to_string(),
            ));
        }
        let max_gap = Duration::minutes(MAX_GAP_MINUTES);
        if self.buffer > max_gap || self.slot_step > max_gap {
            return Err(SlotError::InvalidConfig(format!(
                "buffer and slot step must be at most {} minutes",
                MAX_GAP_MINUTES
            )));
        }
        if self.working_hours.start >= self.working_hours.end {
            return Err(SlotError::InvalidConfig(format!(
                "working hours start {} must be before end {}",
                self.working_hours.start, self.working_hours.end
            )));
        }
        if self.slot_duration > self.working_hours.length() {
            return Err(SlotError::InvalidConfig(format!(
                "slot duration of {} minutes does not fit into working hours {}-{}",
                self.slot_duration.num_minutes(),
                self.working_hours.start,
                self.working_hours.end
            )));
        }
        Ok(())
    }
}

/// Working-hours window in file form, e.g. `{ start = "09:00", end = "20:00" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursSettings {
    pub start: String,
    pub end: String,
}

/// File form of [`SlotConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSettings {
    #[serde(default)]
    pub horizon_days: Option<u32>,
    #[serde(default)]
    pub slot_minutes: Option<i64>,
    #[serde(default)]
    pub max_slots: Option<usize>,
    #[serde(default)]
    pub working_hours: Option<WorkingHoursSettings>,
    #[serde(default)]
    pub buffer_minutes: Option<i64>,
    #[serde(default)]
    pub step_minutes: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub missing_end: Option<MissingEndPolicy>,
}

impl SlotSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl TryFrom<SlotSettings> for SlotConfig {
    type Error = SlotError;

    fn try_from(settings: SlotSettings) -> Result<Self> {
        let defaults = SlotConfig::default();

        let timezone = match settings.timezone {
            Some(name) => parse_timezone(&name)?,
            None => defaults.timezone,
        };
        let working_hours = match settings.working_hours {
            Some(hours) => WorkingHours {
                start: parse_time_of_day(&hours.start)?,
                end: parse_time_of_day(&hours.end)?,
            },
            None => defaults.working_hours,
        };

        let config = SlotConfig {
            horizon_days: settings.horizon_days.unwrap_or(defaults.horizon_days),
            slot_duration: minutes_or(
                "slot_minutes",
                settings.slot_minutes,
                defaults.slot_duration,
            )?,
            max_slots: settings.max_slots.unwrap_or(defaults.max_slots),
            working_hours,
            buffer: minutes_or("buffer_minutes", settings.buffer_minutes, defaults.buffer)?,
            slot_step: minutes_or("step_minutes", settings.step_minutes, defaults.slot_step)?,
            timezone,
            missing_end: settings.missing_end.unwrap_or(defaults.missing_end),
        };
        config.validate()?;
        Ok(config)
    }
}

fn minutes_or(key: &str, value: Option<i64>, default: Duration) -> Result<Duration> {
    match value {
        Some(minutes) => Duration::try_minutes(minutes).ok_or_else(|| {
            SlotError::InvalidConfig(format!("{} out of range: {}", key, minutes))
        }),
        None => Ok(default),
    }
}

/// Parse an IANA zone name such as `Europe/Berlin`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| SlotError::InvalidTimezone(name.to_string()))
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| SlotError::InvalidConfig(format!("invalid time of day '{}'", value)))
}
