//! iCalendar (RFC 5545) reader for `VEVENT` blocks.
//!
//! Only the properties that matter for availability are read: `DTSTART`,
//! `DTEND`, `DURATION`, `SUMMARY`, `LOCATION`, `RRULE`, `EXDATE`, `STATUS` and
//! `TRANSP`. A broken event never aborts the document: it is logged, counted in
//! [`ParsedCalendar::skipped`] and left out.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::{Result, SlotError};
use crate::event::{CalendarEvent, EventTime, Recurrence};

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Result of reading a calendar document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCalendar {
    pub events: Vec<CalendarEvent>,
    /// Number of `VEVENT` blocks dropped because they were malformed.
    pub skipped: usize,
}

/// One unfolded `NAME;PARAM=VALUE:value` line.
#[derive(Debug, Clone, PartialEq)]
struct ContentLine {
    line: usize,
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl ContentLine {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Parse every `VEVENT` in an iCalendar document.
pub fn parse_calendar(text: &str) -> ParsedCalendar {
    let mut parsed = ParsedCalendar::default();
    let mut current: Option<(usize, Vec<ContentLine>)> = None;
    let mut nested = 0usize;

    for (line_no, raw) in unfold(text) {
        let Some(content) = parse_content_line(line_no, &raw) else {
            if !raw.trim().is_empty() {
                debug!(line = line_no, "ignoring unparseable content line");
            }
            continue;
        };

        match content.name.as_str() {
            "BEGIN" if content.value.trim().eq_ignore_ascii_case("VEVENT") && nested == 0 => {
                if let Some((begin, _)) = current.take() {
                    warn!(line = begin, "VEVENT without END:VEVENT, skipping");
                    parsed.skipped += 1;
                }
                current = Some((line_no, Vec::new()));
            }
            "BEGIN" if current.is_some() => nested += 1,
            "END" if current.is_some() && nested > 0 => nested -= 1,
            "END" if content.value.trim().eq_ignore_ascii_case("VEVENT") => {
                if let Some((begin, lines)) = current.take() {
                    match build_event(&lines) {
                        Ok(Some(event)) => parsed.events.push(event),
                        Ok(None) => {}
                        Err(err) => {
                            warn!(line = begin, error = %err, "skipping malformed VEVENT");
                            parsed.skipped += 1;
                        }
                    }
                }
            }
            _ => {
                if let Some((_, lines)) = current.as_mut() {
                    if nested == 0 {
                        lines.push(content);
                    }
                }
            }
        }
    }

    if let Some((begin, _)) = current {
        warn!(line = begin, "VEVENT without END:VEVENT, skipping");
        parsed.skipped += 1;
    }

    debug!(
        events = parsed.events.len(),
        skipped = parsed.skipped,
        "parsed calendar"
    );
    parsed
}

/// Parse an RFC 5545 duration such as `PT1H30M`, `P1D` or `-P1W`.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let (negative, rest) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let rest = rest
        .strip_prefix('P')
        .ok_or_else(|| SlotError::parse(0, format!("duration '{}' must start with P", value)))?;

    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut in_time = false;
    let mut seen_component = false;

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if ch == 'T' && !in_time && digits.is_empty() {
            in_time = true;
            continue;
        }
        let amount: i64 = digits
            .parse()
            .map_err(|_| SlotError::parse(0, format!("invalid duration '{}'", value)))?;
        digits.clear();
        let part = match (ch, in_time) {
            ('W', false) => Duration::try_weeks(amount),
            ('D', false) => Duration::try_days(amount),
            ('H', true) => Duration::try_hours(amount),
            ('M', true) => Duration::try_minutes(amount),
            ('S', true) => Duration::try_seconds(amount),
            _ => {
                return Err(SlotError::parse(
                    0,
                    format!("unexpected '{}' in duration '{}'", ch, value),
                ))
            }
        };
        total = part
            .and_then(|part| total.checked_add(&part))
            .ok_or_else(|| SlotError::parse(0, format!("duration '{}' out of range", value)))?;
        seen_component = true;
    }

    if !digits.is_empty() || !seen_component {
        return Err(SlotError::parse(0, format!("invalid duration '{}'", value)));
    }
    Ok(if negative { -total } else { total })
}

/// Join folded lines. Yields `(first line number, logical line)`.
fn unfold(text: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in text.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(continuation) = raw.strip_prefix([' ', '\t']) {
            if let Some((_, last)) = lines.last_mut() {
                last.push_str(continuation);
                continue;
            }
        }
        lines.push((idx + 1, raw.to_string()));
    }
    lines
}

fn parse_content_line(line: usize, raw: &str) -> Option<ContentLine> {
    // Split at the first colon outside a quoted parameter value.
    let mut in_quotes = false;
    let colon = raw.char_indices().find_map(|(i, c)| match c {
        '"' => {
            in_quotes = !in_quotes;
            None
        }
        ':' if !in_quotes => Some(i),
        _ => None,
    })?;
    let (head, value) = (&raw[..colon], &raw[colon + 1..]);

    let mut parts = split_unquoted(head, ';').into_iter();
    let name = parts.next()?.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }
    let params = parts
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            Some((
                key.trim().to_ascii_uppercase(),
                value.trim().trim_matches('"').to_string(),
            ))
        })
        .collect();

    Some(ContentLine {
        line,
        name,
        params,
        value: value.to_string(),
    })
}

fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == separator && !in_quotes {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Build an event from the property lines of one `VEVENT`.
///
/// Returns `Ok(None)` for cancelled events.
fn build_event(lines: &[ContentLine]) -> Result<Option<CalendarEvent>> {
    let first = |name: &str| lines.iter().find(|l| l.name == name);

    let dtstart = first("DTSTART").ok_or_else(|| SlotError::parse(0, "missing DTSTART"))?;
    let start = parse_event_time(dtstart)?;

    if let Some(status) = first("STATUS") {
        if status.value.trim().eq_ignore_ascii_case("CANCELLED") {
            debug!(line = status.line, "dropping cancelled event");
            return Ok(None);
        }
    }

    let mut event = CalendarEvent::starting_at(start);

    if let Some(dtend) = first("DTEND") {
        let end = parse_event_time(dtend)?;
        event.end = Some(match (start, end) {
            // DTEND of an all-day event is exclusive; keep the last covered day.
            (EventTime::Date(first_day), EventTime::Date(after_last)) => {
                EventTime::Date(after_last.pred_opt().unwrap_or(after_last).max(first_day))
            }
            (EventTime::Date(_), _) | (_, EventTime::Date(_)) => {
                return Err(SlotError::parse(
                    dtend.line,
                    "DTSTART and DTEND mix date and date-time values",
                ))
            }
            (_, end) => end,
        });
    } else if let Some(duration_line) = first("DURATION") {
        let duration =
            parse_duration(&duration_line.value).map_err(|err| at_line(err, duration_line.line))?;
        if duration < Duration::zero() {
            return Err(SlotError::parse(duration_line.line, "negative DURATION"));
        }
        match start {
            EventTime::Date(day) => {
                let extra_days = u64::try_from(duration.num_days().max(1) - 1).unwrap_or(0);
                let last_day = day
                    .checked_add_days(Days::new(extra_days))
                    .ok_or_else(|| SlotError::parse(duration_line.line, "DURATION out of range"))?;
                event.end = Some(EventTime::Date(last_day));
            }
            _ => event.duration = Some(duration),
        }
    }

    event.summary = first("SUMMARY").map(|l| unescape_text(&l.value));
    event.location = first("LOCATION").map(|l| unescape_text(&l.value));
    event.transparent = first("TRANSP")
        .map(|l| l.value.trim().eq_ignore_ascii_case("TRANSPARENT"))
        .unwrap_or(false);

    if let Some(rrule) = first("RRULE") {
        let mut exdates = Vec::new();
        for line in lines.iter().filter(|l| l.name == "EXDATE") {
            for value in line.value.split(',').filter(|v| !v.trim().is_empty()) {
                exdates.push(parse_time_value(value, line)?);
            }
        }
        event.recurrence = Some(Recurrence {
            rule: rrule.value.trim().to_string(),
            exdates,
        });
    }

    Ok(Some(event))
}

fn parse_event_time(line: &ContentLine) -> Result<EventTime> {
    parse_time_value(&line.value, line)
}

fn parse_time_value(value: &str, line: &ContentLine) -> Result<EventTime> {
    let value = value.trim();
    let is_date = line
        .param("VALUE")
        .map(|v| v.eq_ignore_ascii_case("DATE"))
        .unwrap_or(false)
        || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));

    if is_date {
        return NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(EventTime::Date)
            .map_err(|e| SlotError::parse(line.line, format!("invalid date '{}': {}", value, e)));
    }

    if let Some(utc) = value.strip_suffix(['Z', 'z']) {
        return parse_naive(utc, line).map(|local| EventTime::Instant(local.and_utc()));
    }

    let local = parse_naive(value, line)?;
    match line.param("TZID") {
        Some(tzid) => match tzid.trim_start_matches('/').parse::<Tz>() {
            Ok(tz) => Ok(EventTime::Zoned(local, tz)),
            Err(_) => {
                warn!(line = line.line, tzid, "unknown TZID, treating time as floating");
                Ok(EventTime::Floating(local))
            }
        },
        None => Ok(EventTime::Floating(local)),
    }
}

fn parse_naive(value: &str, line: &ContentLine) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).map_err(|e| {
        SlotError::parse(line.line, format!("invalid date-time '{}': {}", value, e))
    })
}

fn at_line(err: SlotError, line: usize) -> SlotError {
    match err {
        SlotError::Parse { message, .. } => SlotError::Parse { line, message },
        other => other,
    }
}

/// Undo RFC 5545 TEXT escaping.
pub(crate) fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfold_joins_continuation_lines() {
        let lines = unfold("SUMMARY:Lunch with\r\n  the team\r\nLOCATION:Cafe");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (1, "SUMMARY:Lunch with the team".to_string()));
        assert_eq!(lines[1].0, 3);
    }

    #[test]
    fn quoted_params_may_contain_colons() {
        let line =
            parse_content_line(1, "DTSTART;TZID=\"Europe/Berlin\";X-NOTE=\"a:b\":20250106T100000")
                .unwrap();
        assert_eq!(line.name, "DTSTART");
        assert_eq!(line.param("tzid"), Some("Europe/Berlin"));
        assert_eq!(line.value, "20250106T100000");
    }

    #[test]
    fn unescape_handles_rfc5545_sequences() {
        assert_eq!(
            unescape_text(r"Berlin\, Mitte\; 2. OG\nHinterhof"),
            "Berlin, Mitte; 2. OG\nHinterhof"
        );
    }
}
