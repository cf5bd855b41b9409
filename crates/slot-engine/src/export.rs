//! Write chosen slots back out as iCalendar meeting events.

use chrono::{DateTime, Utc};

use crate::event::FreeSlot;

/// Placeholder used by listings that do not name the seller.
pub const UNKNOWN_SELLER: &str = "Unbekannter Verkäufer";
pub const DEFAULT_TITLE: &str = "Kleinanzeige";

const PRODID: &str = "-//slot-engine//Free Slot Finder//EN";
const MAX_LINE_OCTETS: usize = 75;

/// What the exported meetings are about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingDetails {
    pub title: String,
    pub seller: Option<String>,
    pub location: Option<String>,
}

impl MeetingDetails {
    pub fn summary(&self) -> String {
        meeting_summary(&self.title, self.seller.as_deref())
    }
}

/// Event title for a meeting with a seller about a listing.
pub fn meeting_summary(title: &str, seller: Option<&str>) -> String {
    let title = match title.trim() {
        "" => DEFAULT_TITLE,
        t => t,
    };
    match seller.map(str::trim) {
        Some(seller) if !seller.is_empty() && seller != UNKNOWN_SELLER => {
            format!("Treffen mit {} zu '{}'", seller, title)
        }
        _ => format!("Treffen zu '{}'", title),
    }
}

/// Render one `VEVENT` per slot inside a `VCALENDAR`.
///
/// Output uses CRLF line endings and folds lines longer than 75 octets. UIDs
/// are derived from the slot start, so the same slots always export the same
/// document for a given `stamp`.
pub fn slots_to_ics(slots: &[FreeSlot], details: &MeetingDetails, stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".to_string(),
    ];

    let summary = escape_text(&details.summary());
    for (index, slot) in slots.iter().enumerate() {
        let tzid = slot.start.timezone().name();
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!(
            "UID:{}-{}@slot-engine",
            slot.start.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ"),
            index
        ));
        lines.push(format!("DTSTAMP:{}", stamp.format("%Y%m%dT%H%M%SZ")));
        lines.push(format!(
            "DTSTART;TZID={}:{}",
            tzid,
            slot.start.format("%Y%m%dT%H%M%S")
        ));
        lines.push(format!(
            "DTEND;TZID={}:{}",
            slot.end.timezone().name(),
            slot.end.format("%Y%m%dT%H%M%S")
        ));
        lines.push(format!("SUMMARY:{}", summary));
        if let Some(location) = details.location.as_deref().filter(|l| !l.trim().is_empty()) {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        fold_line(line, &mut out);
    }
    out
}

/// RFC 5545 TEXT escaping.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Append `line` to `out`, folded at 75 octets without splitting characters.
fn fold_line(line: &str, out: &mut String) {
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        if used + c.len_utf8() > budget {
            out.push_str("\r\n ");
            // The leading space counts against the continuation line.
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += c.len_utf8();
    }
    out.push_str("\r\n");
}
