//! Tests for reading free/busy JSON documents.

use chrono::{DateTime, TimeZone};
use chrono_tz::Europe::Berlin;
use chrono_tz::Tz;
use slot_engine::freebusy::parse_timestamp;
use slot_engine::{find_free_slots_in_busy, parse_freebusy, SlotConfig, SlotError};

fn berlin(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
    Berlin.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
}

#[test]
fn plain_array_of_periods() {
    let json = r#"[
        {"start": "2025-01-06T09:00:00+01:00", "end": "2025-01-06T10:00:00+01:00"},
        {"start": "2025-01-06T13:00:00Z", "end": "2025-01-06T14:00:00Z"}
    ]"#;

    let busy = parse_freebusy(json, Berlin).unwrap();

    assert_eq!(busy.len(), 2);
    assert_eq!(busy[0].start, berlin(6, 9, 0));
    assert_eq!(busy[1].start, berlin(6, 14, 0));
    assert_eq!(busy[1].end.timezone(), Berlin);
}

#[test]
fn busy_object() {
    let json = r#"{"busy": [{"start": "2025-01-06T09:00:00", "end": "2025-01-06T10:00:00"}]}"#;
    let busy = parse_freebusy(json, Berlin).unwrap();
    // Naive timestamps are read in the output zone.
    assert_eq!(busy[0].start, berlin(6, 9, 0));
    assert_eq!(busy[0].end, berlin(6, 10, 0));
}

#[test]
fn calendar_service_response_combines_calendars() {
    let json = r#"{
        "kind": "calendar#freeBusy",
        "timeMin": "2025-01-06T07:00:00.000Z",
        "timeMax": "2025-01-20T07:00:00.000Z",
        "calendars": {
            "primary": {
                "busy": [{"start": "2025-01-06T08:00:00Z", "end": "2025-01-06T09:00:00Z"}]
            },
            "work@example.com": {
                "busy": [{"start": "2025-01-07T08:00:00Z", "end": "2025-01-07T09:00:00Z"}]
            },
            "broken@example.com": {"errors": [{"domain": "global", "reason": "notFound"}]}
        }
    }"#;

    let busy = parse_freebusy(json, Berlin).unwrap();

    assert_eq!(busy.len(), 2);
}

#[test]
fn unreadable_entries_are_skipped() {
    let json = r#"[
        {"start": "2025-01-06T09:00:00+01:00", "end": "2025-01-06T10:00:00+01:00"},
        {"start": "tomorrow", "end": "2025-01-06T10:00:00+01:00"},
        {"start": "2025-01-06T12:00:00+01:00"},
        {"start": "2025-01-06T12:00:00+01:00", "end": "2025-01-06T11:00:00+01:00"},
        42
    ]"#;

    let busy = parse_freebusy(json, Berlin).unwrap();

    assert_eq!(busy.len(), 1);
}

#[test]
fn invalid_json_is_an_error() {
    assert!(matches!(
        parse_freebusy("{not json", Berlin),
        Err(SlotError::Json(_))
    ));
}

#[test]
fn unrecognized_document_is_an_error() {
    assert!(matches!(
        parse_freebusy(r#"{"events": []}"#, Berlin),
        Err(SlotError::Parse { .. })
    ));
}

#[test]
fn timestamps_accept_minutes_precision() {
    assert_eq!(parse_timestamp("2025-01-06T09:30", Berlin), Some(berlin(6, 9, 30)));
    assert_eq!(parse_timestamp("06.01.2025 09:30", Berlin), None);
}

#[test]
fn free_busy_answer_drives_the_finder() {
    let json = r#"{"calendars": {"primary": {"busy": [
        {"start": "2025-01-06T08:00:00Z", "end": "2025-01-06T11:00:00Z"}
    ]}}}"#;
    let busy = parse_freebusy(json, Berlin).unwrap();

    let slots =
        find_free_slots_in_busy(&busy, &berlin(6, 8, 0), &SlotConfig::in_timezone(Berlin)).unwrap();

    // Busy until 12:00 Berlin, then the 15 min buffer and the half-hour grid.
    assert_eq!(slots[0].start, berlin(6, 12, 30));
}
