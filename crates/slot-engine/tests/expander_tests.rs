//! Tests for recurring-event expansion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Europe::Berlin;
use chrono_tz::Tz;
use slot_engine::expander::expand_event;
use slot_engine::{
    find_free_slots, parse_calendar, CalendarEvent, EventTime, Recurrence, SlotConfig, SlotError,
};

fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn berlin(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
    Berlin.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn weekly_monday_evening(exdates: Vec<EventTime>) -> CalendarEvent {
    CalendarEvent::starting_at(EventTime::Zoned(naive(2025, 1, 6, 18, 0), Berlin))
        .with_end(EventTime::Zoned(naive(2025, 1, 6, 19, 0), Berlin))
        .with_summary("Chor")
        .with_recurrence(Recurrence {
            rule: "FREQ=WEEKLY;BYDAY=MO".to_string(),
            exdates,
        })
}

#[test]
fn non_recurring_event_is_returned_as_is() {
    let event = CalendarEvent::timed(naive(2025, 1, 6, 9, 0), naive(2025, 1, 6, 10, 0));
    let expanded = expand_event(
        &event,
        Berlin,
        berlin(2025, 1, 6, 8, 0),
        berlin(2025, 1, 13, 8, 0),
    )
    .unwrap();
    assert_eq!(expanded, vec![event]);
}

#[test]
fn weekly_rule_expands_inside_window() {
    let event = weekly_monday_evening(Vec::new());

    let expanded = expand_event(
        &event,
        Berlin,
        berlin(2025, 1, 6, 8, 0),
        berlin(2025, 1, 27, 10, 0),
    )
    .unwrap();

    let starts: Vec<EventTime> = expanded.iter().map(|e| e.start).collect();
    assert_eq!(
        starts,
        vec![
            EventTime::Zoned(naive(2025, 1, 6, 18, 0), Berlin),
            EventTime::Zoned(naive(2025, 1, 13, 18, 0), Berlin),
            EventTime::Zoned(naive(2025, 1, 20, 18, 0), Berlin),
        ]
    );
    for occurrence in &expanded {
        assert!(occurrence.recurrence.is_none());
        assert_eq!(occurrence.summary.as_deref(), Some("Chor"));
    }
    assert_eq!(
        expanded[1].end,
        Some(EventTime::Zoned(naive(2025, 1, 13, 19, 0), Berlin))
    );
}

#[test]
fn until_is_read_in_the_event_zone() {
    let cases = [
        // 18:00 Berlin is 17:00 UTC; the last occurrence is included.
        ("FREQ=WEEKLY;BYDAY=MO;UNTIL=20250120T180000", 3),
        // One second earlier in Berlin time, although 17:59:59 UTC would still cover it.
        ("FREQ=WEEKLY;BYDAY=MO;UNTIL=20250120T175959", 2),
        // A date-only UNTIL covers that whole day.
        ("FREQ=WEEKLY;BYDAY=MO;UNTIL=20250113", 2),
        ("FREQ=WEEKLY;BYDAY=MO;UNTIL=20250120", 3),
        // UTC values are taken as they are.
        ("FREQ=WEEKLY;BYDAY=MO;UNTIL=20250120T170000Z", 3),
        ("FREQ=WEEKLY;BYDAY=MO;UNTIL=20250120T165959Z", 2),
    ];

    for (rule, expected) in cases {
        let event = weekly_monday_evening(Vec::new()).with_recurrence(Recurrence {
            rule: rule.to_string(),
            exdates: Vec::new(),
        });
        let expanded = expand_event(
            &event,
            Berlin,
            berlin(2025, 1, 6, 8, 0),
            berlin(2025, 1, 31, 20, 0),
        )
        .unwrap();
        assert_eq!(expanded.len(), expected, "occurrences for {}", rule);
    }
}

#[test]
fn exdates_remove_occurrences() {
    let event = weekly_monday_evening(vec![EventTime::Zoned(
        naive(2025, 1, 13, 18, 0),
        Berlin,
    )]);

    let expanded = expand_event(
        &event,
        Berlin,
        berlin(2025, 1, 6, 8, 0),
        berlin(2025, 1, 27, 10, 0),
    )
    .unwrap();

    assert_eq!(expanded.len(), 2);
    assert_eq!(
        expanded[1].start,
        EventTime::Zoned(naive(2025, 1, 20, 18, 0), Berlin)
    );
}

#[test]
fn all_day_recurrence_shifts_by_whole_days() {
    let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    let event = CalendarEvent::all_day(day).with_recurrence(Recurrence {
        rule: "FREQ=DAILY;COUNT=3".to_string(),
        exdates: Vec::new(),
    });

    let expanded = expand_event(
        &event,
        Berlin,
        berlin(2025, 1, 6, 0, 0),
        berlin(2025, 1, 20, 0, 0),
    )
    .unwrap();

    let dates: Vec<EventTime> = expanded.iter().map(|e| e.start).collect();
    assert_eq!(
        dates,
        vec![
            EventTime::Date(day),
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()),
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()),
        ]
    );
}

#[test]
fn wall_clock_time_is_kept_across_dst() {
    // Europe/Berlin switches to summer time on 2025-03-30.
    let event = CalendarEvent::starting_at(EventTime::Zoned(naive(2025, 3, 24, 9, 0), Berlin))
        .with_end(EventTime::Zoned(naive(2025, 3, 24, 10, 0), Berlin))
        .with_recurrence(Recurrence {
            rule: "FREQ=WEEKLY;COUNT=2".to_string(),
            exdates: Vec::new(),
        });

    let expanded = expand_event(
        &event,
        Berlin,
        berlin(2025, 3, 24, 0, 0),
        berlin(2025, 4, 7, 0, 0),
    )
    .unwrap();

    assert_eq!(expanded.len(), 2);
    assert_eq!(
        expanded[1].start,
        EventTime::Zoned(naive(2025, 3, 31, 9, 0), Berlin)
    );
}

#[test]
fn invalid_rule_is_an_error() {
    let event = CalendarEvent::timed(naive(2025, 1, 6, 9, 0), naive(2025, 1, 6, 10, 0))
        .with_recurrence(Recurrence {
            rule: "FREQ=SOMETIMES".to_string(),
            exdates: Vec::new(),
        });

    let result = expand_event(
        &event,
        Berlin,
        berlin(2025, 1, 6, 8, 0),
        berlin(2025, 1, 13, 8, 0),
    );

    assert!(matches!(result, Err(SlotError::InvalidRule(_))));
}

#[test]
fn recurring_standup_blocks_every_morning() {
    let ics = "BEGIN:VCALENDAR\r\n\
               BEGIN:VEVENT\r\n\
               DTSTART;TZID=Europe/Berlin:20250101T090000\r\n\
               DTEND;TZID=Europe/Berlin:20250101T100000\r\n\
               RRULE:FREQ=DAILY\r\n\
               SUMMARY:Standup\r\n\
               END:VEVENT\r\n\
               END:VCALENDAR\r\n";
    let events = parse_calendar(ics).events;
    let config = SlotConfig {
        max_slots: 1,
        ..SlotConfig::in_timezone(Berlin)
    };

    let today = find_free_slots(&events, &berlin(2025, 1, 6, 8, 0), &config).unwrap();
    let friday = find_free_slots(&events, &berlin(2025, 1, 10, 8, 0), &config).unwrap();

    assert_eq!(today[0].start, berlin(2025, 1, 6, 10, 30));
    assert_eq!(friday[0].start, berlin(2025, 1, 10, 10, 30));
}

#[test]
fn broken_recurrence_does_not_take_down_the_search() {
    let event = CalendarEvent::timed(naive(2025, 1, 6, 9, 0), naive(2025, 1, 6, 10, 0))
        .with_recurrence(Recurrence {
            rule: "NOT A RULE".to_string(),
            exdates: Vec::new(),
        });
    let config = SlotConfig::in_timezone(Berlin);

    let slots = find_free_slots(&[event], &berlin(2025, 1, 6, 8, 0), &config).unwrap();

    assert_eq!(slots[0].start, berlin(2025, 1, 6, 9, 0));
}
