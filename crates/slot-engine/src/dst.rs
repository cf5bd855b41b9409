//! DST-safe resolution of wall-clock times.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

/// How far back to look for the UTC offset in force before a DST gap.
const GAP_PROBE_HOURS: i64 = 6;

/// Resolve a wall-clock time in `tz` to a concrete instant.
///
/// - Ambiguous times (fall back) resolve to the earliest instant.
/// - Non-existent times (spring forward) are moved later by the length of the
///   gap, e.g. 02:30 on a Europe/Berlin spring-forward night becomes 03:30.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let probe = local - Duration::hours(GAP_PROBE_HOURS);
            let offset_secs = tz
                .offset_from_local_datetime(&probe)
                .earliest()
                .map(|o| o.fix().local_minus_utc())
                .unwrap_or(0);
            tz.from_utc_datetime(&(local - Duration::seconds(i64::from(offset_secs))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn gap_time_moves_past_the_gap() {
        let dt = resolve_local(chrono_tz::Europe::Berlin, naive(2025, 3, 30, 2, 30));
        assert_eq!(dt.naive_local(), naive(2025, 3, 30, 3, 30));
    }

    #[test]
    fn ambiguous_time_takes_earliest() {
        let dt = resolve_local(chrono_tz::Europe::Berlin, naive(2025, 10, 26, 2, 30));
        // Still on CEST (+02:00) for the first 02:30.
        assert_eq!(dt.offset().fix().local_minus_utc(), 7200);
    }
}
