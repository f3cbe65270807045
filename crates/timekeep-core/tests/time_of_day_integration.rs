//! Property tests for time-of-day parsing and next-occurrence math.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use proptest::prelude::*;
use timekeep_core::time::{
    format_time_of_day, next_occurrence, parse_time_of_day, weekday_from_index, TimeOfDay,
};

fn any_time() -> impl Strategy<Value = TimeOfDay> {
    (0u8..24, 0u8..60).prop_map(|(h, m)| TimeOfDay::new(h, m).unwrap())
}

fn any_instant() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..365 * 24 * 60).prop_map(|minutes| {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minutes)
    })
}

proptest! {
    #[test]
    fn padded_strings_round_trip(h in 0u8..24, m in 0u8..60) {
        let s = format!("{h:02}:{m:02}");
        let parsed = parse_time_of_day(&s).unwrap();
        prop_assert_eq!(format_time_of_day(parsed), s);
    }

    #[test]
    fn out_of_range_is_rejected(h in 24u8..100, m in 60u8..100) {
        let bad_hour = format!("{h}:00");
        let bad_minute = format!("{}:{m}", h % 24);
        prop_assert!(parse_time_of_day(&bad_hour).is_none());
        prop_assert!(parse_time_of_day(&bad_minute).is_none());
    }

    #[test]
    fn daily_occurrence_is_within_a_day(time in any_time(), now in any_instant()) {
        let next = next_occurrence(time, None, now);
        prop_assert!(next > now);
        prop_assert!(next <= now + Duration::days(1));
        prop_assert_eq!(next.hour(), u32::from(time.hours()));
        prop_assert_eq!(next.minute(), u32::from(time.minutes()));
    }

    #[test]
    fn weekly_occurrence_lands_on_its_day(
        time in any_time(),
        now in any_instant(),
        index in 0i64..7,
    ) {
        let day = weekday_from_index(index).unwrap();
        let next = next_occurrence(time, Some(day), now);
        prop_assert!(next > now);
        prop_assert!(next <= now + Duration::days(7));
        prop_assert_eq!(next.weekday(), day);
        prop_assert_eq!(next.second(), 0);
    }
}

#[test]
fn documented_examples() {
    let nine_thirty = parse_time_of_day("09:30").unwrap();
    let at = |d: u32, h: u32, m: u32| {
        NaiveDate::from_ymd_opt(2026, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    };
    assert_eq!(next_occurrence(nine_thirty, None, at(2, 10, 0)), at(3, 9, 30));
    assert_eq!(next_occurrence(nine_thirty, None, at(2, 8, 0)), at(2, 9, 30));
    assert_eq!(
        next_occurrence(nine_thirty, weekday_from_index(1), at(2, 10, 0)),
        at(5, 9, 30)
    );
    for bad in ["24:00", "9:60", "abc", "", "12:5", "-1:00"] {
        assert!(parse_time_of_day(bad).is_none(), "{bad} should not parse");
    }
}
