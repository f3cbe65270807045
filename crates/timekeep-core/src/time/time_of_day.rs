//! Time-of-day parsing and next-occurrence arithmetic.
//!
//! Everything here is pure: the caller supplies `now` and gets back a
//! concrete local wall-clock timestamp. Day-of-week indices follow the
//! Sunday = 0 convention used by the routine store and the trigger keys.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A wall-clock time of day with minute precision.
///
/// Ordering is chronological (hours first, then minutes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    hours: u8,
    minutes: u8,
}

impl TimeOfDay {
    /// Build a time of day, rejecting out-of-range components.
    pub fn new(hours: u8, minutes: u8) -> Option<Self> {
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(Self { hours, minutes })
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hours.into(), self.minutes.into(), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time_of_day(s).ok_or_else(|| ValidationError::InvalidTimeOfDay(s.to_string()))
    }
}

/// Parse `"HH:MM"` (or `"H:MM"`) into a [`TimeOfDay`].
///
/// Returns `None` for anything malformed or out of range. Never panics.
pub fn parse_time_of_day(s: &str) -> Option<TimeOfDay> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    TimeOfDay::new(h.parse().ok()?, m.parse().ok()?)
}

/// Zero-padded `"HH:MM"`.
pub fn format_time_of_day(time: TimeOfDay) -> String {
    time.to_string()
}

/// Next instant strictly after `now` at which `time` occurs.
///
/// Without a weekday this is today if still ahead, otherwise tomorrow.
/// With a weekday it is the next such day; when today is that weekday and
/// the time has passed, the result is exactly seven days out.
pub fn next_occurrence(
    time: TimeOfDay,
    day_of_week: Option<Weekday>,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let today_at = now.date().and_time(time.to_naive_time());
    match day_of_week {
        None => {
            if today_at > now {
                today_at
            } else {
                today_at + Duration::days(1)
            }
        }
        Some(target) => {
            let current = i64::from(now.weekday().num_days_from_sunday());
            let wanted = i64::from(target.num_days_from_sunday());
            let mut days_ahead = (wanted - current).rem_euclid(7);
            if days_ahead == 0 && today_at <= now {
                days_ahead = 7;
            }
            today_at + Duration::days(days_ahead)
        }
    }
}

/// Map a Sunday-based index (0..=6) to a weekday.
pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Sunday-based index (0..=6) of a weekday.
pub fn weekday_index(day: Weekday) -> u32 {
    day.num_days_from_sunday()
}

/// Which days a routine runs on, as stored by the routine editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayFilter {
    All,
    Weekdays,
    Weekend,
    /// A single day, Sunday-based index.
    Day(u8),
}

impl DayFilter {
    /// Concrete day slots. `None` stands for "every day".
    ///
    /// An out-of-range single day expands to nothing.
    pub fn expand(&self) -> Vec<Option<Weekday>> {
        match self {
            DayFilter::All => vec![None],
            DayFilter::Weekdays => vec![
                Some(Weekday::Mon),
                Some(Weekday::Tue),
                Some(Weekday::Wed),
                Some(Weekday::Thu),
                Some(Weekday::Fri),
            ],
            DayFilter::Weekend => vec![Some(Weekday::Sat), Some(Weekday::Sun)],
            DayFilter::Day(index) => weekday_from_index(i64::from(*index))
                .map(|d| vec![Some(d)])
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for DayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayFilter::All => f.write_str("all"),
            DayFilter::Weekdays => f.write_str("weekdays"),
            DayFilter::Weekend => f.write_str("weekend"),
            DayFilter::Day(index) => write!(f, "day:{index}"),
        }
    }
}

impl FromStr for DayFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidValue {
            field: "day_filter".into(),
            message: format!("expected all, weekdays, weekend or day:N, got '{s}'"),
        };
        match s.trim() {
            "all" => Ok(DayFilter::All),
            "weekdays" => Ok(DayFilter::Weekdays),
            "weekend" => Ok(DayFilter::Weekend),
            other => {
                let index: i64 = other
                    .strip_prefix("day:")
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(invalid)?;
                if weekday_from_index(index).is_none() {
                    return Err(ValidationError::InvalidDayOfWeek(index));
                }
                Ok(DayFilter::Day(index as u8))
            }
        }
    }
}
