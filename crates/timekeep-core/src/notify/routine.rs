//! Routine schedule expansion and collapsing.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Weekday};
use tracing::warn;

use super::channels::ChannelId;
use super::keys::TriggerKey;
use super::trigger::{Repeat, ScheduledTrigger};
use crate::ports::{RoutineSchedule, RoutineType};
use crate::time::{next_occurrence, parse_time_of_day, DayFilter, TimeOfDay};

/// The single surviving start time for one routine on one day slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedRoutine {
    pub routine_id: i64,
    pub routine_name: String,
    pub routine_type: RoutineType,
    /// `None` for the daily slot.
    pub day: Option<Weekday>,
    pub time: TimeOfDay,
}

impl CollapsedRoutine {
    pub fn key(&self) -> TriggerKey {
        TriggerKey::RoutineStart {
            routine_id: self.routine_id,
            day: self.day,
        }
    }

    pub fn repeat(&self) -> Repeat {
        if self.day.is_some() {
            Repeat::Weekly
        } else {
            Repeat::Daily
        }
    }

    pub fn trigger(&self, now: NaiveDateTime) -> ScheduledTrigger {
        ScheduledTrigger::one_shot(
            self.key().to_string(),
            ChannelId::RoutineReminders,
            "Routine starting",
            format!("Time to start {} ({}).", self.routine_name, self.time),
            next_occurrence(self.time, self.day, now),
        )
        .repeating(self.repeat())
    }
}

/// Expand day filters and keep the earliest time per `(routine, day)`.
///
/// Schedules without a parseable start time are dropped. Ties keep the
/// first one seen; output follows first-seen order of each slot.
pub fn collapse_schedules(schedules: &[RoutineSchedule]) -> Vec<CollapsedRoutine> {
    let mut slots: HashMap<(i64, Option<Weekday>), usize> = HashMap::new();
    let mut out: Vec<CollapsedRoutine> = Vec::new();

    for schedule in schedules {
        let Some(raw) = schedule.scheduled_time.as_deref() else {
            continue;
        };
        let Some(time) = parse_time_of_day(raw) else {
            warn!(
                routine_id = schedule.routine_id,
                scheduled_time = raw,
                "skipping routine with malformed start time"
            );
            continue;
        };

        for day in schedule.day_filter.unwrap_or(DayFilter::All).expand() {
            let candidate = CollapsedRoutine {
                routine_id: schedule.routine_id,
                routine_name: schedule.routine_name.clone(),
                routine_type: schedule.routine_type,
                day,
                time,
            };
            match slots.get(&(schedule.routine_id, day)) {
                Some(&index) => {
                    if candidate.time < out[index].time {
                        out[index] = candidate;
                    }
                }
                None => {
                    slots.insert((schedule.routine_id, day), out.len());
                    out.push(candidate);
                }
            }
        }
    }
    out
}
