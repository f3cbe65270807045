//! Deterministic trigger keys.
//!
//! Keys are the only handle the scheduler keeps on installed triggers, so
//! every key is derived from stable ids and never from user-visible text.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;

use crate::error::ValidationError;
use crate::time::{weekday_from_index, weekday_index};

/// Fixed key of the single inactivity reminder.
pub const INACTIVITY_KEY: &str = "no-timer-reminder";

/// Prefix shared by every routine-start trigger.
pub const ROUTINE_KEY_PREFIX: &str = "routine-start-";

const TIMER_WARNING_PREFIX: &str = "timer-5min-";
const TIMER_DUE_PREFIX: &str = "timer-timeup-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKey {
    /// Fires a few minutes before a session's expected end.
    TimerWarning(i64),
    /// Fires when a session reaches its expected length.
    TimerDue(i64),
    Inactivity,
    /// `day` is `None` for a daily routine slot.
    RoutineStart { routine_id: i64, day: Option<Weekday> },
}

impl TriggerKey {
    pub fn is_routine(&self) -> bool {
        matches!(self, TriggerKey::RoutineStart { .. })
    }
}

/// True when `key` names a routine-start trigger.
pub fn is_routine_key(key: &str) -> bool {
    key.starts_with(ROUTINE_KEY_PREFIX)
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKey::TimerWarning(id) => write!(f, "{TIMER_WARNING_PREFIX}{id}"),
            TriggerKey::TimerDue(id) => write!(f, "{TIMER_DUE_PREFIX}{id}"),
            TriggerKey::Inactivity => f.write_str(INACTIVITY_KEY),
            TriggerKey::RoutineStart { routine_id, day } => match day {
                Some(day) => write!(f, "{ROUTINE_KEY_PREFIX}{routine_id}-{}", weekday_index(*day)),
                None => write!(f, "{ROUTINE_KEY_PREFIX}{routine_id}-daily"),
            },
        }
    }
}

impl FromStr for TriggerKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidValue {
            field: "trigger_key".into(),
            message: format!("unrecognised trigger key '{s}'"),
        };

        if s == INACTIVITY_KEY {
            return Ok(TriggerKey::Inactivity);
        }
        if let Some(id) = s.strip_prefix(TIMER_WARNING_PREFIX) {
            return id.parse().map(TriggerKey::TimerWarning).map_err(|_| invalid());
        }
        if let Some(id) = s.strip_prefix(TIMER_DUE_PREFIX) {
            return id.parse().map(TriggerKey::TimerDue).map_err(|_| invalid());
        }
        if let Some(rest) = s.strip_prefix(ROUTINE_KEY_PREFIX) {
            let (id, day) = rest.rsplit_once('-').ok_or_else(invalid)?;
            let routine_id = id.parse().map_err(|_| invalid())?;
            let day = match day {
                "daily" => None,
                n => {
                    let index: i64 = n.parse().map_err(|_| invalid())?;
                    Some(weekday_from_index(index).ok_or(ValidationError::InvalidDayOfWeek(index))?)
                }
            };
            return Ok(TriggerKey::RoutineStart { routine_id, day });
        }
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_keys() {
        assert_eq!(TriggerKey::TimerWarning(42).to_string(), "timer-5min-42");
        assert_eq!(TriggerKey::TimerDue(42).to_string(), "timer-timeup-42");
    }

    #[test]
    fn routine_keys() {
        let daily = TriggerKey::RoutineStart {
            routine_id: 7,
            day: None,
        };
        assert_eq!(daily.to_string(), "routine-start-7-daily");
        let monday = TriggerKey::RoutineStart {
            routine_id: 7,
            day: Some(Weekday::Mon),
        };
        assert_eq!(monday.to_string(), "routine-start-7-1");
        assert!(is_routine_key(&monday.to_string()));
        assert!(monday.is_routine());
    }

    #[test]
    fn parses_every_kind() {
        for key in [
            TriggerKey::TimerWarning(3),
            TriggerKey::TimerDue(3),
            TriggerKey::Inactivity,
            TriggerKey::RoutineStart {
                routine_id: 11,
                day: Some(Weekday::Sun),
            },
            TriggerKey::RoutineStart {
                routine_id: 11,
                day: None,
            },
        ] {
            assert_eq!(key.to_string().parse::<TriggerKey>().unwrap(), key);
        }
    }

    #[test]
    fn rejects_foreign_keys() {
        assert!("reminder-1".parse::<TriggerKey>().is_err());
        assert!("timer-5min-abc".parse::<TriggerKey>().is_err());
        assert!("routine-start-1-9".parse::<TriggerKey>().is_err());
        assert!(!is_routine_key(INACTIVITY_KEY));
    }
}
