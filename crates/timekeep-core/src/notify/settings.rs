//! Setting keys the scheduler reads, with their defaults.

pub const NOTIFICATIONS_ENABLED: &str = "notificationsEnabled";
pub const REMINDER_ROUTINE_START: &str = "reminderRoutineStart";
pub const NO_TIMER_REMINDER_ENABLED: &str = "noTimerReminderEnabled";
pub const NO_TIMER_REMINDER_MINUTES: &str = "noTimerReminderMinutes";

pub const DEFAULT_NOTIFICATIONS_ENABLED: bool = true;
pub const DEFAULT_REMINDER_ROUTINE_START: bool = true;
pub const DEFAULT_NO_TIMER_REMINDER_ENABLED: bool = false;
pub const DEFAULT_NO_TIMER_REMINDER_MINUTES: i64 = 5;
/// Longest inactivity interval accepted from user input.
pub const MAX_NO_TIMER_REMINDER_MINUTES: i64 = 24 * 60;

/// Every key with its string-encoded default, for listings.
pub const ALL: [(&str, &str); 4] = [
    (NOTIFICATIONS_ENABLED, "true"),
    (REMINDER_ROUTINE_START, "true"),
    (NO_TIMER_REMINDER_ENABLED, "false"),
    (NO_TIMER_REMINDER_MINUTES, "5"),
];

/// Decode a stored boolean. Accepts `true`/`false`/`1`/`0`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Decode a stored number, truncating any fractional part.
pub fn parse_number(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n as i64))
}
