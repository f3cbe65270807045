use chrono::{Duration, NaiveDateTime};

use super::channels::ChannelId;
use super::keys::TriggerKey;
use super::trigger::ScheduledTrigger;

/// The two alerts attached to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerWarningSet {
    pub session_id: i64,
    pub activity_name: String,
    pub expected_minutes: i64,
    pub start_time: NaiveDateTime,
    /// How long before the expected end the warning fires.
    pub lead_minutes: i64,
}

impl TimerWarningSet {
    pub fn new(
        session_id: i64,
        activity_name: impl Into<String>,
        expected_minutes: i64,
        start_time: NaiveDateTime,
        lead_minutes: i64,
    ) -> Self {
        Self {
            session_id,
            activity_name: activity_name.into(),
            expected_minutes,
            start_time,
            lead_minutes,
        }
    }

    /// `None` when the session length does not fit in a timestamp.
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        Duration::try_minutes(self.expected_minutes)
            .and_then(|length| self.start_time.checked_add_signed(length))
    }

    pub fn warn_at(&self) -> Option<NaiveDateTime> {
        let lead = Duration::try_minutes(self.lead_minutes)?;
        self.due_at()?.checked_sub_signed(lead)
    }

    pub fn warning_key(&self) -> TriggerKey {
        TriggerKey::TimerWarning(self.session_id)
    }

    pub fn due_key(&self) -> TriggerKey {
        TriggerKey::TimerDue(self.session_id)
    }

    pub fn warning_trigger(&self) -> Option<ScheduledTrigger> {
        let fire_at = self.warn_at()?;
        Some(ScheduledTrigger::one_shot(
            self.warning_key().to_string(),
            ChannelId::TimerAlerts,
            format!("{} minutes left", self.lead_minutes),
            format!(
                "{} ends in {} minutes.",
                self.activity_name, self.lead_minutes
            ),
            fire_at,
        ))
    }

    pub fn due_trigger(&self) -> Option<ScheduledTrigger> {
        let fire_at = self.due_at()?;
        Some(ScheduledTrigger::one_shot(
            self.due_key().to_string(),
            ChannelId::TimerAlerts,
            "Time's up",
            format!(
                "{} has reached its planned {} minutes.",
                self.activity_name, self.expected_minutes
            ),
            fire_at,
        ))
    }

    /// Triggers whose fire time is strictly after `now`.
    ///
    /// Instants that overflow the calendar are dropped with the rest.
    pub fn future_triggers(&self, now: NaiveDateTime) -> Vec<ScheduledTrigger> {
        if self.expected_minutes <= 0 {
            return Vec::new();
        }
        [self.warning_trigger(), self.due_trigger()]
            .into_iter()
            .flatten()
            .filter(|t| t.fire_at > now)
            .collect()
    }
}
