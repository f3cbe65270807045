//! In-memory adapters for every port.
//!
//! Used by tests and by hosts that keep nothing on disk. Each adapter can
//! be switched into a failing mode to exercise the scheduler's error path.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::channels::{ChannelId, ChannelSpec};
use super::settings::{parse_bool, parse_number};
use super::trigger::ScheduledTrigger;
use crate::error::{CoreError, NotifyError, Result};
use crate::events::{DeliveryEvent, DeliveryOrigin};
use crate::ports::{
    NotificationPlatform, RoutineQuery, RoutineSchedule, RunningSession, SessionQuery,
    SettingsGateway,
};

fn unavailable(source_name: &'static str) -> CoreError {
    NotifyError::SourceUnavailable {
        source_name,
        message: "simulated failure".into(),
    }
    .into()
}

/// Platform trigger store held in a map keyed by trigger key.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    channels: Mutex<BTreeMap<ChannelId, ChannelSpec>>,
    triggers: Mutex<BTreeMap<String, ScheduledTrigger>>,
    failing: AtomicBool,
    install_failing: AtomicBool,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail installs only; cancel and pending keep working.
    pub fn set_install_failing(&self, failing: bool) {
        self.install_failing.store(failing, Ordering::SeqCst);
    }

    /// Created channels in `ChannelId` order.
    pub fn channels(&self) -> Vec<ChannelSpec> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Pending triggers sorted by key.
    pub fn snapshot(&self) -> Vec<ScheduledTrigger> {
        self.triggers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<ScheduledTrigger> {
        self.triggers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Fire everything due at `now`.
    ///
    /// One-shot triggers are removed; recurring ones move to their next
    /// period. Events come back in fire-time order.
    pub fn deliver_due(&self, now: NaiveDateTime, origin: DeliveryOrigin) -> Vec<DeliveryEvent> {
        let mut triggers = self.triggers.lock().unwrap_or_else(|e| e.into_inner());
        let mut due: Vec<(NaiveDateTime, String)> = triggers
            .values()
            .filter(|t| t.fire_at <= now)
            .map(|t| (t.fire_at, t.key.clone()))
            .collect();
        due.sort();

        let mut events = Vec::with_capacity(due.len());
        for (_, key) in due {
            let next = triggers.get(&key).and_then(|t| t.next_fire_after(now));
            match next {
                Some(next) => {
                    if let Some(t) = triggers.get_mut(&key) {
                        t.fire_at = next;
                    }
                }
                None => {
                    triggers.remove(&key);
                }
            }
            events.push(DeliveryEvent::new(key, origin, now));
        }
        events
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("notification platform"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationPlatform for InMemoryPlatform {
    async fn create_channel(&self, channel: &ChannelSpec) -> Result<()> {
        self.check()?;
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.id, channel.clone());
        Ok(())
    }

    async fn install(&self, trigger: ScheduledTrigger) -> Result<()> {
        self.check()?;
        if self.install_failing.load(Ordering::SeqCst) {
            return Err(NotifyError::InstallFailed {
                key: trigger.key,
                message: "simulated failure".into(),
            }
            .into());
        }
        self.triggers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(trigger.key.clone(), trigger);
        Ok(())
    }

    async fn cancel(&self, key: &str) -> Result<()> {
        self.check()?;
        match self
            .triggers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
        {
            Some(_) => Ok(()),
            None => Err(NotifyError::TriggerNotFound { key: key.into() }.into()),
        }
    }

    async fn pending(&self) -> Result<Vec<ScheduledTrigger>> {
        self.check()?;
        Ok(self.snapshot())
    }
}

/// String-valued settings map.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: impl ToString) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn raw(&self, key: &str) -> Result<Option<String>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("settings"));
        }
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}

#[async_trait]
impl SettingsGateway for InMemorySettings {
    async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self
            .raw(key)?
            .and_then(|v| parse_bool(&v))
            .unwrap_or(default))
    }

    async fn get_number(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self
            .raw(key)?
            .and_then(|v| parse_number(&v))
            .unwrap_or(default))
    }
}

/// Running-session list.
#[derive(Debug, Default)]
pub struct InMemorySessions {
    sessions: Mutex<Vec<RunningSession>>,
    failing: AtomicBool,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, session: RunningSession) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|s| s.session_id != session.session_id);
        sessions.push(session);
    }

    pub fn stop(&self, session_id: i64) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|s| s.session_id != session_id);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionQuery for InMemorySessions {
    async fn running_sessions(&self) -> Result<Vec<RunningSession>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("session store"));
        }
        Ok(self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}

/// Routine schedule list, returned in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRoutines {
    schedules: Mutex<Vec<RoutineSchedule>>,
    failing: AtomicBool,
}

impl InMemoryRoutines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, schedule: RoutineSchedule) {
        self.schedules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(schedule);
    }

    pub fn clear(&self) {
        self.schedules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoutineQuery for InMemoryRoutines {
    async fn routine_schedules(&self) -> Result<Vec<RoutineSchedule>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("routine store"));
        }
        Ok(self
            .schedules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::trigger::Repeat;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn install_replaces_same_key() {
        let platform = InMemoryPlatform::new();
        let t = ScheduledTrigger::one_shot("k", ChannelId::TimerAlerts, "a", "b", at(9, 0));
        platform.install(t.clone()).await.unwrap();
        platform
            .install(ScheduledTrigger {
                fire_at: at(10, 0),
                ..t
            })
            .await
            .unwrap();
        let pending = platform.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].fire_at, at(10, 0));
    }

    #[tokio::test]
    async fn channels_are_keyed_and_ordered_by_id() {
        let platform = InMemoryPlatform::new();
        for id in ChannelId::ALL.iter().rev() {
            platform.create_channel(&id.spec()).await.unwrap();
        }
        platform
            .create_channel(&ChannelId::TimerAlerts.spec())
            .await
            .unwrap();
        let ids: Vec<_> = platform.channels().iter().map(|c| c.id).collect();
        assert_eq!(ids, ChannelId::ALL.to_vec());
    }

    #[tokio::test]
    async fn install_failure_leaves_cancel_working() {
        let platform = InMemoryPlatform::new();
        let t = ScheduledTrigger::one_shot("k", ChannelId::TimerAlerts, "a", "b", at(9, 0));
        platform.install(t.clone()).await.unwrap();
        platform.set_install_failing(true);
        assert!(platform.install(t).await.is_err());
        platform.cancel("k").await.unwrap();
        assert!(platform.snapshot().is_empty());
    }

    #[tokio::test]
    async fn cancel_missing_reports_not_found() {
        let platform = InMemoryPlatform::new();
        let err = platform.cancel("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn deliver_due_consumes_one_shots_and_advances_recurring() {
        let platform = InMemoryPlatform::new();
        platform
            .install(ScheduledTrigger::one_shot(
                "once",
                ChannelId::TimerAlerts,
                "a",
                "b",
                at(9, 0),
            ))
            .await
            .unwrap();
        platform
            .install(
                ScheduledTrigger::one_shot("daily", ChannelId::RoutineReminders, "a", "b", at(8, 0))
                    .repeating(Repeat::Daily),
            )
            .await
            .unwrap();
        platform
            .install(ScheduledTrigger::one_shot(
                "later",
                ChannelId::TimerAlerts,
                "a",
                "b",
                at(11, 0),
            ))
            .await
            .unwrap();

        let events = platform.deliver_due(at(9, 30), DeliveryOrigin::Background);
        let keys: Vec<_> = events.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["daily", "once"]);
        assert!(platform.get("once").is_none());
        assert_eq!(
            platform.get("daily").unwrap().fire_at,
            NaiveDate::from_ymd_opt(2026, 1, 3)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
        assert!(platform.get("later").is_some());
    }

    #[tokio::test]
    async fn settings_fall_back_to_defaults() {
        let settings = InMemorySettings::new();
        assert!(settings.get_bool("x", true).await.unwrap());
        settings.set("x", "false");
        assert!(!settings.get_bool("x", true).await.unwrap());
        settings.set("n", "garbage");
        assert_eq!(settings.get_number("n", 5).await.unwrap(), 5);
        settings.set_failing(true);
        assert!(settings.get_bool("x", true).await.is_err());
    }
}
