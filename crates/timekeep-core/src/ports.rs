//! Read-only data sources and the platform trigger store.
//!
//! The scheduler never talks to a database or an OS notification API
//! directly. Each collaborator is injected as one of these traits, so the
//! core algorithm runs unchanged against SQLite, an in-memory fake, or a
//! mobile bridge.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notify::{ChannelSpec, ScheduledTrigger};
use crate::time::DayFilter;

/// A timer that is currently running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningSession {
    pub session_id: i64,
    pub activity_name: String,
    /// Planned length of the session, if the user set one.
    #[serde(default)]
    pub expected_minutes: Option<i64>,
    pub start_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineType {
    Daily,
    Weekly,
}

impl RoutineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineType::Daily => "daily",
            RoutineType::Weekly => "weekly",
        }
    }
}

/// One candidate start time for an active routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineSchedule {
    pub routine_id: i64,
    pub routine_name: String,
    pub routine_type: RoutineType,
    /// `"HH:MM"`; `None` or garbage means the routine has no start time.
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub day_filter: Option<DayFilter>,
}

/// User preferences, stored as strings.
#[async_trait]
pub trait SettingsGateway: Send + Sync {
    /// Boolean setting, or `default` when unset.
    async fn get_bool(&self, key: &str, default: bool) -> Result<bool>;

    /// Numeric setting, or `default` when unset.
    async fn get_number(&self, key: &str, default: i64) -> Result<i64>;
}

/// The timer-session store, reduced to the one question the scheduler asks.
#[async_trait]
pub trait SessionQuery: Send + Sync {
    /// Sessions currently running. Empty means no timer is active.
    async fn running_sessions(&self) -> Result<Vec<RunningSession>>;
}

/// Active routines that have a start time and at least one item.
#[async_trait]
pub trait RoutineQuery: Send + Sync {
    async fn routine_schedules(&self) -> Result<Vec<RoutineSchedule>>;
}

/// The platform's own store of future notifications, addressed by key.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Create or update a delivery channel. Safe to repeat.
    async fn create_channel(&self, channel: &ChannelSpec) -> Result<()>;

    /// Install a trigger, replacing any pending trigger with the same key.
    async fn install(&self, trigger: ScheduledTrigger) -> Result<()>;

    /// Cancel a pending trigger.
    ///
    /// Returns `NotifyError::TriggerNotFound` when nothing is pending under
    /// `key`.
    async fn cancel(&self, key: &str) -> Result<()>;

    /// Every pending trigger, in no particular order.
    async fn pending(&self) -> Result<Vec<ScheduledTrigger>>;
}
