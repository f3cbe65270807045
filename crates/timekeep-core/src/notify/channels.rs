//! Delivery channels.
//!
//! The platform groups notifications into channels with an importance
//! level. Three exist: timer alerts, inactivity nudges and routine starts.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ValidationError};
use crate::ports::NotificationPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Default,
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Default => "default",
            Importance::High => "high",
        }
    }
}

impl FromStr for Importance {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Importance::Low),
            "default" => Ok(Importance::Default),
            "high" => Ok(Importance::High),
            other => Err(ValidationError::InvalidValue {
                field: "importance".into(),
                message: format!("unknown importance '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelId {
    TimerAlerts,
    InactivityReminders,
    RoutineReminders,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [
        ChannelId::TimerAlerts,
        ChannelId::InactivityReminders,
        ChannelId::RoutineReminders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::TimerAlerts => "timer-alerts",
            ChannelId::InactivityReminders => "inactivity-reminders",
            ChannelId::RoutineReminders => "routine-reminders",
        }
    }

    pub fn spec(self) -> ChannelSpec {
        match self {
            ChannelId::TimerAlerts => ChannelSpec {
                id: self,
                name: "Timer alerts".into(),
                description: "Warnings before and when a timer reaches its planned length".into(),
                importance: Importance::High,
            },
            ChannelId::InactivityReminders => ChannelSpec {
                id: self,
                name: "Inactivity reminders".into(),
                description: "Nudges while no timer is running".into(),
                importance: Importance::Default,
            },
            ChannelId::RoutineReminders => ChannelSpec {
                id: self,
                name: "Routine reminders".into(),
                description: "Reminders when a routine is due to start".into(),
                importance: Importance::High,
            },
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelId {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ChannelId::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "channel".into(),
                message: format!("unknown channel '{s}'"),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: ChannelId,
    pub name: String,
    pub description: String,
    pub importance: Importance,
}

/// One-time channel setup.
///
/// Runs against the platform once per registry; later calls return early.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    ready: AtomicBool,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Create all three channels. Returns `false` when they already were.
    pub async fn setup_channels(&self, platform: &dyn NotificationPlatform) -> Result<bool> {
        if self.is_ready() {
            debug!("notification channels already set up");
            return Ok(false);
        }
        for id in ChannelId::ALL {
            if let Err(e) = platform.create_channel(&id.spec()).await {
                warn!(channel = %id, error = %e, "failed to create notification channel");
                return Err(e);
            }
        }
        self.ready.store(true, Ordering::Release);
        debug!("notification channels ready");
        Ok(true)
    }
}
