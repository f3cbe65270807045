use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::channels::ChannelId;
use crate::error::ValidationError;

/// Native recurrence of an installed trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    /// Fires once and is gone.
    None,
    /// Every 24 hours from the first fire.
    Daily,
    /// Every 7 days from the first fire.
    Weekly,
}

impl Repeat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Repeat::None => "none",
            Repeat::Daily => "daily",
            Repeat::Weekly => "weekly",
        }
    }

    /// Gap between two fires, `None` for one-shots.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Repeat::None => None,
            Repeat::Daily => Some(Duration::days(1)),
            Repeat::Weekly => Some(Duration::days(7)),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Repeat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Repeat::None),
            "daily" => Ok(Repeat::Daily),
            "weekly" => Ok(Repeat::Weekly),
            other => Err(ValidationError::InvalidValue {
                field: "repeat".into(),
                message: format!("unknown repeat '{other}'"),
            }),
        }
    }
}

/// A notification waiting in the platform store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTrigger {
    pub key: String,
    pub channel: ChannelId,
    pub title: String,
    pub body: String,
    /// Next (for recurring triggers) or only fire time, local wall clock.
    pub fire_at: NaiveDateTime,
    pub repeat: Repeat,
}

impl ScheduledTrigger {
    pub fn one_shot(
        key: impl Into<String>,
        channel: ChannelId,
        title: impl Into<String>,
        body: impl Into<String>,
        fire_at: NaiveDateTime,
    ) -> Self {
        Self {
            key: key.into(),
            channel,
            title: title.into(),
            body: body.into(),
            fire_at,
            repeat: Repeat::None,
        }
    }

    pub fn repeating(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Where this trigger goes after firing at `fire_at`.
    ///
    /// `None` means it is consumed. Recurring triggers skip any periods
    /// already behind `now` so a late delivery never fires twice.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let period = self.repeat.period()?;
        let mut next = self.fire_at.checked_add_signed(period)?;
        while next <= now {
            next = next.checked_add_signed(period)?;
        }
        Some(next)
    }
}
