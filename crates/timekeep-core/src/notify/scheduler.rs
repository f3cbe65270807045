//! Trigger scheduler.
//!
//! Turns settings, running sessions and routine schedules into the set of
//! pending platform triggers. Every entry point is a full recomputation for
//! its trigger class: read everything first, then cancel, then install.
//! Nothing is diffed and nothing is locked; running the same call twice
//! ends in the same state as running it once.
//!
//! ## Failure policy
//!
//! Entry points never return errors. A failed read or platform call is
//! logged and reported as a `Failed` outcome. Reads happen before any
//! cancellation, so a failed read leaves the previous triggers untouched.

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::channels::ChannelId;
use super::keys::{is_routine_key, TriggerKey, INACTIVITY_KEY};
use super::routine::collapse_schedules;
use super::settings;
use super::timer_warning::TimerWarningSet;
use super::trigger::ScheduledTrigger;
use crate::error::Result;
use crate::ports::{NotificationPlatform, RoutineQuery, SessionQuery, SettingsGateway};
use crate::time::Clock;

/// Tunables that are not user settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes before the expected end at which the timer warning fires.
    pub timer_warning_lead_minutes: i64,
    /// Inactivity interval used when the setting is unset.
    pub default_inactivity_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timer_warning_lead_minutes: 5,
            default_inactivity_minutes: settings::DEFAULT_NO_TIMER_REMINDER_MINUTES,
        }
    }
}

/// Last known state of the inactivity reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum InactivityState {
    Idle,
    Pending {
        fire_at: NaiveDateTime,
        interval_minutes: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TimerWarningOutcome {
    /// At least one alert is pending. `None` marks an instant already past.
    Scheduled {
        warning_at: Option<NaiveDateTime>,
        due_at: Option<NaiveDateTime>,
    },
    /// Both instants are already behind us.
    NothingAhead,
    Failed,
}

/// Why no inactivity reminder is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactivityHalt {
    TimerRunning,
    Disabled,
    InvalidInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InactivityOutcome {
    Scheduled {
        fire_at: NaiveDateTime,
        interval_minutes: i64,
    },
    Cancelled {
        reason: InactivityHalt,
    },
    Failed,
}

/// Why no routine reminders are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineHalt {
    Disabled,
    NoSchedules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoutineOutcome {
    Installed { count: usize },
    Cleared { reason: RoutineHalt },
    Failed,
}

/// Owns every scheduled notification.
pub struct TriggerScheduler {
    settings: Arc<dyn SettingsGateway>,
    sessions: Arc<dyn SessionQuery>,
    routines: Arc<dyn RoutineQuery>,
    platform: Arc<dyn NotificationPlatform>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    inactivity: Mutex<InactivityState>,
}

impl TriggerScheduler {
    pub fn new(
        settings: Arc<dyn SettingsGateway>,
        sessions: Arc<dyn SessionQuery>,
        routines: Arc<dyn RoutineQuery>,
        platform: Arc<dyn NotificationPlatform>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            settings,
            sessions,
            routines,
            platform,
            clock,
            config,
            inactivity: Mutex::new(InactivityState::Idle),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn inactivity_state(&self) -> InactivityState {
        *self.inactivity.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_inactivity_state(&self, state: InactivityState) {
        *self.inactivity.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    // ── Timer warnings ───────────────────────────────────────────────

    /// Install the warning and time's-up alerts for a session.
    ///
    /// Only instants strictly after now are installed; past ones are
    /// skipped, never backfilled.
    pub async fn schedule_timer_warnings(
        &self,
        session_id: i64,
        activity_name: &str,
        expected_minutes: i64,
        start_time: NaiveDateTime,
    ) -> TimerWarningOutcome {
        let set = TimerWarningSet::new(
            session_id,
            activity_name,
            expected_minutes,
            start_time,
            self.config.timer_warning_lead_minutes,
        );
        match self.try_schedule_timer_warnings(&set).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(session_id, error = %e, "failed to schedule timer warnings");
                TimerWarningOutcome::Failed
            }
        }
    }

    async fn try_schedule_timer_warnings(
        &self,
        set: &TimerWarningSet,
    ) -> Result<TimerWarningOutcome> {
        let now = self.clock.now();
        let mut warning_at = None;
        let mut due_at = None;

        for trigger in set.future_triggers(now) {
            let fire_at = trigger.fire_at;
            let is_warning = trigger.key == set.warning_key().to_string();
            self.install(trigger).await?;
            if is_warning {
                warning_at = Some(fire_at);
            } else {
                due_at = Some(fire_at);
            }
        }

        if warning_at.is_none() && due_at.is_none() {
            debug!(session_id = set.session_id, "no timer alerts ahead");
            return Ok(TimerWarningOutcome::NothingAhead);
        }
        info!(
            session_id = set.session_id,
            ?warning_at,
            ?due_at,
            "timer alerts scheduled"
        );
        Ok(TimerWarningOutcome::Scheduled { warning_at, due_at })
    }

    /// Cancel both alerts of a session, fired or not.
    ///
    /// Returns `false` only when the platform failed; missing triggers are
    /// not an error.
    pub async fn cancel_timer_warnings(&self, session_id: i64) -> bool {
        let keys = [
            TriggerKey::TimerWarning(session_id),
            TriggerKey::TimerDue(session_id),
        ];
        let mut ok = true;
        for key in keys {
            if let Err(e) = self.cancel_quietly(&key.to_string()).await {
                error!(session_id, key = %key, error = %e, "failed to cancel timer alert");
                ok = false;
            }
        }
        ok
    }

    // ── Inactivity reminder ──────────────────────────────────────────

    /// Recompute the single inactivity reminder.
    ///
    /// `has_running_timers` is the caller's hint; the session store is
    /// consulted again before anything is installed. A positive
    /// `override_interval_minutes` wins over the stored interval.
    pub async fn reconcile_inactivity(
        &self,
        has_running_timers: bool,
        override_interval_minutes: Option<i64>,
    ) -> InactivityOutcome {
        match self
            .try_reconcile_inactivity(has_running_timers, override_interval_minutes)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "failed to reconcile inactivity reminder");
                InactivityOutcome::Failed
            }
        }
    }

    async fn try_reconcile_inactivity(
        &self,
        has_running_timers: bool,
        override_interval_minutes: Option<i64>,
    ) -> Result<InactivityOutcome> {
        if has_running_timers {
            return self.halt_inactivity(InactivityHalt::TimerRunning).await;
        }

        let enabled = self
            .settings
            .get_bool(
                settings::NOTIFICATIONS_ENABLED,
                settings::DEFAULT_NOTIFICATIONS_ENABLED,
            )
            .await?
            && self
                .settings
                .get_bool(
                    settings::NO_TIMER_REMINDER_ENABLED,
                    settings::DEFAULT_NO_TIMER_REMINDER_ENABLED,
                )
                .await?;
        if !enabled {
            return self.halt_inactivity(InactivityHalt::Disabled).await;
        }

        if !self.sessions.running_sessions().await?.is_empty() {
            debug!("session store reports a running timer");
            return self.halt_inactivity(InactivityHalt::TimerRunning).await;
        }

        let minutes = match override_interval_minutes.filter(|m| *m > 0) {
            Some(m) => m,
            None => {
                self.settings
                    .get_number(
                        settings::NO_TIMER_REMINDER_MINUTES,
                        self.config.default_inactivity_minutes,
                    )
                    .await?
            }
        };
        if minutes <= 0 {
            return self.halt_inactivity(InactivityHalt::InvalidInterval).await;
        }

        let Some(fire_at) = Duration::try_minutes(minutes)
            .and_then(|interval| self.clock.now().checked_add_signed(interval))
        else {
            warn!(interval_minutes = minutes, "inactivity interval out of range");
            return self.halt_inactivity(InactivityHalt::InvalidInterval).await;
        };
        self.cancel_quietly(INACTIVITY_KEY).await?;
        // Nothing is pending from here until the install lands.
        self.set_inactivity_state(InactivityState::Idle);
        self.install(ScheduledTrigger::one_shot(
            INACTIVITY_KEY,
            ChannelId::InactivityReminders,
            "No timer running",
            format!("You haven't tracked any time in the last {minutes} minutes."),
            fire_at,
        ))
        .await?;
        self.set_inactivity_state(InactivityState::Pending {
            fire_at,
            interval_minutes: minutes,
        });
        info!(%fire_at, interval_minutes = minutes, "inactivity reminder scheduled");
        Ok(InactivityOutcome::Scheduled {
            fire_at,
            interval_minutes: minutes,
        })
    }

    async fn halt_inactivity(&self, reason: InactivityHalt) -> Result<InactivityOutcome> {
        self.cancel_quietly(INACTIVITY_KEY).await?;
        self.set_inactivity_state(InactivityState::Idle);
        debug!(?reason, "inactivity reminder cleared");
        Ok(InactivityOutcome::Cancelled { reason })
    }

    /// Cancel the pending inactivity reminder, if any.
    pub async fn stop_inactivity_reminder(&self) -> bool {
        match self.cancel_quietly(INACTIVITY_KEY).await {
            Ok(()) => {
                self.set_inactivity_state(InactivityState::Idle);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to stop inactivity reminder");
                false
            }
        }
    }

    // ── Routine reminders ────────────────────────────────────────────

    /// Tear down and rebuild every routine-start trigger.
    ///
    /// Call after any routine or routine-item mutation and after the
    /// relevant settings change.
    pub async fn rebuild_routine_reminders(&self) -> RoutineOutcome {
        match self.try_rebuild_routine_reminders().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "failed to rebuild routine reminders");
                RoutineOutcome::Failed
            }
        }
    }

    async fn try_rebuild_routine_reminders(&self) -> Result<RoutineOutcome> {
        let enabled = self
            .settings
            .get_bool(
                settings::NOTIFICATIONS_ENABLED,
                settings::DEFAULT_NOTIFICATIONS_ENABLED,
            )
            .await?
            && self
                .settings
                .get_bool(
                    settings::REMINDER_ROUTINE_START,
                    settings::DEFAULT_REMINDER_ROUTINE_START,
                )
                .await?;
        if !enabled {
            let removed = self.cancel_routine_triggers().await?;
            debug!(removed, "routine reminders disabled");
            return Ok(RoutineOutcome::Cleared {
                reason: RoutineHalt::Disabled,
            });
        }

        let schedules = self.routines.routine_schedules().await?;
        let collapsed = collapse_schedules(&schedules);
        if collapsed.is_empty() {
            let removed = self.cancel_routine_triggers().await?;
            debug!(removed, "no routine schedules");
            return Ok(RoutineOutcome::Cleared {
                reason: RoutineHalt::NoSchedules,
            });
        }

        let now = self.clock.now();
        self.cancel_routine_triggers().await?;
        for routine in &collapsed {
            self.install(routine.trigger(now)).await?;
        }
        info!(count = collapsed.len(), "routine reminders rebuilt");
        Ok(RoutineOutcome::Installed {
            count: collapsed.len(),
        })
    }

    async fn cancel_routine_triggers(&self) -> Result<usize> {
        let pending = self.platform.pending().await?;
        let mut removed = 0;
        for trigger in pending.iter().filter(|t| is_routine_key(&t.key)) {
            self.cancel_quietly(&trigger.key).await?;
            removed += 1;
        }
        Ok(removed)
    }

    // ── Platform helpers ─────────────────────────────────────────────

    async fn install(&self, trigger: ScheduledTrigger) -> Result<()> {
        debug!(key = %trigger.key, fire_at = %trigger.fire_at, repeat = %trigger.repeat, "installing trigger");
        self.platform.install(trigger).await
    }

    async fn cancel_quietly(&self, key: &str) -> Result<()> {
        match self.platform.cancel(key).await {
            Ok(()) => {
                debug!(key, "cancelled trigger");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
