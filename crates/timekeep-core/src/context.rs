//! Scheduler context.
//!
//! The composition root for notification scheduling. One context owns the
//! ports, the clock, the [`TriggerScheduler`], the [`DeliveryListener`] and
//! the [`ChannelRegistry`]; hosts create it once and route app events
//! (timer start/stop, settings and routine edits, deliveries) through it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::DeliveryEvent;
use crate::notify::{
    ChannelRegistry, DeliveryListener, InactivityOutcome, RoutineOutcome, SchedulerConfig,
    TimerWarningOutcome, TriggerScheduler,
};
use crate::ports::{
    NotificationPlatform, RoutineQuery, RunningSession, SessionQuery, SettingsGateway,
};
use crate::time::Clock;

/// The four collaborators the scheduler is built from.
#[derive(Clone)]
pub struct Ports {
    pub settings: Arc<dyn SettingsGateway>,
    pub sessions: Arc<dyn SessionQuery>,
    pub routines: Arc<dyn RoutineQuery>,
    pub platform: Arc<dyn NotificationPlatform>,
}

impl Ports {
    /// Use one adapter for every port, as the SQLite store does.
    pub fn shared<T>(adapter: Arc<T>) -> Self
    where
        T: SettingsGateway + SessionQuery + RoutineQuery + NotificationPlatform + 'static,
    {
        Self {
            settings: adapter.clone(),
            sessions: adapter.clone(),
            routines: adapter.clone(),
            platform: adapter,
        }
    }
}

/// Timer warnings reinstalled for one running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWarnings {
    pub session_id: i64,
    pub outcome: TimerWarningOutcome,
}

/// Result of a full recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncReport {
    pub timer_warnings: Vec<SessionWarnings>,
    pub inactivity: InactivityOutcome,
    pub routines: RoutineOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitReport {
    pub channels_created: bool,
    pub listener_registered: bool,
    pub resync: ResyncReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
    /// `None` when the session has no expected length.
    pub timer_warnings: Option<TimerWarningOutcome>,
    pub inactivity: InactivityOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStopped {
    pub warnings_cancelled: bool,
    pub inactivity: InactivityOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsApplied {
    pub inactivity: InactivityOutcome,
    pub routines: RoutineOutcome,
}

pub struct SchedulerContext {
    ports: Ports,
    scheduler: Arc<TriggerScheduler>,
    listener: DeliveryListener,
    channels: ChannelRegistry,
}

impl SchedulerContext {
    pub fn new(ports: Ports, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        let scheduler = Arc::new(TriggerScheduler::new(
            ports.settings.clone(),
            ports.sessions.clone(),
            ports.routines.clone(),
            ports.platform.clone(),
            clock,
            config,
        ));
        Self {
            listener: DeliveryListener::new(scheduler.clone()),
            scheduler,
            channels: ChannelRegistry::new(),
            ports,
        }
    }

    pub fn scheduler(&self) -> &TriggerScheduler {
        &self.scheduler
    }

    pub fn listener(&self) -> &DeliveryListener {
        &self.listener
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Create the delivery channels if this context has not yet.
    pub async fn ensure_channels(&self) -> Result<bool> {
        self.channels
            .setup_channels(self.ports.platform.as_ref())
            .await
    }

    /// App start: channels, listener, then a full resync.
    ///
    /// # Errors
    /// Fails only when the channels cannot be created.
    pub async fn init(&self) -> Result<InitReport> {
        let channels_created = self.ensure_channels().await?;
        let listener_registered = self.listener.register();
        let resync = self.resync().await;
        info!(channels_created, listener_registered, "scheduler context initialised");
        Ok(InitReport {
            channels_created,
            listener_registered,
            resync,
        })
    }

    pub fn shutdown(&self) {
        self.listener.unregister();
    }

    /// Recompute every trigger class from the stores.
    ///
    /// Run after a restart or reboot, when the platform store may have
    /// lost or kept stale triggers.
    pub async fn resync(&self) -> ResyncReport {
        let sessions = match self.ports.sessions.running_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "could not read running sessions for resync");
                Vec::new()
            }
        };

        let mut timer_warnings = Vec::new();
        for session in &sessions {
            if let Some(outcome) = self.warn_for(session).await {
                timer_warnings.push(SessionWarnings {
                    session_id: session.session_id,
                    outcome,
                });
            }
        }

        let inactivity = self
            .scheduler
            .reconcile_inactivity(!sessions.is_empty(), None)
            .await;
        let routines = self.scheduler.rebuild_routine_reminders().await;
        ResyncReport {
            timer_warnings,
            inactivity,
            routines,
        }
    }

    /// A timer started. The session should already be in the session store.
    pub async fn session_started(&self, session: &RunningSession) -> SessionStarted {
        let timer_warnings = self.warn_for(session).await;
        let inactivity = self.scheduler.reconcile_inactivity(true, None).await;
        SessionStarted {
            timer_warnings,
            inactivity,
        }
    }

    /// A timer stopped. The session should already be gone from the store.
    pub async fn session_stopped(&self, session_id: i64) -> SessionStopped {
        let warnings_cancelled = self.scheduler.cancel_timer_warnings(session_id).await;
        let running = self.any_running().await;
        let inactivity = self.scheduler.reconcile_inactivity(running, None).await;
        SessionStopped {
            warnings_cancelled,
            inactivity,
        }
    }

    pub async fn settings_changed(&self) -> SettingsApplied {
        let running = self.any_running().await;
        SettingsApplied {
            inactivity: self.scheduler.reconcile_inactivity(running, None).await,
            routines: self.scheduler.rebuild_routine_reminders().await,
        }
    }

    pub async fn routines_changed(&self) -> RoutineOutcome {
        self.scheduler.rebuild_routine_reminders().await
    }

    /// Feed a batch of deliveries through the listener.
    ///
    /// Returns how many renewed the inactivity reminder.
    pub async fn dispatch(&self, events: Vec<DeliveryEvent>) -> usize {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            if tx.send(event).is_err() {
                break;
            }
        }
        drop(tx);
        self.listener.listen(rx).await
    }

    async fn warn_for(&self, session: &RunningSession) -> Option<TimerWarningOutcome> {
        let expected = session.expected_minutes?;
        Some(
            self.scheduler
                .schedule_timer_warnings(
                    session.session_id,
                    &session.activity_name,
                    expected,
                    session.start_time,
                )
                .await,
        )
    }

    // Only a hint; the scheduler re-checks the session store itself.
    async fn any_running(&self) -> bool {
        match self.ports.sessions.running_sessions().await {
            Ok(sessions) => !sessions.is_empty(),
            Err(e) => {
                warn!(error = %e, "could not read running sessions");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DeliveryOrigin;
    use crate::notify::memory::{
        InMemoryPlatform, InMemoryRoutines, InMemorySessions, InMemorySettings,
    };
    use crate::notify::{settings, InactivityHalt, RoutineHalt, INACTIVITY_KEY};
    use crate::time::FixedClock;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    struct Fixture {
        ctx: SchedulerContext,
        settings: Arc<InMemorySettings>,
        sessions: Arc<InMemorySessions>,
        platform: Arc<InMemoryPlatform>,
        clock: Arc<FixedClock>,
    }

    fn fixture() -> Fixture {
        let settings = Arc::new(InMemorySettings::new());
        let sessions = Arc::new(InMemorySessions::new());
        let platform = Arc::new(InMemoryPlatform::new());
        let clock = Arc::new(FixedClock::new(now()));
        let ports = Ports {
            settings: settings.clone(),
            sessions: sessions.clone(),
            routines: Arc::new(InMemoryRoutines::new()),
            platform: platform.clone(),
        };
        Fixture {
            ctx: SchedulerContext::new(ports, clock.clone(), SchedulerConfig::default()),
            settings,
            sessions,
            platform,
            clock,
        }
    }

    fn session(id: i64, expected: Option<i64>) -> RunningSession {
        RunningSession {
            session_id: id,
            activity_name: "Writing".into(),
            expected_minutes: expected,
            start_time: now(),
        }
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let f = fixture();
        let first = f.ctx.init().await.unwrap();
        assert!(first.channels_created);
        assert!(first.listener_registered);
        assert_eq!(
            first.resync.routines,
            RoutineOutcome::Cleared {
                reason: RoutineHalt::NoSchedules
            }
        );

        let second = f.ctx.init().await.unwrap();
        assert!(!second.channels_created);
        assert!(!second.listener_registered);
        assert_eq!(f.platform.channels().len(), 3);
    }

    #[tokio::test]
    async fn init_fails_when_channels_cannot_be_created() {
        let f = fixture();
        f.platform.set_failing(true);
        assert!(f.ctx.init().await.is_err());
        assert!(!f.ctx.channels().is_ready());
    }

    #[tokio::test]
    async fn start_then_stop_swaps_timer_alerts_for_inactivity() {
        let f = fixture();
        f.settings.set(settings::NO_TIMER_REMINDER_ENABLED, "true");
        f.ctx.init().await.unwrap();
        assert!(f.platform.get(INACTIVITY_KEY).is_some());

        let s = session(4, Some(25));
        f.sessions.start(s.clone());
        let started = f.ctx.session_started(&s).await;
        assert!(matches!(
            started.timer_warnings,
            Some(TimerWarningOutcome::Scheduled { .. })
        ));
        assert_eq!(
            started.inactivity,
            InactivityOutcome::Cancelled {
                reason: InactivityHalt::TimerRunning
            }
        );
        assert!(f.platform.get("timer-5min-4").is_some());
        assert!(f.platform.get(INACTIVITY_KEY).is_none());

        f.sessions.stop(4);
        let stopped = f.ctx.session_stopped(4).await;
        assert!(stopped.warnings_cancelled);
        assert!(matches!(
            stopped.inactivity,
            InactivityOutcome::Scheduled { .. }
        ));
        assert!(f.platform.get("timer-5min-4").is_none());
        assert!(f.platform.get("timer-timeup-4").is_none());
        assert!(f.platform.get(INACTIVITY_KEY).is_some());
    }

    #[tokio::test]
    async fn session_without_expected_length_gets_no_alerts() {
        let f = fixture();
        let s = session(1, None);
        f.sessions.start(s.clone());
        assert_eq!(f.ctx.session_started(&s).await.timer_warnings, None);
        assert!(f.platform.snapshot().is_empty());
    }

    #[tokio::test]
    async fn resync_reinstalls_lost_timer_alerts() {
        let f = fixture();
        f.sessions.start(session(9, Some(30)));
        f.clock.advance(Duration::minutes(10));

        let report = f.ctx.resync().await;
        assert_eq!(report.timer_warnings.len(), 1);
        assert_eq!(
            report.inactivity,
            InactivityOutcome::Cancelled {
                reason: InactivityHalt::TimerRunning
            }
        );
        let keys: Vec<String> = f.platform.snapshot().into_iter().map(|t| t.key).collect();
        assert_eq!(keys, vec!["timer-5min-9", "timer-timeup-9"]);
    }

    #[tokio::test]
    async fn settings_changed_applies_disable() {
        let f = fixture();
        f.settings.set(settings::NO_TIMER_REMINDER_ENABLED, "true");
        f.ctx.settings_changed().await;
        assert!(f.platform.get(INACTIVITY_KEY).is_some());

        f.settings.set(settings::NOTIFICATIONS_ENABLED, "false");
        let applied = f.ctx.settings_changed().await;
        assert_eq!(
            applied.inactivity,
            InactivityOutcome::Cancelled {
                reason: InactivityHalt::Disabled
            }
        );
        assert_eq!(
            applied.routines,
            RoutineOutcome::Cleared {
                reason: RoutineHalt::Disabled
            }
        );
        assert!(f.platform.snapshot().is_empty());
    }

    #[tokio::test]
    async fn dispatch_renews_only_after_init() {
        let f = fixture();
        f.settings.set(settings::NO_TIMER_REMINDER_ENABLED, "true");
        let event = || DeliveryEvent::new(INACTIVITY_KEY, DeliveryOrigin::Background, now());
        assert_eq!(f.ctx.dispatch(vec![event()]).await, 0);

        f.ctx.init().await.unwrap();
        assert_eq!(f.ctx.dispatch(vec![event(), event()]).await, 2);

        f.ctx.shutdown();
        assert_eq!(f.ctx.dispatch(vec![event()]).await, 0);
    }
}
