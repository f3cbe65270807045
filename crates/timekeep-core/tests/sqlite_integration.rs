//! Integration tests for the SQLite adapter.
//!
//! The same scheduling flows as the in-memory tests, but every port is the
//! on-disk database the CLI uses.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use timekeep_core::notify::{
    settings, InactivityOutcome, RoutineHalt, RoutineOutcome, INACTIVITY_KEY,
};
use timekeep_core::storage::NewRoutine;
use timekeep_core::time::FixedClock;
use timekeep_core::{
    Clock, Database, DayFilter, DeliveryOrigin, Ports, RoutineType, RunningSession,
    SchedulerConfig, SchedulerContext,
};

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn context(db: Arc<Database>, clock: Arc<FixedClock>) -> SchedulerContext {
    SchedulerContext::new(Ports::shared(db), clock, SchedulerConfig::default())
}

fn pending_keys(db: &Database) -> Vec<String> {
    db.triggers().unwrap().into_iter().map(|t| t.key).collect()
}

#[tokio::test]
async fn test_triggers_survive_reopen_and_resync() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timekeep.db");
    let clock = Arc::new(FixedClock::new(at(2, 10, 0)));

    {
        let db = Arc::new(Database::open(&path).unwrap());
        db.set_setting(settings::NO_TIMER_REMINDER_ENABLED, "true")
            .unwrap();
        db.add_routine(&NewRoutine {
            name: "Wind down".into(),
            routine_type: RoutineType::Weekly,
            scheduled_time: Some("21:00".into()),
            day_filter: Some(DayFilter::Weekdays),
            items: vec!["Read".into()],
        })
        .unwrap();

        let ctx = context(db.clone(), clock.clone());
        let report = ctx.init().await.unwrap();
        assert_eq!(
            report.resync.routines,
            RoutineOutcome::Installed { count: 5 }
        );
        assert!(matches!(
            report.resync.inactivity,
            InactivityOutcome::Scheduled { .. }
        ));
    }

    // A fresh process sees the same store and converges to the same set.
    let db = Arc::new(Database::open(&path).unwrap());
    assert_eq!(db.channels().unwrap().len(), 3);
    let before = pending_keys(&db);
    assert_eq!(before.len(), 6);

    let ctx = context(db.clone(), clock);
    ctx.init().await.unwrap();
    let mut after = pending_keys(&db);
    let mut before = before;
    before.sort();
    after.sort();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_timer_lifecycle_on_sqlite() {
    let db = Arc::new(Database::open_memory().unwrap());
    db.set_setting(settings::NO_TIMER_REMINDER_ENABLED, "1")
        .unwrap();
    db.set_setting(settings::NO_TIMER_REMINDER_MINUTES, "10")
        .unwrap();
    let clock = Arc::new(FixedClock::new(at(2, 10, 0)));
    let ctx = context(db.clone(), clock.clone());
    ctx.init().await.unwrap();
    assert_eq!(pending_keys(&db), vec![INACTIVITY_KEY]);

    let session = RunningSession {
        session_id: 12,
        activity_name: "Deep work".into(),
        expected_minutes: Some(50),
        start_time: clock.now(),
    };
    db.start_session(&session).unwrap();
    ctx.session_started(&session).await;
    assert_eq!(pending_keys(&db), vec!["timer-5min-12", "timer-timeup-12"]);

    clock.advance(Duration::minutes(45));
    let events = db.deliver_due(clock.now(), DeliveryOrigin::Background).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(ctx.dispatch(events).await, 0);

    db.stop_session(12).unwrap();
    let stopped = ctx.session_stopped(12).await;
    assert!(stopped.warnings_cancelled);
    assert_eq!(
        stopped.inactivity,
        InactivityOutcome::Scheduled {
            fire_at: at(2, 10, 55),
            interval_minutes: 10,
        }
    );
    assert_eq!(pending_keys(&db), vec![INACTIVITY_KEY]);

    clock.advance(Duration::minutes(10));
    let events = db.deliver_due(clock.now(), DeliveryOrigin::Foreground).unwrap();
    assert_eq!(ctx.dispatch(events).await, 1);
    assert_eq!(db.triggers().unwrap()[0].fire_at, at(2, 11, 5));
}

#[tokio::test]
async fn test_routine_edits_rebuild_on_sqlite() {
    let db = Arc::new(Database::open_memory().unwrap());
    let clock = Arc::new(FixedClock::new(at(2, 10, 0)));
    let ctx = context(db.clone(), clock);
    ctx.init().await.unwrap();

    let id = db
        .add_routine(&NewRoutine {
            name: "Stretch".into(),
            routine_type: RoutineType::Daily,
            scheduled_time: Some("7:45".into()),
            day_filter: None,
            items: vec!["Hamstrings".into()],
        })
        .unwrap();
    assert_eq!(
        ctx.routines_changed().await,
        RoutineOutcome::Installed { count: 1 }
    );
    let trigger = &db.triggers().unwrap()[0];
    assert_eq!(trigger.key, format!("routine-start-{id}-daily"));
    assert_eq!(trigger.fire_at, at(3, 7, 45));

    db.set_routine_active(id, false).unwrap();
    ctx.routines_changed().await;
    assert!(db.triggers().unwrap().is_empty());
}

#[tokio::test]
async fn test_routine_items_gate_reminders_on_sqlite() {
    let db = Arc::new(Database::open_memory().unwrap());
    let clock = Arc::new(FixedClock::new(at(2, 10, 0)));
    let ctx = context(db.clone(), clock);
    ctx.init().await.unwrap();

    let id = db
        .add_routine(&NewRoutine {
            name: "Evening".into(),
            routine_type: RoutineType::Weekly,
            scheduled_time: Some("21:00".into()),
            day_filter: Some(DayFilter::Day(5)),
            items: Vec::new(),
        })
        .unwrap();
    assert_eq!(
        ctx.routines_changed().await,
        RoutineOutcome::Cleared {
            reason: RoutineHalt::NoSchedules
        }
    );

    let item = db.add_routine_item(id, "Read").unwrap().unwrap();
    assert_eq!(
        ctx.routines_changed().await,
        RoutineOutcome::Installed { count: 1 }
    );
    assert_eq!(pending_keys(&db), vec![format!("routine-start-{id}-5")]);

    assert!(db.remove_routine_item(item).unwrap());
    ctx.routines_changed().await;
    assert!(pending_keys(&db).is_empty());
}
