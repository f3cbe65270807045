//! SQLite-backed adapters.
//!
//! One database file backs every port the scheduler needs:
//! - `settings`: string-encoded user preferences
//! - `running_sessions`: timers currently running
//! - `routines` / `routine_items`: routine definitions
//! - `channels` / `triggers`: a local stand-in for the platform trigger store
//!
//! The trigger table lets the CLI emulate delivery with [`Database::deliver_due`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DatabaseError, NotifyError, Result};
use crate::events::{DeliveryEvent, DeliveryOrigin};
use crate::notify::settings::{parse_bool, parse_number};
use crate::notify::{ChannelId, ChannelSpec, Importance, Repeat, ScheduledTrigger};
use crate::ports::{
    NotificationPlatform, RoutineQuery, RoutineSchedule, RoutineType, RunningSession,
    SessionQuery, SettingsGateway,
};
use crate::time::DayFilter;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(table: &str, raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).map_err(|e| DatabaseError::CorruptRow {
        table: table.into(),
        message: format!("bad timestamp '{raw}': {e}"),
    })
}

fn corrupt(table: &str, message: impl ToString) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: table.into(),
        message: message.to_string(),
    }
}

/// Input for [`Database::add_routine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoutine {
    pub name: String,
    pub routine_type: RoutineType,
    pub scheduled_time: Option<String>,
    pub day_filter: Option<DayFilter>,
    pub items: Vec<String>,
}

/// A stored routine, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineRecord {
    pub id: i64,
    pub name: String,
    pub routine_type: RoutineType,
    pub scheduled_time: Option<String>,
    pub day_filter: Option<DayFilter>,
    pub active: bool,
    pub item_count: i64,
}

/// SQLite database shared by all adapters.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Locked)
    }

    fn migrate(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS settings (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS running_sessions (
                    session_id       INTEGER PRIMARY KEY,
                    activity_name    TEXT NOT NULL,
                    expected_minutes INTEGER,
                    start_time       TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS routines (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    name           TEXT NOT NULL,
                    routine_type   TEXT NOT NULL,
                    scheduled_time TEXT,
                    day_filter     TEXT,
                    active         INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS routine_items (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    routine_id INTEGER NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
                    name       TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS channels (
                    id          TEXT PRIMARY KEY,
                    name        TEXT NOT NULL,
                    description TEXT NOT NULL,
                    importance  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS triggers (
                    key     TEXT PRIMARY KEY,
                    channel TEXT NOT NULL,
                    title   TEXT NOT NULL,
                    body    TEXT NOT NULL,
                    fire_at TEXT NOT NULL,
                    repeat  TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_routine_items_routine ON routine_items(routine_id);
                CREATE INDEX IF NOT EXISTS idx_triggers_fire_at ON triggers(fire_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn settings(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // ── Running sessions ─────────────────────────────────────────────

    pub fn start_session(&self, session: &RunningSession) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO running_sessions
                (session_id, activity_name, expected_minutes, start_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.session_id,
                session.activity_name,
                session.expected_minutes,
                format_ts(session.start_time),
            ],
        )?;
        Ok(())
    }

    /// Remove a running session. Returns `false` if it was not running.
    pub fn stop_session(&self, session_id: i64) -> Result<bool> {
        let n = self.conn()?.execute(
            "DELETE FROM running_sessions WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(n > 0)
    }

    pub fn sessions(&self) -> Result<Vec<RunningSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, activity_name, expected_minutes, start_time
             FROM running_sessions ORDER BY session_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (session_id, activity_name, expected_minutes, start) = row?;
            out.push(RunningSession {
                session_id,
                activity_name,
                expected_minutes,
                start_time: parse_ts("running_sessions", &start)?,
            });
        }
        Ok(out)
    }

    // ── Routines ─────────────────────────────────────────────────────

    pub fn add_routine(&self, routine: &NewRoutine) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO routines (name, routine_type, scheduled_time, day_filter)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                routine.name,
                routine.routine_type.as_str(),
                routine.scheduled_time,
                routine.day_filter.map(|f| f.to_string()),
            ],
        )?;
        let id = tx.last_insert_rowid();
        for item in &routine.items {
            tx.execute(
                "INSERT INTO routine_items (routine_id, name) VALUES (?1, ?2)",
                params![id, item],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Attach an item to a routine. Returns `None` if the routine does not exist.
    pub fn add_routine_item(&self, routine_id: i64, name: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let n = conn.execute(
            "INSERT INTO routine_items (routine_id, name)
             SELECT ?1, ?2 WHERE EXISTS (SELECT 1 FROM routines WHERE id = ?1)",
            params![routine_id, name],
        )?;
        Ok((n > 0).then(|| conn.last_insert_rowid()))
    }

    pub fn remove_routine_item(&self, item_id: i64) -> Result<bool> {
        let n = self
            .conn()?
            .execute("DELETE FROM routine_items WHERE id = ?1", params![item_id])?;
        Ok(n > 0)
    }

    /// Delete a routine and its items. Returns `false` if it did not exist.
    pub fn remove_routine(&self, routine_id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM routine_items WHERE routine_id = ?1",
            params![routine_id],
        )?;
        let n = tx.execute("DELETE FROM routines WHERE id = ?1", params![routine_id])?;
        tx.commit()?;
        Ok(n > 0)
    }

    pub fn set_routine_active(&self, routine_id: i64, active: bool) -> Result<bool> {
        let n = self.conn()?.execute(
            "UPDATE routines SET active = ?1 WHERE id = ?2",
            params![active, routine_id],
        )?;
        Ok(n > 0)
    }

    pub fn routines(&self) -> Result<Vec<RoutineRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.name, r.routine_type, r.scheduled_time, r.day_filter, r.active,
                    (SELECT COUNT(*) FROM routine_items i WHERE i.routine_id = r.id)
             FROM routines r ORDER BY r.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, name, routine_type, scheduled_time, day_filter, active, item_count) = row?;
            out.push(RoutineRecord {
                id,
                name,
                routine_type: parse_routine_type(&routine_type)?,
                scheduled_time,
                day_filter: parse_day_filter(day_filter.as_deref())?,
                active,
                item_count,
            });
        }
        Ok(out)
    }

    // ── Trigger store ────────────────────────────────────────────────

    pub fn channels(&self) -> Result<Vec<ChannelSpec>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, description, importance FROM channels ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, name, description, importance) = row?;
            out.push(ChannelSpec {
                id: id.parse::<ChannelId>().map_err(|e| corrupt("channels", e))?,
                name,
                description,
                importance: importance
                    .parse::<Importance>()
                    .map_err(|e| corrupt("channels", e))?,
            });
        }
        Ok(out)
    }

    /// Pending triggers ordered by fire time.
    pub fn triggers(&self) -> Result<Vec<ScheduledTrigger>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, channel, title, body, fire_at, repeat FROM triggers ORDER BY fire_at, key",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (key, channel, title, body, fire_at, repeat) = row?;
            out.push(ScheduledTrigger {
                key,
                channel: channel
                    .parse::<ChannelId>()
                    .map_err(|e| corrupt("triggers", e))?,
                title,
                body,
                fire_at: parse_ts("triggers", &fire_at)?,
                repeat: repeat.parse::<Repeat>().map_err(|e| corrupt("triggers", e))?,
            });
        }
        Ok(out)
    }

    /// Fire every trigger due at `now`.
    ///
    /// One-shots are deleted; recurring triggers move to their next period.
    pub fn deliver_due(
        &self,
        now: NaiveDateTime,
        origin: DeliveryOrigin,
    ) -> Result<Vec<DeliveryEvent>> {
        let due: Vec<ScheduledTrigger> = self
            .triggers()?
            .into_iter()
            .filter(|t| t.fire_at <= now)
            .collect();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut events = Vec::with_capacity(due.len());
        for trigger in due {
            match trigger.next_fire_after(now) {
                Some(next) => {
                    tx.execute(
                        "UPDATE triggers SET fire_at = ?1 WHERE key = ?2",
                        params![format_ts(next), trigger.key],
                    )?;
                }
                None => {
                    tx.execute("DELETE FROM triggers WHERE key = ?1", params![trigger.key])?;
                }
            }
            events.push(DeliveryEvent::new(trigger.key, origin, now));
        }
        tx.commit()?;
        Ok(events)
    }
}

fn parse_routine_type(raw: &str) -> Result<RoutineType, DatabaseError> {
    match raw {
        "daily" => Ok(RoutineType::Daily),
        "weekly" => Ok(RoutineType::Weekly),
        other => Err(corrupt("routines", format!("unknown routine type '{other}'"))),
    }
}

fn parse_day_filter(raw: Option<&str>) -> Result<Option<DayFilter>, DatabaseError> {
    raw.map(|r| r.parse::<DayFilter>().map_err(|e| corrupt("routines", e)))
        .transpose()
}

#[async_trait]
impl SettingsGateway for Database {
    async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.setting(key)? {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(key, value = %raw, "unparseable boolean setting, using default");
                default
            }),
            None => default,
        })
    }

    async fn get_number(&self, key: &str, default: i64) -> Result<i64> {
        Ok(match self.setting(key)? {
            Some(raw) => parse_number(&raw).unwrap_or_else(|| {
                warn!(key, value = %raw, "unparseable numeric setting, using default");
                default
            }),
            None => default,
        })
    }
}

#[async_trait]
impl SessionQuery for Database {
    async fn running_sessions(&self) -> Result<Vec<RunningSession>> {
        self.sessions()
    }
}

#[async_trait]
impl RoutineQuery for Database {
    async fn routine_schedules(&self) -> Result<Vec<RoutineSchedule>> {
        Ok(self
            .routines()?
            .into_iter()
            .filter(|r| r.active && r.scheduled_time.is_some() && r.item_count > 0)
            .map(|r| RoutineSchedule {
                routine_id: r.id,
                routine_name: r.name,
                routine_type: r.routine_type,
                scheduled_time: r.scheduled_time,
                day_filter: r.day_filter,
            })
            .collect())
    }
}

#[async_trait]
impl NotificationPlatform for Database {
    async fn create_channel(&self, channel: &ChannelSpec) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO channels (id, name, description, importance)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                channel.id.as_str(),
                channel.name,
                channel.description,
                channel.importance.as_str(),
            ],
        )?;
        Ok(())
    }

    async fn install(&self, trigger: ScheduledTrigger) -> Result<()> {
        let conn = self.conn()?;
        let known = conn
            .query_row(
                "SELECT 1 FROM channels WHERE id = ?1",
                params![trigger.channel.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        if known.is_none() {
            return Err(NotifyError::ChannelNotFound(trigger.channel.to_string()).into());
        }
        conn.execute(
            "INSERT OR REPLACE INTO triggers (key, channel, title, body, fire_at, repeat)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                trigger.key,
                trigger.channel.as_str(),
                trigger.title,
                trigger.body,
                format_ts(trigger.fire_at),
                trigger.repeat.as_str(),
            ],
        )?;
        Ok(())
    }

    async fn cancel(&self, key: &str) -> Result<()> {
        let n = self
            .conn()?
            .execute("DELETE FROM triggers WHERE key = ?1", params![key])?;
        if n == 0 {
            return Err(NotifyError::TriggerNotFound { key: key.into() }.into());
        }
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ScheduledTrigger>> {
        self.triggers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn routine(time: Option<&str>, items: &[&str]) -> NewRoutine {
        NewRoutine {
            name: "Morning".into(),
            routine_type: RoutineType::Daily,
            scheduled_time: time.map(str::to_string),
            day_filter: Some(DayFilter::Weekdays),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn settings_round_trip_with_defaults() {
        let db = Database::open_memory().unwrap();
        assert!(db.get_bool("notificationsEnabled", true).await.unwrap());
        db.set_setting("notificationsEnabled", "false").unwrap();
        assert!(!db.get_bool("notificationsEnabled", true).await.unwrap());
        db.set_setting("noTimerReminderMinutes", "oops").unwrap();
        assert_eq!(db.get_number("noTimerReminderMinutes", 5).await.unwrap(), 5);
        assert_eq!(db.settings().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn running_sessions_round_trip() {
        let db = Database::open_memory().unwrap();
        let session = RunningSession {
            session_id: 3,
            activity_name: "Reading".into(),
            expected_minutes: Some(25),
            start_time: at(9, 0),
        };
        db.start_session(&session).unwrap();
        assert_eq!(db.running_sessions().await.unwrap(), vec![session]);
        assert!(db.stop_session(3).unwrap());
        assert!(!db.stop_session(3).unwrap());
        assert!(db.running_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn routine_query_filters_inactive_timeless_and_empty() {
        let db = Database::open_memory().unwrap();
        let kept = db.add_routine(&routine(Some("07:00"), &["Stretch"])).unwrap();
        db.add_routine(&routine(None, &["Stretch"])).unwrap();
        let empty = db.add_routine(&routine(Some("08:00"), &[])).unwrap();
        let paused = db.add_routine(&routine(Some("09:00"), &["Walk"])).unwrap();
        db.set_routine_active(paused, false).unwrap();

        let schedules = db.routine_schedules().await.unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].routine_id, kept);
        assert_eq!(schedules[0].day_filter, Some(DayFilter::Weekdays));

        let item = db.add_routine_item(empty, "Journal").unwrap().unwrap();
        assert_eq!(db.routine_schedules().await.unwrap().len(), 2);
        assert!(db.remove_routine_item(item).unwrap());
        assert!(!db.remove_routine_item(item).unwrap());
        assert_eq!(db.routine_schedules().await.unwrap().len(), 1);
        assert_eq!(db.add_routine_item(9999, "Orphan").unwrap(), None);
        db.add_routine_item(empty, "Journal").unwrap();

        assert!(db.remove_routine(kept).unwrap());
        assert!(!db.remove_routine(kept).unwrap());
        assert_eq!(db.routine_schedules().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn install_requires_channel_and_dedups_by_key() {
        let db = Database::open_memory().unwrap();
        let trigger =
            ScheduledTrigger::one_shot("k", ChannelId::TimerAlerts, "t", "b", at(9, 0));
        let err = db.install(trigger.clone()).await.unwrap_err();
        assert!(err.to_string().contains("timer-alerts"));

        db.create_channel(&ChannelId::TimerAlerts.spec()).await.unwrap();
        db.create_channel(&ChannelId::TimerAlerts.spec()).await.unwrap();
        assert_eq!(db.channels().unwrap().len(), 1);

        db.install(trigger.clone()).await.unwrap();
        db.install(ScheduledTrigger {
            fire_at: at(9, 30),
            ..trigger
        })
        .await
        .unwrap();
        let pending = db.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].fire_at, at(9, 30));
    }

    #[tokio::test]
    async fn cancel_missing_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(db.cancel("nothing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn deliver_due_matches_platform_semantics() {
        let db = Database::open_memory().unwrap();
        for id in ChannelId::ALL {
            db.create_channel(&id.spec()).await.unwrap();
        }
        db.install(ScheduledTrigger::one_shot(
            "once",
            ChannelId::TimerAlerts,
            "t",
            "b",
            at(9, 0),
        ))
        .await
        .unwrap();
        db.install(
            ScheduledTrigger::one_shot("weekly", ChannelId::RoutineReminders, "t", "b", at(8, 0))
                .repeating(Repeat::Weekly),
        )
        .await
        .unwrap();

        let events = db.deliver_due(at(9, 0), DeliveryOrigin::Background).unwrap();
        assert_eq!(events.len(), 2);
        let pending = db.triggers().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, "weekly");
        assert_eq!(
            pending[0].fire_at,
            NaiveDate::from_ymd_opt(2026, 1, 9)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timekeep.db");
        {
            let db = Database::open(&path).unwrap();
            db.set_setting("noTimerReminderMinutes", "9").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.setting("noTimerReminderMinutes").unwrap().as_deref(), Some("9"));
    }
}
