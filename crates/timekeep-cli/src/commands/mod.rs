pub mod channels;
pub mod config;
pub mod inactivity;
pub mod routine;
pub mod settings;
pub mod timer;
pub mod triggers;

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use timekeep_core::{
    Clock, Config, Database, Ports, SchedulerContext, SystemClock, ValidationError,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The on-disk store plus a context wired to it.
pub struct Store {
    pub db: Arc<Database>,
    pub ctx: SchedulerContext,
}

/// Open the database from config and build a context with the real clock.
pub fn open() -> Result<Store, Box<dyn std::error::Error>> {
    open_with_clock(Arc::new(SystemClock))
}

pub fn open_with_clock(clock: Arc<dyn Clock>) -> Result<Store, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Arc::new(Database::open(&config.database_path()?)?);
    let ctx = SchedulerContext::new(Ports::shared(db.clone()), clock, config.scheduler());
    Ok(Store { db, ctx })
}

/// Open, then make sure channels exist so installs are accepted.
pub async fn open_ready() -> Result<Store, Box<dyn std::error::Error>> {
    let store = open()?;
    store.ctx.ensure_channels().await?;
    Ok(store)
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS[.fff]]`.
pub fn parse_instant(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .map_err(|e| ValidationError::InvalidValue {
            field: "time".into(),
            message: format!("'{raw}': {e}"),
        })
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_instant_accepts_with_and_without_seconds() {
        let a = parse_instant("2026-01-02T10:00").unwrap();
        let b = parse_instant("2026-01-02T10:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_instant("2026-01-02T10:00:00.250").unwrap() > a);
        assert!(parse_instant("tomorrow").is_err());
    }
}
