mod config;
pub mod database;

pub use config::{Config, NotificationsConfig, StorageConfig};
pub use database::{Database, NewRoutine, RoutineRecord};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/timekeep[-dev]/` based on TIMEKEEP_ENV.
///
/// Set TIMEKEEP_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMEKEEP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timekeep-dev")
    } else {
        base_dir.join("timekeep")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
