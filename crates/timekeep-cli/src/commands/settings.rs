use std::collections::BTreeMap;

use clap::Subcommand;
use serde_json::json;
use timekeep_core::notify::settings::{self, parse_bool};
use timekeep_core::ValidationError;

use super::{open, open_ready, print_json, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a setting (stored value or default)
    Get {
        /// Setting key, e.g. "noTimerReminderMinutes"
        key: String,
    },
    /// Set a setting and apply it to pending reminders
    Set {
        /// Setting key
        key: String,
        /// New value
        value: String,
    },
    /// List every setting with its effective value
    List,
}

fn default_for(key: &str) -> Result<&'static str, ValidationError> {
    settings::ALL
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, default)| *default)
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "key".into(),
            message: format!("unknown setting '{key}'"),
        })
}

/// Minutes must be a whole number in `1..=MAX_NO_TIMER_REMINDER_MINUTES`.
fn validate(key: &str, value: &str) -> Result<(), ValidationError> {
    if key == settings::NO_TIMER_REMINDER_MINUTES {
        return match value.trim().parse::<i64>() {
            Ok(m) if (1..=settings::MAX_NO_TIMER_REMINDER_MINUTES).contains(&m) => Ok(()),
            _ => Err(ValidationError::InvalidValue {
                field: key.into(),
                message: format!(
                    "'{value}' is not a whole number of minutes between 1 and {}",
                    settings::MAX_NO_TIMER_REMINDER_MINUTES
                ),
            }),
        };
    }
    match parse_bool(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::InvalidValue {
            field: key.into(),
            message: format!("cannot use '{value}'"),
        }),
    }
}

pub async fn run(action: SettingsAction) -> CliResult {
    match action {
        SettingsAction::Get { key } => {
            let default = default_for(&key)?;
            let cli = open()?;
            let value = cli.db.setting(&key)?.unwrap_or_else(|| default.to_string());
            println!("{value}");
            Ok(())
        }
        SettingsAction::Set { key, value } => {
            default_for(&key)?;
            validate(&key, &value)?;
            let cli = open_ready().await?;
            cli.db.set_setting(&key, &value)?;
            let applied = cli.ctx.settings_changed().await;
            print_json(&json!({ "key": key, "value": value, "applied": applied }))
        }
        SettingsAction::List => {
            let cli = open()?;
            let mut out = BTreeMap::new();
            for (key, default) in settings::ALL {
                let value = cli.db.setting(key)?.unwrap_or_else(|| default.to_string());
                out.insert(key, value);
            }
            print_json(&out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(default_for("volume").is_err());
        assert_eq!(default_for(settings::NO_TIMER_REMINDER_MINUTES).unwrap(), "5");
        assert!(validate(settings::NO_TIMER_REMINDER_MINUTES, "ten").is_err());
        assert!(validate(settings::NO_TIMER_REMINDER_MINUTES, "10").is_ok());
        assert!(validate(settings::NO_TIMER_REMINDER_MINUTES, "1440").is_ok());
        for bad in ["1e30", "1000000000000", "0", "-5", "1441", "2.5", "NaN"] {
            assert!(validate(settings::NO_TIMER_REMINDER_MINUTES, bad).is_err(), "{bad}");
        }
        assert!(validate(settings::NOTIFICATIONS_ENABLED, "yes").is_err());
        assert!(validate(settings::NOTIFICATIONS_ENABLED, "0").is_ok());
    }
}
