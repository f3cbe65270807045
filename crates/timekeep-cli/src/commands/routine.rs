use clap::Subcommand;
use serde_json::json;
use timekeep_core::storage::NewRoutine;
use timekeep_core::time::parse_time_of_day;
use timekeep_core::{DayFilter, RoutineType, ValidationError};

use super::{open, open_ready, print_json, CliResult};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Add a routine and rebuild reminders
    Add {
        /// Routine name
        name: String,
        /// Start time, HH:MM
        #[arg(long)]
        time: Option<String>,
        /// all, weekdays, weekend or day:N (0 = Sunday)
        #[arg(long)]
        days: Option<String>,
        /// Routine item (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
    },
    /// Remove a routine and rebuild reminders
    Remove {
        /// Routine ID
        id: i64,
    },
    /// Add an item to a routine and rebuild reminders
    AddItem {
        /// Routine ID
        id: i64,
        /// Item name
        name: String,
    },
    /// Remove a routine item and rebuild reminders
    RemoveItem {
        /// Item ID
        item_id: i64,
    },
    /// Pause or resume a routine
    SetActive {
        /// Routine ID
        id: i64,
        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
    /// List routines
    List,
    /// Rebuild routine reminders from the store
    Rebuild,
}

pub async fn run(action: RoutineAction) -> CliResult {
    match action {
        RoutineAction::Add {
            name,
            time,
            days,
            items,
        } => {
            if let Some(raw) = time.as_deref() {
                if parse_time_of_day(raw).is_none() {
                    return Err(ValidationError::InvalidTimeOfDay(raw.to_string()).into());
                }
            }
            let day_filter = days.as_deref().map(str::parse::<DayFilter>).transpose()?;
            let routine_type = match day_filter {
                None | Some(DayFilter::All) => RoutineType::Daily,
                Some(_) => RoutineType::Weekly,
            };
            let cli = open_ready().await?;
            let id = cli.db.add_routine(&NewRoutine {
                name,
                routine_type,
                scheduled_time: time,
                day_filter,
                items,
            })?;
            let outcome = cli.ctx.routines_changed().await;
            print_json(&json!({ "id": id, "reminders": outcome }))
        }
        RoutineAction::Remove { id } => {
            let cli = open_ready().await?;
            let removed = cli.db.remove_routine(id)?;
            let outcome = cli.ctx.routines_changed().await;
            print_json(&json!({ "removed": removed, "reminders": outcome }))
        }
        RoutineAction::AddItem { id, name } => {
            let cli = open_ready().await?;
            let item_id = cli
                .db
                .add_routine_item(id, &name)?
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: "id".into(),
                    message: format!("no routine {id}"),
                })?;
            let outcome = cli.ctx.routines_changed().await;
            print_json(&json!({ "item_id": item_id, "reminders": outcome }))
        }
        RoutineAction::RemoveItem { item_id } => {
            let cli = open_ready().await?;
            let removed = cli.db.remove_routine_item(item_id)?;
            let outcome = cli.ctx.routines_changed().await;
            print_json(&json!({ "removed": removed, "reminders": outcome }))
        }
        RoutineAction::SetActive { id, active } => {
            let cli = open_ready().await?;
            let updated = cli.db.set_routine_active(id, active)?;
            let outcome = cli.ctx.routines_changed().await;
            print_json(&json!({ "updated": updated, "reminders": outcome }))
        }
        RoutineAction::List => {
            let cli = open()?;
            print_json(&cli.db.routines()?)
        }
        RoutineAction::Rebuild => {
            let cli = open_ready().await?;
            print_json(&cli.ctx.routines_changed().await)
        }
    }
}
