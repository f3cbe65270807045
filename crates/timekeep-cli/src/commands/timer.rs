use chrono::Local;
use clap::Subcommand;
use timekeep_core::RunningSession;

use super::{open, open_ready, parse_instant, print_json, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a timer and schedule its alerts
    Start {
        /// Session ID
        session_id: i64,
        /// Activity being tracked
        #[arg(long)]
        activity: String,
        /// Planned length in minutes
        #[arg(long)]
        expected: Option<i64>,
        /// Start time, YYYY-MM-DDTHH:MM (defaults to now)
        #[arg(long)]
        start: Option<String>,
    },
    /// Stop a timer and cancel its alerts
    Stop {
        /// Session ID
        session_id: i64,
    },
    /// List running timers
    List,
}

pub async fn run(action: TimerAction) -> CliResult {
    match action {
        TimerAction::Start {
            session_id,
            activity,
            expected,
            start,
        } => {
            let start_time = match start {
                Some(raw) => parse_instant(&raw)?,
                None => Local::now().naive_local(),
            };
            let session = RunningSession {
                session_id,
                activity_name: activity,
                expected_minutes: expected,
                start_time,
            };
            let cli = open_ready().await?;
            cli.db.start_session(&session)?;
            let report = cli.ctx.session_started(&session).await;
            print_json(&report)
        }
        TimerAction::Stop { session_id } => {
            let cli = open_ready().await?;
            if !cli.db.stop_session(session_id)? {
                tracing::warn!(session_id, "timer was not running");
            }
            let report = cli.ctx.session_stopped(session_id).await;
            print_json(&report)
        }
        TimerAction::List => {
            let cli = open()?;
            print_json(&cli.db.sessions()?)
        }
    }
}
