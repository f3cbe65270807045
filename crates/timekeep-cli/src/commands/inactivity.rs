use clap::Subcommand;
use serde_json::json;

use super::{open_ready, print_json, CliResult};

#[derive(Subcommand)]
pub enum InactivityAction {
    /// Recompute the inactivity reminder
    Reconcile {
        /// Claim a timer is running (cancels the reminder)
        #[arg(long)]
        running: bool,
        /// Interval override in minutes
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Cancel the inactivity reminder
    Stop,
}

pub async fn run(action: InactivityAction) -> CliResult {
    let cli = open_ready().await?;
    let scheduler = cli.ctx.scheduler();
    match action {
        InactivityAction::Reconcile { running, minutes } => {
            print_json(&scheduler.reconcile_inactivity(running, minutes).await)
        }
        InactivityAction::Stop => {
            let stopped = scheduler.stop_inactivity_reminder().await;
            print_json(&json!({ "stopped": stopped }))
        }
    }
}
