use std::sync::Arc;

use chrono::Local;
use clap::Args;
use serde_json::json;
use timekeep_core::time::FixedClock;
use timekeep_core::DeliveryOrigin;

use super::{open, open_with_clock, parse_instant, print_json, CliResult};

#[derive(Args)]
pub struct DeliverArgs {
    /// Deliver as of this time, YYYY-MM-DDTHH:MM (defaults to now)
    #[arg(long)]
    at: Option<String>,
    /// Treat the app as being in the foreground
    #[arg(long)]
    foreground: bool,
}

pub fn pending() -> CliResult {
    let cli = open()?;
    print_json(&cli.db.triggers()?)
}

/// Emulates the platform firing due notifications, with the app running.
pub async fn deliver(args: DeliverArgs) -> CliResult {
    let now = match args.at.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Local::now().naive_local(),
    };
    let origin = if args.foreground {
        DeliveryOrigin::Foreground
    } else {
        DeliveryOrigin::Background
    };

    let cli = open_with_clock(Arc::new(FixedClock::new(now)))?;
    cli.ctx.ensure_channels().await?;
    cli.ctx.listener().register();

    let events = cli.db.deliver_due(now, origin)?;
    let renewed = cli.ctx.dispatch(events.clone()).await;
    cli.ctx.shutdown();
    print_json(&json!({ "delivered": events, "renewed": renewed }))
}

pub async fn resync() -> CliResult {
    let cli = open()?;
    let report = cli.ctx.init().await?;
    cli.ctx.shutdown();
    print_json(&report)
}
