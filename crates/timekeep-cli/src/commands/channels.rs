use clap::Subcommand;
use serde_json::json;

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum ChannelsAction {
    /// Create the delivery channels (safe to repeat)
    Setup,
    /// List created channels
    List,
}

pub async fn run(action: ChannelsAction) -> CliResult {
    let cli = open()?;
    match action {
        ChannelsAction::Setup => {
            cli.ctx.ensure_channels().await?;
            print_json(&json!({ "channels": cli.db.channels()? }))
        }
        ChannelsAction::List => print_json(&cli.db.channels()?),
    }
}
