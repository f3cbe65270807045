use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "timekeep-cli", version, about = "Timekeep notification scheduler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Notification channel setup
    Channels {
        #[command(subcommand)]
        action: commands::channels::ChannelsAction,
    },
    /// Start and stop timers
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// The no-timer-running reminder
    Inactivity {
        #[command(subcommand)]
        action: commands::inactivity::InactivityAction,
    },
    /// Routine management
    Routine {
        #[command(subcommand)]
        action: commands::routine::RoutineAction,
    },
    /// User notification settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// List pending triggers
    Pending,
    /// Fire every trigger that is due and run the delivery listener
    Deliver(commands::triggers::DeliverArgs),
    /// Recompute every trigger from the stores
    Resync,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TIMEKEEP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Channels { action } => commands::channels::run(action).await,
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Inactivity { action } => commands::inactivity::run(action).await,
        Commands::Routine { action } => commands::routine::run(action).await,
        Commands::Settings { action } => commands::settings::run(action).await,
        Commands::Pending => commands::triggers::pending(),
        Commands::Deliver(args) => commands::triggers::deliver(args).await,
        Commands::Resync => commands::triggers::resync().await,
        Commands::Config { action } => commands::config::run(action),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli.command)) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
