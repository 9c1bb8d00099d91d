use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "restwell", version, about = "Restwell workout session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Active workout session
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Routine catalog
    Routine {
        #[command(subcommand)]
        action: commands::routine::RoutineAction,
    },
    /// Finished sessions
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Widget and notification boundary
    Surface {
        #[command(subcommand)]
        action: commands::surface::SurfaceAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RESTWELL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Routine { action } => commands::routine::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Surface { action } => commands::surface::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
