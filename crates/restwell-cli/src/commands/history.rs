use clap::Subcommand;
use restwell_core::storage::Database;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Most recent finished sessions first
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(action: HistoryAction) -> CliResult {
    let db = Database::open()?;

    match action {
        HistoryAction::List { limit } => {
            print_json(&db.history(limit)?)?;
        }
    }
    Ok(())
}
