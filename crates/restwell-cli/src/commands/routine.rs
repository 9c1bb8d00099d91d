use clap::Subcommand;
use restwell_core::storage::Database;
use restwell_core::RoutineStore;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// List routines with their exercise counts
    List,
    /// Show a routine and its exercises
    Show {
        /// Routine ID
        id: i64,
    },
}

pub fn run(action: RoutineAction) -> CliResult {
    let db = Database::open()?;

    match action {
        RoutineAction::List => {
            print_json(&db.list_routines()?)?;
        }
        RoutineAction::Show { id } => match db.routine(id)? {
            Some(routine) => print_json(&routine)?,
            None => return Err(format!("routine not found: {id}").into()),
        },
    }
    Ok(())
}
