use clap::Subcommand;
use restwell_core::surface::{command, projection, Command, NOTIFICATION_KEY};
use restwell_core::PreferenceStore;
use serde_json::Value;

use super::{print_events, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum SurfaceAction {
    /// Leave a command in the mailbox, as a widget would
    Post {
        /// pause | reset | next
        command: String,
    },
    /// Print what out-of-process surfaces currently see
    Show,
    /// Press a notification button (PAUSE_TIMER, RESET_TIMER, SET_COMPLETE)
    Action { action_id: String },
}

fn stored_json(prefs: &dyn PreferenceStore, key: &str) -> Value {
    prefs
        .get(key)
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or(Value::Null)
}

pub fn run(action: SurfaceAction) -> CliResult {
    let ctx = Context::open()?;
    let prefs = ctx.db.as_ref();

    match action {
        SurfaceAction::Post { command: token } => {
            let parsed: Command = token.parse()?;
            command::post(prefs, parsed)?;
            println!("posted: {parsed}");
        }
        SurfaceAction::Show => {
            let view = serde_json::json!({
                "status": stored_json(prefs, projection::PROJECTION_KEY),
                "notifications": stored_json(prefs, NOTIFICATION_KEY),
                "home": stored_json(prefs, projection::HOME_SUMMARY_KEY),
                "pending_command": prefs.get(command::COMMAND_KEY)?,
            });
            print_json(&view)?;
        }
        SurfaceAction::Action { action_id } => {
            let mut controller = ctx.resume()?;
            let outcome = controller.handle_notification_action(&action_id);
            controller.flush();
            print_events(&controller.take_events())?;
            if outcome.is_none() {
                println!("{{\"type\": \"refused\"}}");
            }
        }
    }
    Ok(())
}
