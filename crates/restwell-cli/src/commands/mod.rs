pub mod config;
pub mod history;
pub mod routine;
pub mod session;
pub mod surface;

use std::rc::Rc;

use restwell_core::surface::PreferenceNotifier;
use restwell_core::{
    Config, Database, Event, SessionController, Stores, Surfaces, SystemClock,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Print any serializable value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_events(events: &[Event]) -> CliResult {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

/// Everything a session command needs, wired to the on-disk database.
pub struct Context {
    pub db: Rc<Database>,
    pub config: Config,
}

impl Context {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            db: Rc::new(Database::open()?),
            config: Config::load_or_default(),
        })
    }

    pub fn stores(&self) -> Stores {
        Stores::from_database(self.db.clone())
    }

    pub fn surfaces(&self) -> Surfaces {
        Surfaces {
            notifier: Box::new(PreferenceNotifier::new(self.db.clone())),
            ..Surfaces::headless()
        }
    }

    pub fn open_session(&self, routine_id: i64) -> Result<SessionController, Box<dyn std::error::Error>> {
        Ok(SessionController::open(
            self.stores(),
            self.surfaces(),
            Rc::new(SystemClock),
            self.config.session(),
            routine_id,
        )?)
    }

    /// The stored session with any pending mailbox command applied.
    pub fn resume(&self) -> Result<SessionController, Box<dyn std::error::Error>> {
        self.resume_with(self.surfaces())
    }

    pub fn resume_with(
        &self,
        surfaces: Surfaces,
    ) -> Result<SessionController, Box<dyn std::error::Error>> {
        let controller = self
            .stored_session(surfaces)?
            .ok_or("no active session (start one with `restwell session start`)")?;
        Ok(controller)
    }

    /// The stored session, `None` when nothing is stored. Store failures
    /// are errors.
    pub fn stored_session(
        &self,
        surfaces: Surfaces,
    ) -> Result<Option<SessionController>, Box<dyn std::error::Error>> {
        let Some(mut controller) = SessionController::resume_active(
            self.stores(),
            surfaces,
            Rc::new(SystemClock),
            self.config.session(),
        )?
        else {
            return Ok(None);
        };
        if let Some(event) = controller.poll_commands() {
            tracing::info!(?event, "applied pending surface command");
        }
        Ok(Some(controller))
    }
}
