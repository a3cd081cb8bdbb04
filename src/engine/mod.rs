mod journal;
mod journal_engine;
mod sacco;

pub use journal::{Command, CommandName, JournalError, JournalRecord};
pub use journal_engine::{JournalEngine, ReplayError, ReplayStats};
pub use sacco::Sacco;
