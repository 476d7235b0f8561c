//! Conversation handling: the session transcript and the per-turn controller

pub mod controller;
pub mod session;

pub use controller::{ToolRun, TurnController, TurnReport};
pub use session::{Session, TRANSCRIPT_FILE_NAME};
