//! Finance Chat
//!
//! A conversational assistant for stock prices, price histories, company
//! news and exchange rates. The model decides per turn whether to answer
//! directly or to call exactly one finance tool; tool output is fed back and
//! narrated in a second model call.
//!
//! TURN LOOP:
//! INPUT → DECIDE → (TOOL → NARRATE)? → DISPLAY

pub mod api;
pub mod cache;
pub mod chart;
pub mod config;
pub mod conversation;
pub mod error;
pub mod format;
pub mod fx;
pub mod llm;
pub mod market;
pub mod models;
pub mod news;
pub mod sources;
pub mod ticker;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use conversation::{Session, TurnController, TurnReport};
