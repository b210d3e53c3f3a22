//! Shared types, configuration, and logging for the chat relay.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use types::{Conversation, Role, Turn};
