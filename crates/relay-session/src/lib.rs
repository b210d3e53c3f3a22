//! Bounded, in-memory conversation history per chat session.

pub mod store;

pub use store::{SessionId, SessionStore, MAX_HISTORY};
