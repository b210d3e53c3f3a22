//! Application state shared across all handlers.

use relay_core::RelayConfig;
use relay_provider::{ChatCompletionsRelay, CompletionRelay};
use relay_session::SessionStore;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub relay: Arc<dyn CompletionRelay>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(sessions: SessionStore, relay: Arc<dyn CompletionRelay>) -> Self {
        Self {
            sessions,
            relay,
            start_time: Instant::now(),
        }
    }

    /// State wired to the configured chat-completions provider.
    pub fn from_config(config: &RelayConfig) -> relay_core::Result<Self> {
        let relay = ChatCompletionsRelay::new(config.provider.clone())?;
        if !relay.has_credential() {
            tracing::warn!("GROQ_API_KEY is not set; chat replies will report a configuration error");
        }
        Ok(Self::new(
            SessionStore::with_max_history(config.session.max_history),
            Arc::new(relay),
        ))
    }
}
