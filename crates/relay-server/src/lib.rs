//! Chat relay HTTP API server (Axum).
//!
//! Session creation, streamed chat replies, health, and the bundled
//! frontend as a fallback.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use relay_core::RelayConfig;
use state::AppState;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Build the application router from configuration.
pub fn app(config: &RelayConfig) -> relay_core::Result<Router> {
    let state = AppState::from_config(config)?;
    Ok(app_with_state(state, Some(Path::new(&config.server.static_dir))))
}

/// Build the application router with a custom state. API routes take
/// precedence over files under `static_dir`.
pub fn app_with_state(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .merge(routes::health_routes())
        .merge(routes::chat_routes());

    if let Some(dir) = static_dir {
        if dir.is_dir() {
            let index = ServeFile::new(dir.join("index.html"));
            router = router.fallback_service(ServeDir::new(dir).fallback(index));
        } else {
            tracing::info!(dir = %dir.display(), "static directory not found; frontend not served");
        }
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
