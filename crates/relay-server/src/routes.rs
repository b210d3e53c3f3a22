use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_core::Turn;
use relay_provider::FragmentStream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use tracing::{error, info};

/// Written in place of the rest of a reply whose producer panicked.
pub const INTERNAL_ERROR_FRAGMENT: &str = "[Error: internal relay failure]";

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/new-chat", post(new_chat))
        .route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewChatResponse {
    pub session_id: String,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions.count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn new_chat(State(state): State<AppState>) -> Json<NewChatResponse> {
    let session_id = state.sessions.create_session();
    info!(%session_id, "new chat session");
    Json(NewChatResponse { session_id })
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let session_id = req
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("session_id is required"))?;

    let history = state.sessions.append_turn(&session_id, Turn::user(req.message));
    info!(%session_id, turns = history.len(), "relaying chat message");

    let body = Body::from_stream(fragment_body(state.relay.stream_reply(history)));
    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// Each fragment becomes one body chunk. A panic while producing the next
/// fragment ends the body with [`INTERNAL_ERROR_FRAGMENT`].
fn fragment_body(fragments: FragmentStream) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    AssertUnwindSafe(fragments).catch_unwind().map(|item| match item {
        Ok(fragment) => Ok(Bytes::from(fragment)),
        Err(_) => {
            error!("reply stream panicked");
            Ok(Bytes::from_static(INTERNAL_ERROR_FRAGMENT.as_bytes()))
        }
    })
}
