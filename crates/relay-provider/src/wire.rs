//! Request and response payloads of the chat-completions API.

use relay_core::Turn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Streaming request carrying `history` in order.
    pub fn streaming(model: &'a str, history: &'a [Turn]) -> Self {
        Self {
            model,
            messages: history
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role().as_str(),
                    content: turn.content(),
                })
                .collect(),
            stream: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract `choices[0].delta.content` from one event payload.
///
/// `Ok(None)` means a well-formed event with no text (role preamble, finish
/// marker, empty choices). `Err` means the payload did not match the schema.
pub fn parse_delta(data: &str) -> serde_json::Result<Option<String>> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}
