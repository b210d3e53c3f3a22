use crate::sse::{SseLine, SseLines};
use crate::wire::{parse_delta, ChatCompletionRequest};
use async_stream::stream;
use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use relay_core::config::ProviderConfig;
use relay_core::{Conversation, RelayError};
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lazily produced reply text. Finite and not restartable.
pub type FragmentStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Fragment emitted when no provider credential is configured.
pub const MISSING_KEY_MESSAGE: &str = "[Error: Groq API key not set]";

const STATUS_BODY_EXCERPT: usize = 200;

/// Produces a model reply for a conversation.
pub trait CompletionRelay: Send + Sync {
    fn stream_reply(&self, history: Conversation) -> FragmentStream;
}

/// Relay backed by an OpenAI-compatible streaming chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsRelay {
    client: reqwest::Client,
    settings: Arc<ProviderConfig>,
}

impl ChatCompletionsRelay {
    pub fn new(settings: ProviderConfig) -> relay_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RelayError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

impl CompletionRelay for ChatCompletionsRelay {
    fn stream_reply(&self, history: Conversation) -> FragmentStream {
        let client = self.client.clone();
        let settings = Arc::clone(&self.settings);

        Box::pin(stream! {
            let Some(api_key) = settings.api_key.as_deref() else {
                warn!("provider API key not configured");
                yield MISSING_KEY_MESSAGE.to_string();
                return;
            };

            let body = ChatCompletionRequest::streaming(&settings.model, &history);
            info!(model = %settings.model, turns = history.len(), "opening provider stream");

            let response = match client
                .post(&settings.api_url)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %error_detail(&err), "provider request failed");
                    yield error_fragment(&err);
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                warn!(%status, "provider returned error status");
                yield status_fragment(status, &text);
                return;
            }

            let fragments = fragments_from_sse(response.bytes_stream());
            pin_mut!(fragments);
            while let Some(fragment) = fragments.next().await {
                yield fragment;
            }
        })
    }
}

/// Turn a raw event-stream body into reply fragments.
///
/// Stops at `[DONE]` or end of body. Events that fail to parse are skipped.
/// A transport error yields one `[Error: ...]` fragment and ends the stream.
pub fn fragments_from_sse<S, E>(body: S) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: StdError + Send,
{
    stream! {
        let mut lines = SseLines::new(Box::pin(body));
        let mut produced = 0usize;
        let mut skipped = 0usize;

        while let Some(line) = lines.next().await {
            match line {
                Ok(SseLine::Done) => {
                    debug!(produced, skipped, "provider stream complete");
                    return;
                }
                Ok(SseLine::Data(data)) => match parse_delta(&data) {
                    Ok(Some(delta)) => {
                        produced += 1;
                        yield delta;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        skipped += 1;
                        debug!(error = %err, "skipping malformed provider event");
                    }
                },
                Err(err) => {
                    warn!(error = %error_detail(&err), produced, "provider stream interrupted");
                    yield error_fragment(&err);
                    return;
                }
            }
        }

        debug!(produced, skipped, "provider stream ended without [DONE]");
    }
}

fn error_fragment(err: &dyn StdError) -> String {
    format!("[Error: {}]", error_detail(err))
}

fn status_fragment(status: reqwest::StatusCode, body: &str) -> String {
    let excerpt: String = body.trim().chars().take(STATUS_BODY_EXCERPT).collect();
    if excerpt.is_empty() {
        format!("[Error: provider returned {status}]")
    } else {
        format!("[Error: provider returned {status}: {excerpt}]")
    }
}

/// Error message followed by its source chain.
fn error_detail(err: &dyn StdError) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !detail.contains(&text) {
            detail.push_str(": ");
            detail.push_str(&text);
        }
        source = cause.source();
    }
    detail
}
