//! Streaming relay to an OpenAI-compatible chat-completions provider.
//!
//! A reply is exposed as a stream of text fragments. Failures never surface
//! as `Err`: they arrive as a final `[Error: ...]` fragment.

pub mod relay;
pub mod sse;
pub mod wire;

pub use relay::{fragments_from_sse, ChatCompletionsRelay, CompletionRelay, FragmentStream, MISSING_KEY_MESSAGE};
pub use sse::{SseLine, SseLines};

#[cfg(test)]
mod tests;
