use crate::relay::*;
use crate::sse::*;
use crate::wire::*;
use bytes::Bytes;
use futures::{stream, StreamExt};
use relay_core::config::ProviderConfig;
use relay_core::Turn;
use std::io;

type Chunk = Result<Bytes, io::Error>;

fn chunks(parts: &[&str]) -> Vec<Chunk> {
    parts.iter().map(|p| Ok(Bytes::copy_from_slice(p.as_bytes()))).collect()
}

fn delta_event(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }]
        })
    )
}

async fn collect_fragments(body: Vec<Chunk>) -> Vec<String> {
    fragments_from_sse(stream::iter(body)).collect().await
}

// ========== SSE line classification ==========

#[test]
fn test_parse_data_line() {
    assert_eq!(SseLine::parse("data: {\"a\":1}"), Some(SseLine::Data("{\"a\":1}".into())));
    assert_eq!(SseLine::parse("  data: hello  "), Some(SseLine::Data("hello".into())));
}

#[test]
fn test_parse_done_sentinel() {
    assert_eq!(SseLine::parse("data: [DONE]"), Some(SseLine::Done));
    assert_eq!(SseLine::parse("data: [DONE]\r"), Some(SseLine::Done));
}

#[test]
fn test_parse_ignored_lines() {
    assert_eq!(SseLine::parse(""), None);
    assert_eq!(SseLine::parse(": keep-alive"), None);
    assert_eq!(SseLine::parse("event: message"), None);
    assert_eq!(SseLine::parse("data:{\"no\":\"space\"}"), None);
}

// ========== SSE line splitting ==========

#[tokio::test]
async fn test_lines_split_across_chunks() {
    let body = chunks(&["data: one\n\nda", "ta: two", "\n\ndata: [DONE]\n\n"]);
    let lines: Vec<SseLine> = SseLines::new(stream::iter(body))
        .map(|l| l.unwrap())
        .collect()
        .await;
    assert_eq!(
        lines,
        vec![SseLine::Data("one".into()), SseLine::Data("two".into()), SseLine::Done]
    );
}

#[tokio::test]
async fn test_lines_crlf_and_trailing_line() {
    let body = chunks(&["data: a\r\n\r\ndata: b"]);
    let lines: Vec<SseLine> = SseLines::new(stream::iter(body))
        .map(|l| l.unwrap())
        .collect()
        .await;
    assert_eq!(lines, vec![SseLine::Data("a".into()), SseLine::Data("b".into())]);
}

#[tokio::test]
async fn test_lines_multibyte_split() {
    let event = delta_event("héllo");
    let bytes = event.as_bytes();
    let split = event.find('é').unwrap() + 1; // inside the two-byte sequence
    let body: Vec<Chunk> = vec![
        Ok(Bytes::copy_from_slice(&bytes[..split])),
        Ok(Bytes::copy_from_slice(&bytes[split..])),
    ];
    assert_eq!(collect_fragments(body).await, vec!["héllo"]);
}

#[tokio::test]
async fn test_lines_error_ends_stream() {
    let body: Vec<Chunk> = vec![
        Ok(Bytes::from_static(b"data: x\n")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        Ok(Bytes::from_static(b"data: y\n")),
    ];
    let items: Vec<_> = SseLines::new(stream::iter(body)).collect().await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(items[1].is_err());
}

#[tokio::test]
async fn test_long_line_over_many_chunks() {
    let text = "x".repeat(64 * 1024);
    let event = delta_event(&text);
    let body: Vec<Chunk> = event
        .as_bytes()
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    assert_eq!(collect_fragments(body).await, vec![text]);
}

#[tokio::test]
async fn test_oversized_line_dropped() {
    let huge = format!("data: {}\n", "y".repeat(100));
    let body = chunks(&[&huge[..40], &huge[40..], "data: after\n"]);
    let lines: Vec<SseLine> = SseLines::with_max_line_bytes(stream::iter(body), 32)
        .map(|l| l.unwrap())
        .collect()
        .await;
    assert_eq!(lines, vec![SseLine::Data("after".into())]);
}

#[tokio::test]
async fn test_line_at_limit_kept() {
    let body = chunks(&["data: ab", "cd\n"]);
    let lines: Vec<SseLine> = SseLines::with_max_line_bytes(stream::iter(body), 16)
        .map(|l| l.unwrap())
        .collect()
        .await;
    assert_eq!(lines, vec![SseLine::Data("abcd".into())]);
}

// ========== Delta extraction ==========

#[test]
fn test_parse_delta_content() {
    let data = r#"{"choices":[{"delta":{"content":"He"}}]}"#;
    assert_eq!(parse_delta(data).unwrap(), Some("He".to_string()));
}

#[test]
fn test_parse_delta_without_text() {
    assert_eq!(parse_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(), None);
    assert_eq!(parse_delta(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap(), None);
    assert_eq!(parse_delta(r#"{"choices":[{"delta":{"content":null}}]}"#).unwrap(), None);
    assert_eq!(parse_delta(r#"{"choices":[]}"#).unwrap(), None);
}

#[test]
fn test_parse_delta_malformed() {
    assert!(parse_delta("{not json").is_err());
    assert!(parse_delta(r#"{"error":"rate limited"}"#).is_err());
    assert!(parse_delta(r#"{"choices":[{"message":{}}]}"#).is_err());
}

#[test]
fn test_request_body_shape() {
    let history = vec![Turn::user("hi"), Turn::assistant("hello"), Turn::user("bye")];
    let body = serde_json::to_value(ChatCompletionRequest::streaming("m", &history)).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "model": "m",
            "messages": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" },
                { "role": "user", "content": "bye" }
            ],
            "stream": true
        })
    );
}

#[test]
fn test_request_body_field_order() {
    let history = vec![Turn::user("hi")];
    let raw = serde_json::to_string(&ChatCompletionRequest::streaming("m", &history)).unwrap();
    assert_eq!(raw, r#"{"model":"m","messages":[{"role":"user","content":"hi"}],"stream":true}"#);
}

// ========== Fragment stream ==========

#[tokio::test]
async fn test_fragments_in_order_until_done() {
    let body = vec![
        Ok(Bytes::from(delta_event("He"))),
        Ok(Bytes::from(delta_event("llo"))),
        Ok(Bytes::from_static(b"data: [DONE]\n\n")),
    ];
    assert_eq!(collect_fragments(body).await, vec!["He", "llo"]);
}

#[tokio::test]
async fn test_nothing_after_done() {
    let body = vec![
        Ok(Bytes::from(delta_event("a"))),
        Ok(Bytes::from_static(b"data: [DONE]\n\n")),
        Ok(Bytes::from(delta_event("late"))),
    ];
    assert_eq!(collect_fragments(body).await, vec!["a"]);
}

#[tokio::test]
async fn test_malformed_event_skipped() {
    let body = vec![
        Ok(Bytes::from(delta_event("first"))),
        Ok(Bytes::from_static(b"data: {\"choices\": [oops\n\n")),
        Ok(Bytes::from(delta_event("second"))),
        Ok(Bytes::from_static(b"data: [DONE]\n\n")),
    ];
    assert_eq!(collect_fragments(body).await, vec!["first", "second"]);
}

#[tokio::test]
async fn test_mid_stream_failure_yields_one_error() {
    let body: Vec<Chunk> = vec![
        Ok(Bytes::from(delta_event("partial"))),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")),
        Ok(Bytes::from(delta_event("never"))),
    ];
    let fragments = collect_fragments(body).await;
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0], "partial");
    assert!(fragments[1].starts_with("[Error:"));
    assert!(fragments[1].contains("connection reset by peer"));
}

#[tokio::test]
async fn test_body_without_done_ends_cleanly() {
    let body = vec![Ok(Bytes::from(delta_event("only")))];
    assert_eq!(collect_fragments(body).await, vec!["only"]);
}

#[tokio::test]
async fn test_empty_body() {
    assert!(collect_fragments(Vec::new()).await.is_empty());
}

// ========== Relay ==========

#[tokio::test]
async fn test_missing_key_single_fragment() {
    let relay = ChatCompletionsRelay::new(ProviderConfig {
        api_url: "http://127.0.0.1:9/unreachable".into(),
        ..ProviderConfig::default()
    })
    .unwrap();
    assert!(!relay.has_credential());
    let fragments: Vec<String> = relay.stream_reply(vec![Turn::user("hi")]).collect().await;
    assert_eq!(fragments, vec![MISSING_KEY_MESSAGE.to_string()]);
}

#[test]
fn test_relay_model_from_config() {
    let relay = ChatCompletionsRelay::new(ProviderConfig::default()).unwrap();
    assert_eq!(relay.model(), relay_core::config::DEFAULT_MODEL);
}
