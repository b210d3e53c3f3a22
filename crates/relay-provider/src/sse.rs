//! Line framing for `text/event-stream` response bodies.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A meaningful line of an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Payload of a `data: ` line, trimmed.
    Data(String),
    /// The `data: [DONE]` sentinel.
    Done,
}

impl SseLine {
    /// Classify one raw line. Blank lines, comments, and non-`data: ` fields
    /// return `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let data = line.trim().strip_prefix("data: ")?.trim();
        if data == "[DONE]" {
            Some(SseLine::Done)
        } else {
            Some(SseLine::Data(data.to_string()))
        }
    }
}

/// Longest line buffered before it is dropped.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a chunked byte stream into [`SseLine`]s.
///
/// Bytes are buffered until a full line is available, so UTF-8 sequences
/// split across chunks decode correctly. A line longer than the limit is
/// discarded up to its newline. An inner error is passed through once and
/// then ends the stream.
#[derive(Debug)]
pub struct SseLines<S> {
    inner: S,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    max_line_bytes: usize,
    discarding: bool,
    finished: bool,
}

impl<S> SseLines<S> {
    pub fn new(inner: S) -> Self {
        Self::with_max_line_bytes(inner, DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(inner: S, max_line_bytes: usize) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            scanned: 0,
            max_line_bytes,
            discarding: false,
            finished: false,
        }
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buffer.len();
                if self.scanned > self.max_line_bytes {
                    tracing::debug!(bytes = self.scanned, "dropping oversized event line");
                    self.buffer.clear();
                    self.scanned = 0;
                    self.discarding = true;
                }
                return None;
            };

            let pos = self.scanned + offset;
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
    }
}

impl<S, E> Stream for SseLines<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<SseLine, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(line) = this.next_line() {
                if let Some(event) = SseLine::parse(&line) {
                    return Poll::Ready(Some(Ok(event)));
                }
                continue;
            }

            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    this.buffer.clear();
                    this.scanned = 0;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    // Flush a final line that lacks its newline.
                    this.finished = true;
                    if !this.buffer.is_empty() {
                        this.buffer.push(b'\n');
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
