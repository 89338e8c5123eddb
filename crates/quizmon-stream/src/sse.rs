//! Server-Sent Events framing.
//!
//! Splits a line-oriented byte stream into SSE frames. A blank line ends a
//! frame, `data:` lines accumulate (joined with `\n`), and `:` lines are
//! keep-alive comments. Lines are decoded leniently: invalid UTF-8 becomes
//! U+FFFD and never ends the stream.

use futures_util::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;
use tracing::warn;

use crate::error::{StreamError, StreamResult};

/// A single SSE frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// The SSE event name (from `event:` line).
    pub event: Option<String>,
    /// The event ID (from `id:` line).
    pub id: Option<String>,
    /// The event data (from `data:` line(s)).
    pub data: String,
}

impl SseFrame {
    /// Unnamed frames and frames named `message` are the default message type.
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// An item yielded by the frame stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseItem {
    Frame(SseFrame),
    /// A comment line; the server is keeping the connection alive.
    KeepAlive,
}

/// Frame an HTTP response body.
pub fn response_frames(
    response: reqwest::Response,
) -> impl Stream<Item = StreamResult<SseItem>> + Send {
    let bytes = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(std::io::Error::other));
    let reader = tokio::io::BufReader::new(StreamReader::new(bytes));
    frames(reader)
}

/// Largest frame kept, counting the bytes of its field lines.
///
/// A longer frame is dropped whole, and a longer line is skipped through its
/// newline without being buffered.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Frame any buffered reader. The stream ends when the reader does.
pub fn frames<R>(reader: R) -> impl Stream<Item = StreamResult<SseItem>> + Send
where
    R: AsyncBufRead + Unpin + Send,
{
    frames_with_limit(reader, MAX_FRAME_BYTES)
}

/// Like [`frames`], with a custom frame size limit.
pub fn frames_with_limit<R>(
    reader: R,
    max_frame_bytes: usize,
) -> impl Stream<Item = StreamResult<SseItem>> + Send
where
    R: AsyncBufRead + Unpin + Send,
{
    let lines = LineReader::new(reader, max_frame_bytes);
    stream::unfold(
        (lines, FrameState::default()),
        move |(mut lines, mut state)| async move {
            loop {
                match lines.next_line().await {
                    Ok(Some(Line::Text(line))) => {
                        if line.is_empty() {
                            if let Some(frame) = state.take_frame() {
                                return Some((Ok(SseItem::Frame(frame)), (lines, state)));
                            }
                            continue;
                        }

                        if line.starts_with(':') {
                            return Some((Ok(SseItem::KeepAlive), (lines, state)));
                        }

                        state.apply_line(&line);
                        if state.size > max_frame_bytes {
                            state.discard(max_frame_bytes);
                        }
                    }
                    Ok(Some(Line::Oversized)) => state.discard(max_frame_bytes),
                    // A trailing frame without its blank line is discarded.
                    Ok(None) => return None,
                    Err(e) => return Some((Err(StreamError::Read(e)), (lines, state))),
                }
            }
        },
    )
}

/// One line read off the wire.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    /// Line without its terminator. Invalid UTF-8 is replaced, not rejected.
    Text(String),
    /// The line ran past the limit and was skipped.
    Oversized,
}

/// Newline-delimited reader over raw bytes with a per-line limit.
struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    max_line_bytes: usize,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            max_line_bytes,
        }
    }

    /// Next line, or `None` at end of input. A partial last line is dropped.
    async fn next_line(&mut self) -> std::io::Result<Option<Line>> {
        self.buf.clear();
        let mut oversized = false;

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(None);
            }

            let newline = available.iter().position(|&b| b == b'\n');
            let chunk = &available[..newline.unwrap_or(available.len())];
            if !oversized {
                if self.buf.len() + chunk.len() > self.max_line_bytes {
                    oversized = true;
                    self.buf.clear();
                } else {
                    self.buf.extend_from_slice(chunk);
                }
            }

            let consumed = newline.map_or(available.len(), |i| i + 1);
            self.reader.consume(consumed);
            if newline.is_some() {
                break;
            }
        }

        if oversized {
            return Ok(Some(Line::Oversized));
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(Some(Line::Text(
            String::from_utf8_lossy(&self.buf).into_owned(),
        )))
    }
}

/// Intermediate state for parsing SSE frames line-by-line.
#[derive(Debug, Default)]
struct FrameState {
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
    /// Bytes of field lines applied to the current frame.
    size: usize,
    /// The current frame is being dropped; fields are ignored until the blank line.
    skipping: bool,
}

impl FrameState {
    fn apply_line(&mut self, line: &str) {
        if self.skipping {
            return;
        }
        self.size += line.len();

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            // `retry` and unknown fields are ignored.
            _ => {}
        }
    }

    /// Drop the frame in progress and skip the rest of it.
    fn discard(&mut self, limit: usize) {
        if !self.skipping {
            warn!(limit, "Dropping oversized stream frame");
        }
        *self = Self {
            skipping: true,
            ..Self::default()
        };
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if std::mem::take(&mut self.skipping) {
            return None;
        }
        self.size = 0;
        if self.data.is_empty() && self.event.is_none() && self.id.is_none() {
            return None;
        }
        Some(SseFrame {
            event: self.event.take(),
            id: self.id.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}
