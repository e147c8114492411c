//! Decoding of streamed feed lines.
//!
//! The streaming endpoint sends one JSON document per line. Most lines are
//! statuses; the rest are control notices distinguished by their single
//! top-level key (`limit`, `delete`, `warning`, `disconnect`). Blank lines are
//! keep-alives.

use serde::Deserialize;
use serde::de::IgnoredAny;
use thiserror::Error;

use crate::types::{EventId, FeedMessage, InboundEvent};

/// Errors that can occur while decoding a feed line.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("status is missing its {0}")]
    MissingField(&'static str),

    #[error("line exceeds {max} bytes ({len} buffered)")]
    LineTooLong { len: usize, max: usize },
}

/// Longest line the stream may send. Statuses are a few kilobytes at most.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct RawLine {
    id: Option<u64>,
    id_str: Option<String>,
    text: Option<String>,
    full_text: Option<String>,
    extended_tweet: Option<RawExtended>,
    retweeted_status: Option<IgnoredAny>,
    limit: Option<RawLimit>,
    delete: Option<RawDelete>,
    warning: Option<RawWarning>,
    disconnect: Option<RawDisconnect>,
}

#[derive(Debug, Deserialize)]
struct RawExtended {
    full_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLimit {
    #[serde(default)]
    track: u64,
}

#[derive(Debug, Deserialize)]
struct RawDelete {
    status: RawDeletedStatus,
}

#[derive(Debug, Deserialize)]
struct RawDeletedStatus {
    id: Option<u64>,
    id_str: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWarning {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawDisconnect {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    reason: String,
}

fn pick_id(id_str: Option<String>, id: Option<u64>) -> Option<EventId> {
    id_str.map(EventId::new).or_else(|| id.map(EventId::from))
}

/// Decodes one line of the stream.
///
/// Returns `Ok(None)` for keep-alives and for documents that are neither a
/// status nor a known notice.
pub fn decode_line(line: &str) -> Result<Option<FeedMessage>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: RawLine = serde_json::from_str(line)?;

    if let Some(disconnect) = raw.disconnect {
        return Ok(Some(FeedMessage::Disconnect {
            code: disconnect.code,
            reason: disconnect.reason,
        }));
    }
    if let Some(limit) = raw.limit {
        return Ok(Some(FeedMessage::Limit {
            undelivered: limit.track,
        }));
    }
    if let Some(delete) = raw.delete {
        let id = pick_id(delete.status.id_str, delete.status.id)
            .ok_or(ParseError::MissingField("id"))?;
        return Ok(Some(FeedMessage::Delete { id }));
    }
    if let Some(warning) = raw.warning {
        return Ok(Some(FeedMessage::Warning {
            code: warning.code,
            message: warning.message,
        }));
    }

    let Some(id) = pick_id(raw.id_str, raw.id) else {
        return Ok(None);
    };
    let text = raw
        .extended_tweet
        .and_then(|e| e.full_text)
        .or(raw.full_text)
        .or(raw.text)
        .ok_or(ParseError::MissingField("text"))?;

    let event = if raw.retweeted_status.is_some() {
        InboundEvent::reshare(id, text)
    } else {
        InboundEvent::new(id, text)
    };
    Ok(Some(FeedMessage::Event(event)))
}

/// Splits a byte stream into newline-terminated lines.
///
/// Chunks arrive at arbitrary boundaries; a partial trailing line is held
/// until the rest of it arrives, up to `max_len` bytes.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_len(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(max_len: usize) -> Self {
        LineBuffer {
            pending: Vec::new(),
            max_len,
        }
    }

    /// Appends a chunk of bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Removes and returns the next complete line, without its terminator.
    ///
    /// Fails once a line, complete or not, grows past the limit.
    pub fn next_line(&mut self) -> Result<Option<String>, ParseError> {
        let newline = self.pending.iter().position(|&b| b == b'\n');
        let len = newline.unwrap_or(self.pending.len());
        if len > self.max_len {
            return Err(ParseError::LineTooLong {
                len,
                max: self.max_len,
            });
        }
        let Some(end) = newline else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
