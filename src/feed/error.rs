//! Feed and reaction error types.
//!
//! Errors carry a coarse kind for typed classification plus the full message
//! of the underlying failure. The message matters: recovery also matches
//! known-benign substrings against it (see [`crate::supervisor::classify`]), so it is
//! built from the whole source chain, not just the outermost error. An
//! `io::Error` saying "Connection reset by peer" is usually three levels
//! below the `reqwest::Error` that reaches us.

use std::error::Error as StdError;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use super::parse::ParseError;

/// The kind of feed connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// The remote end reset the TCP connection.
    ConnectionReset,

    /// Upstream is rate limiting this client (HTTP 420 or 429).
    RateLimited,

    /// Upstream closed the stream with a disconnect notice.
    Disconnected,

    /// Network-level failure: DNS, connect, TLS, timeout, broken body.
    Transport,

    /// Upstream answered the connect request with an unexpected status.
    Upstream,

    /// The stream sent data that cannot be framed into lines.
    Decode,
}

impl FeedErrorKind {
    /// A short stable name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedErrorKind::ConnectionReset => "connection_reset",
            FeedErrorKind::RateLimited => "rate_limited",
            FeedErrorKind::Disconnected => "disconnected",
            FeedErrorKind::Transport => "transport",
            FeedErrorKind::Upstream => "upstream",
            FeedErrorKind::Decode => "decode",
        }
    }

    fn from_status(status: u16) -> Self {
        match status {
            420 | 429 => FeedErrorKind::RateLimited,
            _ => FeedErrorKind::Upstream,
        }
    }
}

impl fmt::Display for FeedErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure to open or keep reading a feed connection.
#[derive(Debug, Error)]
pub struct FeedError {
    /// What went wrong, coarsely.
    pub kind: FeedErrorKind,

    /// The HTTP status code, if the failure was an HTTP response.
    pub status_code: Option<u16>,

    /// The full description, including every source in the chain.
    pub message: String,

    /// The underlying HTTP client error, if available.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "feed error (HTTP {}): {}", code, self.message),
            None => write!(f, "feed error: {}", self.message),
        }
    }
}

impl FeedError {
    /// Creates an error without an underlying HTTP client error.
    pub fn new(kind: FeedErrorKind, message: impl Into<String>) -> Self {
        FeedError {
            kind,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error for an unexpected connect response.
    pub fn upstream(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("connect rejected with status {}", status)
        } else {
            body.to_string()
        };
        FeedError {
            kind: FeedErrorKind::from_status(status),
            status_code: Some(status),
            message,
            source: None,
        }
    }

    /// Creates an error for an upstream disconnect notice.
    pub fn disconnected(code: u16, reason: &str) -> Self {
        Self::new(
            FeedErrorKind::Disconnected,
            format!("stream disconnected by upstream (code {}): {}", code, reason),
        )
    }

    /// Categorizes an HTTP client error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let kind = if is_connection_reset(&err) {
            FeedErrorKind::ConnectionReset
        } else if let Some(status) = status_code {
            FeedErrorKind::from_status(status)
        } else {
            FeedErrorKind::Transport
        };
        FeedError {
            kind,
            status_code,
            message: chain_message(&err),
            source: Some(err),
        }
    }
}

impl From<ParseError> for FeedError {
    fn from(err: ParseError) -> Self {
        FeedError::new(FeedErrorKind::Decode, err.to_string())
    }
}

/// A failed reaction call.
#[derive(Debug, Error)]
pub struct ReactionError {
    /// The HTTP status code, if the failure was an HTTP response.
    pub status_code: Option<u16>,

    /// The upstream application error code, if one was reported.
    pub code: Option<u32>,

    /// The upstream message, or the full client error chain.
    pub message: String,

    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for ReactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "reaction failed (HTTP {}): {}", status, self.message)?,
            None => write!(f, "reaction failed: {}", self.message)?,
        }
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawErrorBody {
    errors: Vec<RawErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct RawErrorEntry {
    code: Option<u32>,
    message: String,
}

impl ReactionError {
    pub fn new(message: impl Into<String>) -> Self {
        ReactionError {
            status_code: None,
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error from a non-success reaction response.
    ///
    /// Upstream error bodies look like
    /// `{"errors":[{"code":144,"message":"No status found with that ID."}]}`;
    /// the first entry is used. Anything else is kept verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<RawErrorBody>(body)
            .ok()
            .and_then(|b| b.errors.into_iter().next());
        let (code, message) = match parsed {
            Some(entry) => (entry.code, entry.message),
            None if body.trim().is_empty() => (None, format!("status {}", status)),
            None => (None, body.trim().to_string()),
        };
        ReactionError {
            status_code: Some(status),
            code,
            message,
            source: None,
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        ReactionError {
            status_code: err.status().map(|s| s.as_u16()),
            code: None,
            message: chain_message(&err),
            source: Some(err),
        }
    }
}

/// Joins an error and all of its sources into one line.
///
/// Sources whose text is already contained in the accumulated message are
/// skipped, since many wrappers repeat their inner error verbatim.
pub(crate) fn chain_message(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn is_connection_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>()
            && io.kind() == std::io::ErrorKind::ConnectionReset
        {
            return true;
        }
        source = cause.source();
    }
    false
}
