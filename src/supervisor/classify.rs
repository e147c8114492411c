//! Failure classification for reconnects and reactions.
//!
//! Typed kinds decide first. Anything the kind does not settle is matched
//! against a whitelist of known-benign substrings of the error's display
//! text. Matching is case-sensitive, because the substrings are copied
//! verbatim from upstream messages.
//!
//! | Class | Reconnect delay |
//! |---|---|
//! | `FastRetry` | fast (30 s default) |
//! | `SlowRetry` | slow (600 s default) |
//! | `Unknown` | slow (600 s default) |

use std::fmt;
use std::time::Duration;

use crate::config::AgentConfig;
use crate::feed::{FeedError, FeedErrorKind};

/// Benign reconnect failures.
pub const RECONNECT_WHITELIST: &[&str] = &["No status found with that ID", "Connection reset by peer"];

/// Benign reaction failures.
pub const REACTION_WHITELIST: &[&str] = &["No status found with that ID"];

/// How a failure should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Known benign; reconnect soon.
    FastRetry,

    /// Known to need a long pause, e.g. upstream rate limiting.
    SlowRetry,

    /// Not recognised. Treated like `SlowRetry`.
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::FastRetry => "fast_retry",
            ErrorClass::SlowRetry => "slow_retry",
            ErrorClass::Unknown => "unknown",
        }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, ErrorClass::FastRetry)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substrings that mark an error as benign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitelist {
    patterns: Vec<String>,
}

impl Whitelist {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Whitelist {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// The whitelist applied to feed connection failures.
    pub fn reconnect() -> Self {
        Self::new(RECONNECT_WHITELIST.iter().copied())
    }

    /// The whitelist applied to reaction failures.
    pub fn reaction() -> Self {
        Self::new(REACTION_WHITELIST.iter().copied())
    }

    /// Returns true if any pattern occurs in the message, case-sensitively.
    pub fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| message.contains(p.as_str()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Classifies a feed failure.
pub fn classify(err: &FeedError, whitelist: &Whitelist) -> ErrorClass {
    match err.kind {
        FeedErrorKind::ConnectionReset => ErrorClass::FastRetry,
        FeedErrorKind::RateLimited => ErrorClass::SlowRetry,
        _ if whitelist.matches(&err.to_string()) => ErrorClass::FastRetry,
        _ => ErrorClass::Unknown,
    }
}

/// Reconnect delays per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after a benign failure or a normally closed connection.
    pub fast_delay: Duration,

    /// Delay after any other failure.
    pub slow_delay: Duration,
}

impl ReconnectPolicy {
    pub const DEFAULT: Self = Self {
        fast_delay: Duration::from_secs(30),
        slow_delay: Duration::from_secs(600),
    };

    pub fn from_config(config: &AgentConfig) -> Self {
        ReconnectPolicy {
            fast_delay: config.fast_retry_delay,
            slow_delay: config.slow_retry_delay,
        }
    }

    pub fn delay_for(&self, class: ErrorClass) -> Duration {
        match class {
            ErrorClass::FastRetry => self.fast_delay,
            ErrorClass::SlowRetry | ErrorClass::Unknown => self.slow_delay,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
