//! Newtype wrappers for feed identifiers.
//!
//! Feed identifiers are opaque: the bot never does arithmetic on them, it only
//! compares them for deduplication and hands them back to the reaction call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier of an inbound feed message.
///
/// Unique per source message. Numeric identifiers are kept in their decimal
/// string form so that values above 2^53 survive JSON decoding intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(s: impl Into<String>) -> Self {
        EventId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        EventId(s)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

impl From<u64> for EventId {
    fn from(n: u64) -> Self {
        EventId(n.to_string())
    }
}
