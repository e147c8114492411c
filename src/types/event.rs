//! Inbound feed messages.
//!
//! A feed connection yields a sequence of [`FeedMessage`]s. Most are
//! [`InboundEvent`]s; the rest are control notices the listener reacts to
//! (rate-limit error codes, disconnects) or merely logs.

use super::ids::EventId;

/// A message received from the feed.
///
/// Immutable once received. Only events whose body matches a trigger phrase,
/// that are not reshares, and that have not been seen before are acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Unique identifier of the source message.
    pub id: EventId,

    /// Body text.
    pub text: String,

    /// Whether this event republishes another event.
    pub is_reshare: bool,
}

impl InboundEvent {
    /// Creates an original (non-reshare) event.
    pub fn new(id: impl Into<EventId>, text: impl Into<String>) -> Self {
        InboundEvent {
            id: id.into(),
            text: text.into(),
            is_reshare: false,
        }
    }

    /// Creates a reshare of another event.
    pub fn reshare(id: impl Into<EventId>, text: impl Into<String>) -> Self {
        InboundEvent {
            is_reshare: true,
            ..Self::new(id, text)
        }
    }
}

/// One item delivered on a feed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// A message that may trigger a reaction.
    Event(InboundEvent),

    /// A connection-level error code from upstream (e.g. 420 for rate limiting).
    ///
    /// The connection stays open; the listener decides whether to pause.
    ErrorCode(u16),

    /// Upstream matched more messages than it delivered.
    Limit {
        /// Number of undelivered messages since the connection opened.
        undelivered: u64,
    },

    /// A previously delivered message was deleted upstream.
    Delete { id: EventId },

    /// Upstream warns that the connection is at risk (e.g. falling behind).
    Warning { code: String, message: String },

    /// Upstream is closing the connection.
    Disconnect { code: u16, reason: String },
}

/// Connection-level code sent by upstream when the client is being rate limited.
pub const RATE_LIMITED_CODE: u16 = 420;
