//! Deduplication of trigger matches.
//!
//! The feed may deliver the same message more than once (reconnects replay
//! recent traffic, and the same text can be matched by several server-side
//! keywords). Each message identifier is acted on at most once per process
//! lifetime.
//!
//! # Single writer
//!
//! The [`SeenSet`] is owned by the [`DedupFilter`], which is owned by the
//! listener. Events are processed one at a time, so recording an identifier
//! and enqueueing its event happen as one step without any lock.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::types::{EventId, InboundEvent};
use crate::worker::ActionQueue;

use super::matcher::PhraseSet;

/// Identifiers already dispatched to the action queue.
///
/// Grows monotonically and is never persisted; a restart starts empty.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    seen: HashMap<EventId, DateTime<Utc>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the identifier has already been dispatched.
    pub fn contains(&self, id: &EventId) -> bool {
        self.seen.contains_key(id)
    }

    /// Records an identifier with the current timestamp.
    ///
    /// Returns `false` if it was already present, in which case the original
    /// timestamp is kept.
    pub fn mark_seen(&mut self, id: &EventId) -> bool {
        if self.seen.contains_key(id) {
            return false;
        }
        self.seen.insert(id.clone(), Utc::now());
        true
    }

    /// Returns when the identifier was first dispatched.
    pub fn first_seen(&self, id: &EventId) -> Option<DateTime<Utc>> {
        self.seen.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Why an event was or was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Matches a trigger phrase, is original, and is new.
    Accept,

    /// Text does not contain any trigger phrase.
    NoMatch,

    /// The event republishes another event.
    Reshare,

    /// Already dispatched earlier in this process lifetime.
    Duplicate,
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accept => "accept",
            Verdict::NoMatch => "no_match",
            Verdict::Reshare => "reshare",
            Verdict::Duplicate => "duplicate",
        };
        write!(f, "{}", s)
    }
}

/// Classifies an event against the phrase set and the seen identifiers.
pub fn evaluate(event: &InboundEvent, seen: &SeenSet, phrases: &PhraseSet) -> Verdict {
    if event.is_reshare {
        Verdict::Reshare
    } else if seen.contains(&event.id) {
        Verdict::Duplicate
    } else if !phrases.matches(&event.text) {
        Verdict::NoMatch
    } else {
        Verdict::Accept
    }
}

/// Returns true iff the event matches, is not a reshare, and is unseen.
pub fn should_act(event: &InboundEvent, seen: &SeenSet, phrases: &PhraseSet) -> bool {
    evaluate(event, seen, phrases).is_accept()
}

/// Phrase matcher plus seen-identifier tracking.
#[derive(Debug, Clone, Default)]
pub struct DedupFilter {
    phrases: PhraseSet,
    seen: SeenSet,
}

impl DedupFilter {
    pub fn new(phrases: PhraseSet) -> Self {
        DedupFilter {
            phrases,
            seen: SeenSet::new(),
        }
    }

    /// Classifies an event without recording anything.
    pub fn evaluate(&self, event: &InboundEvent) -> Verdict {
        evaluate(event, &self.seen, &self.phrases)
    }

    /// Returns true if the event should be forwarded to the worker.
    pub fn should_act(&self, event: &InboundEvent) -> bool {
        should_act(event, &self.seen, &self.phrases)
    }

    /// Forwards the event to the queue if it should be acted on.
    ///
    /// On acceptance the identifier is recorded and the event is enqueued in
    /// the same call; there is no path that does one without the other.
    pub fn admit(&mut self, event: InboundEvent, queue: &ActionQueue) -> Verdict {
        let verdict = self.evaluate(&event);
        if verdict.is_accept() && self.seen.mark_seen(&event.id) {
            queue.push(event);
        }
        verdict
    }

    /// Swaps in a new phrase set. Seen identifiers are kept.
    pub fn replace_phrases(&mut self, phrases: PhraseSet) {
        self.phrases = phrases;
    }

    pub fn phrases(&self) -> &PhraseSet {
        &self.phrases
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }
}
