//! Shared test fakes for the feed seams.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use futures::StreamExt;
use futures::stream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::feed::{FeedClient, FeedConnection, FeedError, ReactionError, Reactor};
use crate::types::{EventId, FeedMessage, InboundEvent};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

/// One scripted response to `connect`.
pub enum ScriptedConnection {
    /// The connect call itself fails.
    Refuse(FeedError),

    /// The connect call succeeds and the stream yields these items, then ends.
    Stream(Vec<Result<FeedMessage, FeedError>>),
}

impl ScriptedConnection {
    /// A connection delivering the given events, then closing normally.
    pub fn events(events: impl IntoIterator<Item = InboundEvent>) -> Self {
        ScriptedConnection::Stream(events.into_iter().map(|e| Ok(FeedMessage::Event(e))).collect())
    }
}

/// A feed that replays scripted connections in order.
///
/// When the script runs out, the next connect cancels `done` and returns an
/// empty stream, so a supervisor under test stops deterministically.
pub struct ScriptedFeed {
    scripts: Mutex<VecDeque<ScriptedConnection>>,
    connects: Mutex<Vec<(Instant, Vec<String>)>>,
    done: CancellationToken,
}

impl ScriptedFeed {
    pub fn new(scripts: impl IntoIterator<Item = ScriptedConnection>, done: CancellationToken) -> Self {
        ScriptedFeed {
            scripts: Mutex::new(scripts.into_iter().collect()),
            connects: Mutex::new(Vec::new()),
            done,
        }
    }

    /// When each connect call happened.
    pub fn connect_times(&self) -> Vec<Instant> {
        lock(&self.connects).iter().map(|(at, _)| *at).collect()
    }

    /// The track keywords passed to each connect call.
    pub fn tracks(&self) -> Vec<Vec<String>> {
        lock(&self.connects).iter().map(|(_, t)| t.clone()).collect()
    }
}

impl FeedClient for ScriptedFeed {
    async fn connect(&self, track: &[String]) -> Result<FeedConnection, FeedError> {
        lock(&self.connects).push((Instant::now(), track.to_vec()));
        let next = lock(&self.scripts).pop_front();
        match next {
            Some(ScriptedConnection::Refuse(e)) => Err(e),
            Some(ScriptedConnection::Stream(items)) => Ok(stream::iter(items).boxed()),
            None => {
                self.done.cancel();
                Ok(stream::empty().boxed())
            }
        }
    }
}

/// A reactor that records every call and fails or panics on request.
#[derive(Default)]
pub struct RecordingReactor {
    calls: Mutex<Vec<(EventId, Instant)>>,
    failures: Mutex<HashMap<EventId, String>>,
    panics: Mutex<HashSet<EventId>>,
}

impl RecordingReactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes reactions on `id` fail with the given upstream message.
    pub fn fail_with(&self, id: EventId, message: &str) {
        lock(&self.failures).insert(id, message.to_string());
    }

    /// Makes reactions on `id` panic.
    pub fn panic_on(&self, id: EventId) {
        lock(&self.panics).insert(id);
    }

    /// Identifiers reacted on, in call order.
    pub fn reacted_ids(&self) -> Vec<EventId> {
        lock(&self.calls).iter().map(|(id, _)| id.clone()).collect()
    }

    /// When each reaction happened, in call order.
    pub fn reaction_times(&self) -> Vec<Instant> {
        lock(&self.calls).iter().map(|(_, at)| *at).collect()
    }
}

impl Reactor for RecordingReactor {
    async fn react(&self, id: &EventId) -> Result<(), ReactionError> {
        lock(&self.calls).push((id.clone(), Instant::now()));
        let should_panic = lock(&self.panics).contains(id);
        if should_panic {
            panic!("scripted panic for event {}", id);
        }
        let failure = lock(&self.failures).get(id).cloned();
        match failure {
            Some(message) => Err(ReactionError::new(message)),
            None => Ok(()),
        }
    }
}
