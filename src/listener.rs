//! Event listener.
//!
//! Consumes one feed connection at a time, message by message. Events go
//! through the dedup filter; accepted ones land on the action queue. Feed
//! control messages are handled here:
//!
//! - error code 420: upstream is rate limiting us; stop reading for the
//!   cooldown, then carry on with the same connection
//! - any other error code, limit and warning notices: logged
//! - disconnect notice: the connection is over, reported as a [`FeedError`]
//!
//! The listener outlives its connections. The supervisor hands it each new
//! connection, so identifiers seen before a reconnect stay seen after it.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::feed::{FeedConnection, FeedError};
use crate::filter::{DedupFilter, PhraseSet, Verdict};
use crate::types::{FeedMessage, InboundEvent, RATE_LIMITED_CODE};
use crate::worker::ActionQueue;

/// Filters feed events onto the action queue.
#[derive(Debug)]
pub struct EventListener {
    filter: DedupFilter,
    queue: ActionQueue,
    cooldown: Duration,
    phrase_updates: Option<watch::Receiver<PhraseSet>>,
}

impl EventListener {
    pub fn new(filter: DedupFilter, queue: ActionQueue, cooldown: Duration) -> Self {
        EventListener {
            filter,
            queue,
            cooldown,
            phrase_updates: None,
        }
    }

    /// Swaps in phrase sets published on `updates` before each event.
    pub fn with_phrase_updates(mut self, updates: watch::Receiver<PhraseSet>) -> Self {
        self.phrase_updates = Some(updates);
        self
    }

    pub fn filter(&self) -> &DedupFilter {
        &self.filter
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    /// Reads the connection until it ends, fails, or shutdown is requested.
    ///
    /// Returns `Ok(())` when upstream closes the stream normally or the token
    /// is cancelled.
    pub async fn run(
        &mut self,
        mut connection: FeedConnection,
        shutdown: &CancellationToken,
    ) -> Result<(), FeedError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                next = connection.next() => next,
            };
            match next {
                Some(Ok(message)) => self.handle(message, shutdown).await?,
                Some(Err(e)) => return Err(e),
                None => {
                    debug!("Feed connection closed by upstream");
                    return Ok(());
                }
            }
        }
    }

    /// Handles a single feed message.
    pub async fn handle(
        &mut self,
        message: FeedMessage,
        shutdown: &CancellationToken,
    ) -> Result<(), FeedError> {
        match message {
            FeedMessage::Event(event) => self.on_event(event),
            FeedMessage::ErrorCode(RATE_LIMITED_CODE) => {
                error!(
                    code = RATE_LIMITED_CODE,
                    cooldown_secs = self.cooldown.as_secs(),
                    "Getting rate limited, pausing intake"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(self.cooldown) => {
                        info!("Rate-limit cooldown over, resuming intake");
                    }
                }
            }
            FeedMessage::ErrorCode(code) => {
                warn!(code, "Feed reported an error code");
            }
            FeedMessage::Limit { undelivered } => {
                debug!(undelivered, "Feed limit notice");
            }
            FeedMessage::Delete { id } => {
                debug!(event_id = %id, "Ignoring delete notice");
            }
            FeedMessage::Warning { code, message } => {
                warn!(code = %code, message = %message, "Feed warning");
            }
            FeedMessage::Disconnect { code, reason } => {
                return Err(FeedError::disconnected(code, &reason));
            }
        }
        Ok(())
    }

    fn on_event(&mut self, event: InboundEvent) {
        self.apply_phrase_update();

        let id = event.id.clone();
        match self.filter.admit(event, &self.queue) {
            Verdict::Accept => info!(event_id = %id, queued = self.queue.len(), "Queued match"),
            Verdict::Duplicate => debug!(
                event_id = %id,
                first_seen = ?self.filter.seen().first_seen(&id),
                "Skipped duplicate event"
            ),
            verdict => debug!(event_id = %id, verdict = %verdict, "Skipped event"),
        }
    }

    fn apply_phrase_update(&mut self) {
        let Some(updates) = self.phrase_updates.as_mut() else {
            return;
        };
        if !updates.has_changed().unwrap_or(false) {
            return;
        }
        let phrases = updates.borrow_and_update().clone();
        info!(phrases = phrases.len(), "Applied new trigger phrases");
        self.filter.replace_phrases(phrases);
    }
}
