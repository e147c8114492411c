//! Rate-limited action worker.
//!
//! A single long-lived task that drains the action queue at most one event per
//! wait interval and performs the boost for it.
//!
//! # Loop
//!
//! 1. Wait out the pacing interval (cut short only by shutdown)
//! 2. Pop one event; if the queue is empty, go back to 1
//! 3. Perform the reaction and log the outcome
//!
//! Because the wait always precedes the pop, two reactions are never closer
//! together than one interval, however long the backlog.
//!
//! # Failures
//!
//! Reaction failures never stop the worker. Failures whose text contains a
//! whitelisted substring (the message is gone, say) are logged at info; the
//! rest at warn. A panic inside the reactor is caught and logged as an error.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::feed::{ReactionError, Reactor};
use crate::supervisor::Whitelist;
use crate::types::{EventId, InboundEvent};

use super::queue::ActionQueue;

/// What happened when the worker acted on an event.
#[derive(Debug)]
pub enum ReactionOutcome {
    /// The reaction succeeded.
    Boosted,

    /// The reaction failed in a known-benign way.
    Absorbed(ReactionError),

    /// The reaction failed in an unrecognised way.
    Failed(ReactionError),

    /// The reactor panicked; carries the panic message.
    Panicked(String),
}

impl ReactionOutcome {
    pub fn is_boosted(&self) -> bool {
        matches!(self, ReactionOutcome::Boosted)
    }
}

/// Drains the action queue at a bounded rate.
pub struct ActionWorker<R> {
    reactor: Arc<R>,
    queue: ActionQueue,
    wait_interval: Duration,
    whitelist: Whitelist,
}

impl<R> ActionWorker<R>
where
    R: Reactor + Send + Sync + 'static,
{
    pub fn new(reactor: Arc<R>, queue: ActionQueue, wait_interval: Duration) -> Self {
        ActionWorker {
            reactor,
            queue,
            wait_interval,
            whitelist: Whitelist::reaction(),
        }
    }

    /// Replaces the reaction whitelist.
    pub fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn wait_interval(&self) -> Duration {
        self.wait_interval
    }

    /// Runs until the shutdown token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            wait_secs = self.wait_interval.as_secs(),
            order = %self.queue.order(),
            "Action worker started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(pending = self.queue.len(), "Shutdown signal received, stopping worker");
                    break;
                }
                _ = tokio::time::sleep(self.wait_interval) => {}
            }

            let Some(event) = self.queue.try_pop() else {
                debug!("Action queue empty");
                continue;
            };

            let outcome = self.act(&event).await;
            log_outcome(&event.id, &outcome, self.queue.len());
        }
    }

    /// Performs the reaction for one event.
    pub async fn act(&self, event: &InboundEvent) -> ReactionOutcome {
        let result = AssertUnwindSafe(self.reactor.react(&event.id))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => ReactionOutcome::Boosted,
            Ok(Err(e)) if self.whitelist.matches(&e.to_string()) => ReactionOutcome::Absorbed(e),
            Ok(Err(e)) => ReactionOutcome::Failed(e),
            Err(payload) => ReactionOutcome::Panicked(panic_message(payload.as_ref())),
        }
    }
}

impl<R> std::fmt::Debug for ActionWorker<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionWorker")
            .field("queue", &self.queue)
            .field("wait_interval", &self.wait_interval)
            .field("whitelist", &self.whitelist)
            .finish_non_exhaustive()
    }
}

fn log_outcome(id: &EventId, outcome: &ReactionOutcome, pending: usize) {
    match outcome {
        ReactionOutcome::Boosted => info!(event_id = %id, pending, "Boosted"),
        ReactionOutcome::Absorbed(e) => {
            info!(event_id = %id, error = %e, "Reaction skipped (known condition)")
        }
        ReactionOutcome::Failed(e) => warn!(event_id = %id, error = %e, "Reaction failed"),
        ReactionOutcome::Panicked(msg) => {
            error!(event_id = %id, panic = %msg, "Reactor panicked")
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
