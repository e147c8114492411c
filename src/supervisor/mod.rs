//! Reconnect/backoff supervisor.
//!
//! Keeps the listener attached to the feed for as long as the process runs.
//! Each pass opens a connection with the track keywords, hands it to the
//! listener, and when the connection ends picks a delay before the next
//! pass:
//!
//! | How the connection ended | Delay | Log level |
//! |---|---|---|
//! | closed normally by upstream | fast | info |
//! | failure classified `FastRetry` | fast | info |
//! | failure classified `SlowRetry` or `Unknown` | slow | warn |
//!
//! There is no retry limit. Only the shutdown token ends the loop.

pub mod classify;


use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::feed::{FeedClient, FeedError};
use crate::listener::EventListener;

pub use classify::{ErrorClass, ReconnectPolicy, Whitelist, classify};

/// How a single connection attempt ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Upstream closed the stream without an error.
    Closed,

    /// Connecting or reading failed.
    Failed { class: ErrorClass, error: FeedError },

    /// The shutdown token was cancelled.
    Cancelled,
}

/// Owns the listener and reconnects it to the feed indefinitely.
pub struct Supervisor<F> {
    feed: F,
    listener: EventListener,
    track: Vec<String>,
    policy: ReconnectPolicy,
    whitelist: Whitelist,
}

impl<F: FeedClient> Supervisor<F> {
    pub fn new(feed: F, listener: EventListener, track: Vec<String>, policy: ReconnectPolicy) -> Self {
        Supervisor {
            feed,
            listener,
            track,
            policy,
            whitelist: Whitelist::reconnect(),
        }
    }

    /// Replaces the reconnect whitelist.
    pub fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn listener(&self) -> &EventListener {
        &self.listener
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Runs connection attempts until the shutdown token is cancelled.
    pub async fn run(&mut self, shutdown: &CancellationToken) {
        info!(keywords = ?self.track, "Supervisor started");

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let delay = match self.run_session(attempt, shutdown).await {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed => {
                    info!(
                        delay_secs = self.policy.fast_delay.as_secs(),
                        "Feed closed, reconnecting"
                    );
                    self.policy.fast_delay
                }
                SessionEnd::Failed { class, error } => {
                    let delay = self.policy.delay_for(class);
                    if class.is_fast() {
                        info!(
                            class = %class,
                            error = %error,
                            delay_secs = delay.as_secs(),
                            "Feed connection dropped, reconnecting"
                        );
                    } else {
                        warn!(
                            class = %class,
                            kind = %error.kind,
                            error = %error,
                            delay_secs = delay.as_secs(),
                            "Feed connection failed, backing off"
                        );
                    }
                    delay
                }
            };

            if !sleep_or_cancel(delay, shutdown).await {
                break;
            }
        }

        info!(attempts = attempt, "Supervisor stopped");
    }

    /// Connects once and runs the listener until the connection ends.
    #[instrument(skip(self, shutdown))]
    pub async fn run_session(&mut self, attempt: u64, shutdown: &CancellationToken) -> SessionEnd {
        if shutdown.is_cancelled() {
            return SessionEnd::Cancelled;
        }

        let connected = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return SessionEnd::Cancelled,
            connected = self.feed.connect(&self.track) => connected,
        };
        let connection = match connected {
            Ok(connection) => connection,
            Err(error) => return self.failed(error),
        };
        debug!("Feed connection open");

        let result = self.listener.run(connection, shutdown).await;
        if shutdown.is_cancelled() {
            return SessionEnd::Cancelled;
        }
        match result {
            Ok(()) => SessionEnd::Closed,
            Err(error) => self.failed(error),
        }
    }

    fn failed(&self, error: FeedError) -> SessionEnd {
        SessionEnd::Failed {
            class: classify(&error, &self.whitelist),
            error,
        }
    }
}

impl<F> std::fmt::Debug for Supervisor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("listener", &self.listener)
            .field("track", &self.track)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Sleeps for `delay`. Returns false if shutdown was requested first.
async fn sleep_or_cancel(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
