//! Seams between the core and the outside world.
//!
//! The listener, worker and supervisor are written against these traits so
//! tests can drive them with scripted feeds and recording reactors instead of
//! a live endpoint.

use std::future::Future;
use std::sync::Arc;

use futures::stream::BoxStream;

use crate::types::{EventId, FeedMessage};

use super::error::{FeedError, ReactionError};

/// An open feed connection.
///
/// Ends normally when upstream closes the connection, or with an error item
/// when it breaks.
pub type FeedConnection = BoxStream<'static, Result<FeedMessage, FeedError>>;

/// Opens filtered feed connections.
pub trait FeedClient {
    /// Connects to the feed, asking upstream to deliver only messages that
    /// contain one of the `track` keywords.
    fn connect(
        &self,
        track: &[String],
    ) -> impl Future<Output = Result<FeedConnection, FeedError>> + Send;
}

/// Performs the reaction (a boost) on a message.
pub trait Reactor {
    /// Boosts the message with the given identifier.
    fn react(&self, id: &EventId) -> impl Future<Output = Result<(), ReactionError>> + Send;
}

impl<T: FeedClient> FeedClient for Arc<T> {
    fn connect(
        &self,
        track: &[String],
    ) -> impl Future<Output = Result<FeedConnection, FeedError>> + Send {
        (**self).connect(track)
    }
}
