//! HTTP implementation of the feed seams.
//!
//! The filter stream is a long-lived POST whose response body never ends
//! while the connection is healthy. Reactions are single POSTs against the
//! REST API.
//!
//! Request signing is out of scope here: the access token is sent as a bearer
//! credential. Deployments that need signed requests put a signing proxy in
//! front and point `BOOST_BOT_STREAM_URL` / `BOOST_BOT_API_URL` at it.

use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::types::{EventId, FeedMessage};

use super::client::{FeedClient, FeedConnection, Reactor};
use super::error::{FeedError, ReactionError};
use super::parse::{LineBuffer, decode_line};

const DEFAULT_STREAM_URL: &str = "https://stream.twitter.com/1.1/statuses/filter.json";
const DEFAULT_API_URL: &str = "https://api.twitter.com/1.1";

/// Upper bound on a single reaction call. The stream itself has no timeout.
pub const DEFAULT_REACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Feed client and reactor backed by `reqwest`.
#[derive(Clone)]
pub struct HttpFeedClient {
    http: reqwest::Client,
    credentials: Credentials,
    stream_url: String,
    api_url: String,
    reaction_timeout: Duration,
}

impl HttpFeedClient {
    pub fn new(credentials: Credentials) -> Self {
        HttpFeedClient {
            http: reqwest::Client::new(),
            credentials,
            stream_url: DEFAULT_STREAM_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            reaction_timeout: DEFAULT_REACTION_TIMEOUT,
        }
    }

    /// Overrides the streaming endpoint.
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    /// Overrides the REST API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Overrides how long a reaction call may take before it fails.
    pub fn with_reaction_timeout(mut self, timeout: Duration) -> Self {
        self.reaction_timeout = timeout;
        self
    }

    fn reaction_url(&self, id: &EventId) -> String {
        format!(
            "{}/statuses/retweet/{}.json",
            self.api_url.trim_end_matches('/'),
            id
        )
    }
}

impl std::fmt::Debug for HttpFeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFeedClient")
            .field("stream_url", &self.stream_url)
            .field("api_url", &self.api_url)
            .field("reaction_timeout", &self.reaction_timeout)
            .finish_non_exhaustive()
    }
}

impl FeedClient for HttpFeedClient {
    async fn connect(&self, track: &[String]) -> Result<FeedConnection, FeedError> {
        let response = self
            .http
            .post(&self.stream_url)
            .bearer_auth(&self.credentials.access_token)
            .form(&[("track", track.join(","))])
            .send()
            .await
            .map_err(FeedError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            // Surface the status as an in-stream code first so the listener
            // sees it (and cools down on 420), then fail the connection.
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Feed connect rejected");
            let items = vec![
                Ok(FeedMessage::ErrorCode(status.as_u16())),
                Err(FeedError::upstream(status.as_u16(), &body)),
            ];
            return Ok(stream::iter(items).boxed());
        }

        debug!(url = %self.stream_url, keywords = track.len(), "Feed connected");
        Ok(line_stream(response))
    }
}

impl Reactor for HttpFeedClient {
    async fn react(&self, id: &EventId) -> Result<(), ReactionError> {
        let response = self
            .http
            .post(self.reaction_url(id))
            .bearer_auth(&self.credentials.access_token)
            .timeout(self.reaction_timeout)
            .send()
            .await
            .map_err(ReactionError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ReactionError::from_response(status.as_u16(), &body))
    }
}

/// Turns a streaming response body into decoded feed messages.
///
/// Undecodable lines are logged and skipped. A body read error or an
/// oversized line ends the stream after yielding it.
fn line_stream(response: reqwest::Response) -> FeedConnection {
    let initial = Some((response, LineBuffer::new()));
    stream::unfold(initial, |state| async move {
        let (mut response, mut buffer) = state?;
        loop {
            loop {
                let line = match buffer.next_line() {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => return Some((Err(FeedError::from(e)), None)),
                };
                match decode_line(&line) {
                    Ok(Some(message)) => return Some((Ok(message), Some((response, buffer)))),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Skipping undecodable feed line"),
                }
            }
            match response.chunk().await {
                Ok(Some(chunk)) => buffer.extend(&chunk),
                Ok(None) => return None,
                Err(e) => return Some((Err(FeedError::from_reqwest(e)), None)),
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_token_secret: "ats".to_string(),
        }
    }

    #[test]
    fn reaction_url_uses_api_base() {
        let client = HttpFeedClient::new(credentials()).with_api_url("http://localhost:8080/1.1/");
        assert_eq!(
            client.reaction_url(&EventId::new("42")),
            "http://localhost:8080/1.1/statuses/retweet/42.json"
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let client = HttpFeedClient::new(credentials()).with_stream_url("http://localhost/stream");
        let debug = format!("{:?}", client);
        assert!(debug.contains("http://localhost/stream"));
        assert!(!debug.contains("ats"));
    }

    // ─── Reaction timeout ───

    /// Accepts connections and never answers them.
    async fn silent_server() -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn default_reaction_timeout_is_one_minute() {
        let client = HttpFeedClient::new(credentials());
        assert_eq!(client.reaction_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn unresponsive_reaction_endpoint_times_out() {
        let (url, server) = silent_server().await;
        let client = HttpFeedClient::new(credentials())
            .with_api_url(url)
            .with_reaction_timeout(Duration::from_millis(200));

        let result =
            tokio::time::timeout(Duration::from_secs(10), client.react(&EventId::new("1"))).await;

        let err = result
            .expect("reaction call must not hang past its timeout")
            .unwrap_err();
        assert!(err.source.as_ref().is_some_and(|e| e.is_timeout()), "{}", err);
        server.abort();
    }

    // ─── Line framing ───

    #[tokio::test]
    async fn oversized_stream_line_fails_the_connection() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n")
                .await
                .unwrap();
            socket
                .write_all(&vec![b'a'; crate::feed::parse::MAX_LINE_BYTES + 1])
                .await
                .unwrap();
            // Hold the connection open: only the size limit can end the stream.
            std::future::pending::<()>().await;
        });

        let client = HttpFeedClient::new(credentials()).with_stream_url(format!("http://{}", addr));
        let connection = client.connect(&["music".to_string()]).await.unwrap();

        let items: Vec<_> = tokio::time::timeout(Duration::from_secs(10), connection.collect())
            .await
            .expect("stream must end once the line limit is exceeded");
        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind, crate::feed::FeedErrorKind::Decode);
        server.abort();
    }
}
