//! Feed connection and reaction calls.
//!
//! - [`client`]: the `FeedClient` and `Reactor` traits the core is written against
//! - [`error`]: feed and reaction error types
//! - [`parse`]: decoding of streamed lines into [`FeedMessage`](crate::types::FeedMessage)s
//! - [`http`]: the `reqwest` implementation used in production

pub mod client;
pub mod error;
pub mod http;
pub mod parse;

pub use client::{FeedClient, FeedConnection, Reactor};
pub use error::{FeedError, FeedErrorKind, ReactionError};
pub use http::HttpFeedClient;
pub use parse::{LineBuffer, ParseError, decode_line};
