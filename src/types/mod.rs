//! Core domain types for the boost bot.

pub mod event;
pub mod ids;

pub use event::{FeedMessage, InboundEvent, RATE_LIMITED_CODE};
pub use ids::EventId;
