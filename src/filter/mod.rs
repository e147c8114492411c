//! Deciding which feed events deserve a reaction.
//!
//! - [`matcher`]: case-insensitive trigger phrase matching
//! - [`dedupe`]: seen-identifier tracking and the accept/record/enqueue step

pub mod dedupe;
pub mod matcher;

pub use dedupe::{DedupFilter, SeenSet, Verdict, evaluate, should_act};
pub use matcher::{PhraseSet, matches};
