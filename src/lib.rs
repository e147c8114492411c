//! Boost Bot - watches a live message feed for trigger phrases and boosts
//! matching messages at a bounded rate.
//!
//! The pipeline is feed → [`listener`] (with the [`filter`]) → action queue →
//! [`worker`] → reaction call, kept alive across network failures by the
//! [`supervisor`].

pub mod config;
pub mod feed;
pub mod filter;
pub mod listener;
pub mod supervisor;
pub mod types;
pub mod worker;

#[cfg(test)]
mod test_utils;
