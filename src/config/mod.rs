//! Startup configuration.
//!
//! Everything the core needs from the outside world at startup:
//!
//! - [`credentials`]: the four feed secrets, from a JSON file
//! - [`phrases`]: the trigger phrase file and its reload hook
//! - [`AgentConfig`]: intervals, queue order and endpoints, with defaults
//!   that can be overridden through environment variables
//!
//! # Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `BOOST_BOT_COOLDOWN_SECS` | 60 |
//! | `BOOST_BOT_FAST_RETRY_SECS` | 30 |
//! | `BOOST_BOT_SLOW_RETRY_SECS` | 600 |
//! | `BOOST_BOT_QUEUE_ORDER` | `lifo` |
//! | `BOOST_BOT_TRACK` | the trigger phrases |
//! | `BOOST_BOT_STREAM_URL` | public filter stream |
//! | `BOOST_BOT_API_URL` | public REST API |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::worker::QueueOrder;

pub mod credentials;
pub mod phrases;

pub use credentials::Credentials;
#[cfg(unix)]
pub use phrases::reload_on_hangup;
pub use phrases::PhraseSource;

/// Default pacing interval between reactions (just over five minutes).
pub const DEFAULT_WAIT_SECS: u64 = 301;

/// Default intake pause after an upstream rate-limit code.
const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Default reconnect delay after a benign connection failure.
const DEFAULT_FAST_RETRY_SECS: u64 = 30;

/// Default reconnect delay after an unrecognised connection failure.
const DEFAULT_SLOW_RETRY_SECS: u64 = 600;

/// Errors raised while loading startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials file {}: {source}", .path.display())]
    Credentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("credential {0} is empty")]
    EmptyCredential(&'static str),
}

/// Runtime settings for the listener, worker and supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Minimum time between two reactions.
    pub wait_interval: Duration,

    /// How long the listener stops reading after a rate-limit code.
    pub cooldown: Duration,

    /// Reconnect delay after a whitelisted connection failure.
    pub fast_retry_delay: Duration,

    /// Reconnect delay after any other connection failure.
    pub slow_retry_delay: Duration,

    /// Discipline of the action queue.
    pub queue_order: QueueOrder,

    /// Server-side keyword filter. `None` means "use the trigger phrases".
    pub track: Option<Vec<String>>,

    /// Override for the streaming endpoint.
    pub stream_url: Option<String>,

    /// Override for the REST endpoint used for reactions.
    pub api_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_WAIT_SECS))
    }
}

impl AgentConfig {
    /// Creates a configuration with default values and the given pacing interval.
    pub fn new(wait_interval: Duration) -> Self {
        AgentConfig {
            wait_interval,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            fast_retry_delay: Duration::from_secs(DEFAULT_FAST_RETRY_SECS),
            slow_retry_delay: Duration::from_secs(DEFAULT_SLOW_RETRY_SECS),
            queue_order: QueueOrder::default(),
            track: None,
            stream_url: None,
            api_url: None,
        }
    }

    /// Creates a configuration from the process environment.
    pub fn from_env(wait_interval: Duration) -> Self {
        Self::from_lookup(wait_interval, |key| std::env::var(key).ok())
    }

    /// Creates a configuration, reading overrides through `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_lookup(wait_interval: Duration, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::new(wait_interval);

        let secs = |key: &str, default: Duration| {
            parse_or_default::<u64>(&lookup, key)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let track = lookup("BOOST_BOT_TRACK")
            .map(|raw| {
                raw.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|keywords| !keywords.is_empty());

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        AgentConfig {
            wait_interval,
            cooldown: secs("BOOST_BOT_COOLDOWN_SECS", defaults.cooldown),
            fast_retry_delay: secs("BOOST_BOT_FAST_RETRY_SECS", defaults.fast_retry_delay),
            slow_retry_delay: secs("BOOST_BOT_SLOW_RETRY_SECS", defaults.slow_retry_delay),
            queue_order: parse_or_default(&lookup, "BOOST_BOT_QUEUE_ORDER")
                .unwrap_or(defaults.queue_order),
            track,
            stream_url: non_empty("BOOST_BOT_STREAM_URL"),
            api_url: non_empty("BOOST_BOT_API_URL"),
        }
    }

    /// Returns the server-side keyword list, falling back to the given phrases.
    pub fn track_keywords(&self, phrases: &[String]) -> Vec<String> {
        self.track.clone().unwrap_or_else(|| phrases.to_vec())
    }
}

fn parse_or_default<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}
