//! Trigger phrase file loading and reloading.
//!
//! Phrases are read once at startup. A running bot picks up edits only when
//! asked to: on unix, sending `SIGHUP` re-reads the file and publishes the new
//! set to the listener, which swaps it in before the next event.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::filter::PhraseSet;

use super::ConfigError;

/// A newline-delimited phrase file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseSource {
    path: PathBuf,
}

impl PhraseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PhraseSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file into a phrase set.
    ///
    /// An empty set is not an error (the bot will simply never match), but it
    /// is almost certainly a mistake, so it is logged.
    pub fn load(&self) -> Result<PhraseSet, ConfigError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let phrases = PhraseSet::from_lines(&contents);
        if phrases.is_empty() {
            warn!(path = %self.path.display(), "Phrase file contains no phrases");
        }
        Ok(phrases)
    }

    /// Re-reads the file and publishes the result.
    ///
    /// A failed read keeps the previously published set.
    pub fn reload_into(&self, tx: &watch::Sender<PhraseSet>) -> Result<usize, ConfigError> {
        let phrases = self.load()?;
        let count = phrases.len();
        tx.send_replace(phrases);
        Ok(count)
    }
}

/// Re-reads the phrase file every time the process receives `SIGHUP`.
///
/// Runs until the shutdown token is cancelled.
#[cfg(unix)]
pub async fn reload_on_hangup(
    source: PhraseSource,
    tx: watch::Sender<PhraseSet>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            received = hangup.recv() => {
                if received.is_none() {
                    return Ok(());
                }
                match source.reload_into(&tx) {
                    Ok(count) => info!(phrases = count, "Reloaded trigger phrases"),
                    Err(e) => warn!(error = %e, "Phrase reload failed, keeping current phrases"),
                }
            }
        }
    }
}
