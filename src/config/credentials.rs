//! Feed credentials.
//!
//! Four opaque secrets read once at startup from a JSON file:
//!
//! ```json
//! {
//!   "consumer_key": "...",
//!   "consumer_secret": "...",
//!   "access_token": "...",
//!   "access_token_secret": "..."
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Secrets needed to open the feed connection and perform reactions.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    /// Reads and validates a credentials file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let credentials: Credentials =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Credentials {
                path: path.to_path_buf(),
                source,
            })?;
        credentials.validate()?;
        Ok(credentials)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some(&(name, _)) => Err(ConfigError::EmptyCredential(name)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}
