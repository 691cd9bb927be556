use crate::error::{Result, UpdateError};
use crate::feed::LatestSelection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://api.github.com/repos/ViGEm/DsHidMini/releases";

/// The release API answers 403 to requests without a browser-like agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (Compatible; Windows NT 5.1; MSIE 6.0) \
     (compatible; MSIE 6.0; Windows NT 5.1; .NET CLR 1.1.4322; .NET CLR 2.0.50727)";

pub const DEFAULT_CACHE_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Matches reqwest's blocking client default.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A stuck request must not block a check for longer than a day.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

pub const MAX_CACHE_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Settings for the update checker and its release feed.
///
/// Every field is optional in TOML; missing ones take the defaults above.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CheckerConfig {
    pub feed_url: String,
    pub user_agent: String,
    pub cache_window_secs: u64,
    pub timeout_secs: u64,
    pub selection: LatestSelection,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            feed_url: DEFAULT_FEED_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_window_secs: DEFAULT_CACHE_WINDOW_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            selection: LatestSelection::default(),
        }
    }
}

impl CheckerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: CheckerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(UpdateError::Config(
                "user_agent must not be empty, the release feed rejects anonymous requests".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(UpdateError::Config("timeout_secs must be positive".into()));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(UpdateError::Config(format!(
                "timeout_secs must be at most {MAX_TIMEOUT_SECS}, got {}",
                self.timeout_secs
            )));
        }
        if self.cache_window_secs > MAX_CACHE_WINDOW_SECS {
            return Err(UpdateError::Config(format!(
                "cache_window_secs must be at most {MAX_CACHE_WINDOW_SECS}, got {}",
                self.cache_window_secs
            )));
        }
        Ok(())
    }

    /// Clamped to [`MAX_CACHE_WINDOW_SECS`] for configs built without `validate`.
    pub fn cache_window(&self) -> Duration {
        Duration::from_secs(self.cache_window_secs.min(MAX_CACHE_WINDOW_SECS))
    }

    /// Clamped to `1..=MAX_TIMEOUT_SECS` for configs built without `validate`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }
}
