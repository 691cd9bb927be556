use crate::error::Result;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod file;
pub mod memory;

pub use file::FileSettings;
pub use memory::MemorySettings;

/// The two persisted values the update check owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheEntry {
    #[serde(rename = "LastCheckedForUpdate")]
    pub last_checked_for_update: Timestamp,
    #[serde(rename = "IsUpdateAvailable")]
    pub is_update_available: bool,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            last_checked_for_update: Timestamp::UNIX_EPOCH,
            is_update_available: false,
        }
    }
}

impl CacheEntry {
    pub fn new(last_checked_for_update: Timestamp, is_update_available: bool) -> Self {
        Self {
            last_checked_for_update,
            is_update_available,
        }
    }

    /// True while `last_checked + window >= now`. A timestamp in the future counts as fresh.
    pub fn is_fresh(&self, now: Timestamp, window: Duration) -> bool {
        let elapsed = now.duration_since(self.last_checked_for_update);
        let window = SignedDuration::try_from(window).unwrap_or(SignedDuration::MAX);
        elapsed <= window
    }
}

/// Persistent home of the [`CacheEntry`].
///
/// `set` only stages a value; nothing is durable until `save` succeeds.
pub trait SettingsStore: Send {
    fn get(&self) -> Result<CacheEntry>;

    fn set(&mut self, entry: CacheEntry);

    fn save(&mut self) -> Result<()>;
}
