//! Once-a-day update availability check.
//!
//! [`UpdateChecker`] compares the running application's [`Version`] with the
//! newest release published on a [`ReleaseFeed`], caching the answer in a
//! [`SettingsStore`] so the feed is queried at most once per cache window.
//! Failures never reach the caller of [`UpdateChecker::is_update_available`];
//! they are logged and reported as "no update".

pub mod checker;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod settings;
pub mod version;

pub use checker::{CheckOutcome, UpdateChecker};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CheckerConfig;
pub use error::{CheckStage, Result, UpdateError};
pub use feed::{GitHubReleaseFeed, LatestSelection, Release, ReleaseFeed};
pub use settings::{CacheEntry, FileSettings, MemorySettings, SettingsStore};
pub use version::Version;
