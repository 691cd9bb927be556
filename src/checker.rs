use crate::clock::{Clock, SystemClock};
use crate::config::CheckerConfig;
use crate::error::{Result, UpdateError};
use crate::feed::{LatestSelection, ReleaseFeed};
use crate::settings::{CacheEntry, SettingsStore};
use crate::version::Version;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Result of a check that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The last check is still inside the cache window; no request was made.
    Cached { update_available: bool },
    /// The feed has no releases. Nothing was persisted.
    NoReleases,
    /// The feed was queried and the result persisted.
    Checked {
        latest: Version,
        update_available: bool,
    },
}

impl CheckOutcome {
    pub fn update_available(&self) -> bool {
        match self {
            CheckOutcome::Cached { update_available }
            | CheckOutcome::Checked {
                update_available, ..
            } => *update_available,
            CheckOutcome::NoReleases => false,
        }
    }
}

/// Answers "is there a newer release than the one running?" at most once per cache window.
///
/// The settings store is held behind a mutex for the whole
/// read-fetch-write sequence, so concurrent callers trigger one request.
pub struct UpdateChecker<S: SettingsStore> {
    current: Version,
    feed: Arc<dyn ReleaseFeed>,
    store: Mutex<S>,
    clock: Arc<dyn Clock>,
    cache_window: Duration,
    selection: LatestSelection,
}

impl<S: SettingsStore> UpdateChecker<S> {
    pub fn new(current: Version, feed: Arc<dyn ReleaseFeed>, store: S) -> Self {
        let defaults = CheckerConfig::default();
        Self {
            current,
            feed,
            store: Mutex::new(store),
            clock: Arc::new(SystemClock),
            cache_window: defaults.cache_window(),
            selection: defaults.selection,
        }
    }

    pub fn with_config(mut self, config: &CheckerConfig) -> Self {
        self.cache_window = config.cache_window();
        self.selection = config.selection;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn current_version(&self) -> &Version {
        &self.current
    }

    /// True if the latest release is newer than the running version.
    ///
    /// Never fails: any error is logged and reported as `false`, leaving
    /// the cached entry as it was.
    pub fn is_update_available(&self) -> bool {
        match self.check() {
            Ok(outcome) => outcome.update_available(),
            Err(err) => {
                tracing::error!(stage = %err.stage(), error = %err, "Update check failed");
                false
            }
        }
    }

    /// Run the check, honoring the cache window.
    pub fn check(&self) -> Result<CheckOutcome> {
        self.run(true)
    }

    /// Query the feed even if the cached entry is still fresh.
    pub fn force_check(&self) -> Result<CheckOutcome> {
        self.run(false)
    }

    pub fn cache_entry(&self) -> Result<CacheEntry> {
        self.lock_store()?.get()
    }

    /// Put the persisted entry back to its defaults.
    pub fn reset(&self) -> Result<()> {
        let mut store = self.lock_store()?;
        store.set(CacheEntry::default());
        store.save()
    }

    pub fn into_store(self) -> S {
        self.store.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn run(&self, honor_cache: bool) -> Result<CheckOutcome> {
        tracing::info!(version = %self.current, "Checking for new version");

        let mut store = self.lock_store()?;
        let cached = store.get()?;
        tracing::debug!(last_checked = %cached.last_checked_for_update, "Last checked for update");

        let now = self.clock.now();
        if honor_cache && cached.is_fresh(now, self.cache_window) {
            tracing::info!(
                stored_value = cached.is_update_available,
                "Update check already occurred within the cache window, returning stored value"
            );
            return Ok(CheckOutcome::Cached {
                update_available: cached.is_update_available,
            });
        }

        let releases = self.feed.fetch_releases()?;
        let Some(latest) = self.selection.select(&releases)? else {
            tracing::info!("No release found to compare against");
            return Ok(CheckOutcome::NoReleases);
        };
        tracing::debug!(version = %latest, "Tag to version conversion");

        let update_available = latest > self.current;
        if update_available {
            tracing::info!(latest = %latest, current = %self.current, "Update available");
        }

        // A forced check under clock skew must not move the timestamp backwards.
        let checked_at = now.max(cached.last_checked_for_update);
        let updated = CacheEntry::new(checked_at, update_available);
        store.set(updated);
        if let Err(err) = store.save() {
            store.set(cached);
            return Err(err);
        }
        tracing::debug!(
            last_checked = %updated.last_checked_for_update,
            is_update_available = updated.is_update_available,
            "Persisted update check result"
        );

        Ok(CheckOutcome::Checked {
            latest,
            update_available,
        })
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, S>> {
        self.store.lock().map_err(|_| UpdateError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::CheckStage;
    use crate::feed::Release;
    use crate::settings::{FileSettings, MemorySettings};
    use jiff::{SignedDuration, Timestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const NOW: &str = "2024-06-01T12:00:00Z";

    enum Response {
        Tags(Vec<&'static str>),
        NetworkDown,
        Forbidden,
        BadJson,
    }

    struct FakeFeed {
        response: Response,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FakeFeed {
        fn tags(tags: &[&'static str]) -> Arc<Self> {
            Self::with(Response::Tags(tags.to_vec()))
        }

        fn with(response: Response) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReleaseFeed for FakeFeed {
        fn fetch_releases(&self) -> Result<Vec<Release>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            match &self.response {
                Response::Tags(tags) => Ok(tags.iter().map(|t| Release::new(*t)).collect()),
                Response::NetworkDown => Err(UpdateError::Network("connection refused".into())),
                Response::Forbidden => Err(UpdateError::HttpStatus {
                    status: 403,
                    url: "https://api.github.com/repos/example/releases".into(),
                }),
                Response::BadJson => {
                    Err(serde_json::from_str::<Vec<Release>>("<html>").unwrap_err().into())
                }
            }
        }
    }

    /// Store whose reads or writes can be made to fail.
    struct FlakyStore {
        inner: MemorySettings,
        fail_get: bool,
        fail_save: bool,
    }

    impl SettingsStore for FlakyStore {
        fn get(&self) -> Result<CacheEntry> {
            if self.fail_get {
                return Err(UpdateError::SettingsRead("settings.toml: permission denied".into()));
            }
            self.inner.get()
        }

        fn set(&mut self, entry: CacheEntry) {
            self.inner.set(entry)
        }

        fn save(&mut self) -> Result<()> {
            if self.fail_save {
                return Err(UpdateError::SettingsWrite("disk full".into()));
            }
            self.inner.save()
        }
    }

    fn now() -> Timestamp {
        NOW.parse().unwrap()
    }

    fn ago(duration: SignedDuration) -> Timestamp {
        now().checked_sub(duration).unwrap()
    }

    fn version(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn checker<S: SettingsStore>(
        own: &str,
        feed: &Arc<FakeFeed>,
        store: S,
    ) -> UpdateChecker<S> {
        UpdateChecker::new(version(own), feed.clone(), store)
            .with_clock(Arc::new(FixedClock::new(now())))
    }

    fn stale_entry(flag: bool) -> CacheEntry {
        CacheEntry::new(ago(SignedDuration::from_hours(48)), flag)
    }

    #[test]
    fn fresh_cache_returns_stored_flag_without_fetching() {
        let feed = FakeFeed::tags(&["v9.9.9"]);
        let entry = CacheEntry::new(ago(SignedDuration::from_hours(23)), true);
        let checker = checker("1.0.0", &feed, MemorySettings::with_entry(entry));

        assert!(checker.is_update_available());
        assert_eq!(feed.calls(), 0);
        assert_eq!(checker.cache_entry().unwrap(), entry);
    }

    #[test]
    fn cache_is_fresh_at_exactly_the_window() {
        let feed = FakeFeed::tags(&["v9.9.9"]);
        let entry = CacheEntry::new(ago(SignedDuration::from_hours(24)), false);
        let checker = checker("1.0.0", &feed, MemorySettings::with_entry(entry));

        assert_eq!(
            checker.check().unwrap(),
            CheckOutcome::Cached {
                update_available: false
            }
        );
        assert_eq!(feed.calls(), 0);
    }

    #[test]
    fn expired_cache_fetches_once() {
        let feed = FakeFeed::tags(&["v1.0.0"]);
        let last = ago(SignedDuration::from_hours(24) + SignedDuration::from_secs(1));
        let checker = checker(
            "1.0.0",
            &feed,
            MemorySettings::with_entry(CacheEntry::new(last, true)),
        );

        assert!(!checker.is_update_available());
        assert_eq!(feed.calls(), 1);
        assert_eq!(checker.cache_entry().unwrap(), CacheEntry::new(now(), false));
    }

    #[test]
    fn newer_release_reports_update_and_persists() {
        let feed = FakeFeed::tags(&["v1.2.3", "v1.2.2"]);
        let checker = checker("1.2.2", &feed, MemorySettings::new());

        assert_eq!(
            checker.check().unwrap(),
            CheckOutcome::Checked {
                latest: version("1.2.3"),
                update_available: true
            }
        );

        let store = checker.into_store();
        assert_eq!(store.saved(), CacheEntry::new(now(), true));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn same_release_is_not_an_update() {
        let feed = FakeFeed::tags(&["v1.2.2"]);
        let checker = checker("1.2.2", &feed, MemorySettings::with_entry(stale_entry(true)));

        assert!(!checker.is_update_available());
        assert_eq!(checker.into_store().saved(), CacheEntry::new(now(), false));
    }

    #[test]
    fn older_release_is_not_an_update() {
        let feed = FakeFeed::tags(&["v1.2.1"]);
        let checker = checker("1.2.2", &feed, MemorySettings::new());

        assert!(!checker.is_update_available());
        assert_eq!(feed.calls(), 1);
    }

    #[test]
    fn shorter_tag_compares_with_zero_padding() {
        let feed = FakeFeed::tags(&["v2.0"]);
        let checker = checker("1.9.9.9", &feed, MemorySettings::new());

        assert_eq!(
            checker.check().unwrap(),
            CheckOutcome::Checked {
                latest: version("2.0.0"),
                update_available: true
            }
        );
    }

    #[test]
    fn unparsable_tag_fails_softly_without_persisting() {
        let feed = FakeFeed::tags(&["nightly-2024"]);
        let entry = stale_entry(true);
        let checker = checker("1.0.0", &feed, MemorySettings::with_entry(entry));

        let err = checker.check().unwrap_err();
        assert_eq!(err.stage(), CheckStage::Parse);

        assert!(!checker.is_update_available());
        let store = checker.into_store();
        assert_eq!(store.saved(), entry);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn empty_feed_leaves_cache_untouched() {
        let feed = FakeFeed::tags(&[]);
        let entry = stale_entry(true);
        let checker = checker("1.0.0", &feed, MemorySettings::with_entry(entry));

        assert_eq!(checker.check().unwrap(), CheckOutcome::NoReleases);
        assert!(!checker.is_update_available());
        assert_eq!(feed.calls(), 2);

        let store = checker.into_store();
        assert_eq!(store.saved(), entry);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn network_error_fails_softly_without_persisting() {
        let feed = FakeFeed::with(Response::NetworkDown);
        let entry = stale_entry(true);
        let checker = checker("1.0.0", &feed, MemorySettings::with_entry(entry));

        assert!(!checker.is_update_available());
        assert_eq!(checker.check().unwrap_err().stage(), CheckStage::Fetch);
        assert_eq!(checker.cache_entry().unwrap(), entry);
    }

    #[test]
    fn rejected_request_is_a_fetch_failure() {
        let feed = FakeFeed::with(Response::Forbidden);
        let checker = checker("1.0.0", &feed, MemorySettings::new());

        let err = checker.check().unwrap_err();
        assert!(matches!(err, UpdateError::HttpStatus { status: 403, .. }));
        assert_eq!(err.stage(), CheckStage::Fetch);
    }

    #[test]
    fn malformed_feed_is_a_parse_failure() {
        let feed = FakeFeed::with(Response::BadJson);
        let checker = checker("1.0.0", &feed, MemorySettings::new());

        assert_eq!(checker.check().unwrap_err().stage(), CheckStage::Parse);
        assert_eq!(checker.cache_entry().unwrap(), CacheEntry::default());
    }

    #[test]
    fn repeated_calls_inside_window_are_idempotent() {
        let feed = FakeFeed::tags(&["v3.0.0"]);
        let checker = checker("2.0.0", &feed, MemorySettings::new());

        let first = checker.is_update_available();
        let after_first = checker.cache_entry().unwrap();
        let second = checker.is_update_available();

        assert!(first);
        assert_eq!(first, second);
        assert_eq!(checker.cache_entry().unwrap(), after_first);
        assert_eq!(feed.calls(), 1);
        assert_eq!(checker.into_store().save_count(), 1);
    }

    #[test]
    fn failed_save_rolls_back_the_entry() {
        let feed = FakeFeed::tags(&["v5.0.0"]);
        let entry = stale_entry(false);
        let store = FlakyStore {
            inner: MemorySettings::with_entry(entry),
            fail_get: false,
            fail_save: true,
        };
        let checker = checker("1.0.0", &feed, store);

        assert_eq!(checker.check().unwrap_err().stage(), CheckStage::Persist);
        assert!(!checker.is_update_available());
        assert_eq!(checker.cache_entry().unwrap(), entry);
    }

    #[test]
    fn unreadable_store_skips_the_fetch() {
        let feed = FakeFeed::tags(&["v5.0.0"]);
        let store = FlakyStore {
            inner: MemorySettings::new(),
            fail_get: true,
            fail_save: false,
        };
        let checker = checker("1.0.0", &feed, store);

        assert_eq!(checker.check().unwrap_err().stage(), CheckStage::LoadCache);
        assert!(!checker.is_update_available());
        assert_eq!(feed.calls(), 0);
    }

    #[test]
    fn highest_selection_ignores_feed_order() {
        let feed = FakeFeed::tags(&["v1.0.0", "v3.0.0", "v2.0.0"]);
        let config = CheckerConfig {
            selection: LatestSelection::Highest,
            ..CheckerConfig::default()
        };
        let checker = checker("2.5.0", &feed, MemorySettings::new()).with_config(&config);

        assert_eq!(
            checker.check().unwrap(),
            CheckOutcome::Checked {
                latest: version("3.0.0"),
                update_available: true
            }
        );
    }

    #[test]
    fn first_selection_trusts_feed_order() {
        let feed = FakeFeed::tags(&["v1.0.0", "v3.0.0"]);
        let checker = checker("2.5.0", &feed, MemorySettings::new());

        assert!(!checker.is_update_available());
    }

    #[test]
    fn configured_window_is_honored() {
        let feed = FakeFeed::tags(&["v2.0.0"]);
        let config = CheckerConfig {
            cache_window_secs: 60 * 60,
            ..CheckerConfig::default()
        };
        let entry = CacheEntry::new(ago(SignedDuration::from_hours(2)), false);
        let checker =
            checker("1.0.0", &feed, MemorySettings::with_entry(entry)).with_config(&config);

        assert!(checker.is_update_available());
        assert_eq!(feed.calls(), 1);
    }

    #[test]
    fn force_check_bypasses_fresh_cache() {
        let feed = FakeFeed::tags(&["v2.0.0"]);
        let entry = CacheEntry::new(ago(SignedDuration::from_mins(5)), false);
        let checker = checker("1.0.0", &feed, MemorySettings::with_entry(entry));

        assert!(checker.force_check().unwrap().update_available());
        assert_eq!(feed.calls(), 1);
        assert_eq!(checker.cache_entry().unwrap(), CacheEntry::new(now(), true));
    }

    #[test]
    fn forced_check_never_moves_timestamp_backwards() {
        let feed = FakeFeed::tags(&["v1.0.0"]);
        let future = now().checked_add(SignedDuration::from_hours(3)).unwrap();
        let checker = checker(
            "1.0.0",
            &feed,
            MemorySettings::with_entry(CacheEntry::new(future, true)),
        );

        checker.force_check().unwrap();
        assert_eq!(checker.cache_entry().unwrap(), CacheEntry::new(future, false));
    }

    #[test]
    fn clock_moving_past_window_triggers_new_fetch() {
        let feed = FakeFeed::tags(&["v1.1.0"]);
        let clock = Arc::new(FixedClock::new(now()));
        let checker = UpdateChecker::new(version("1.0.0"), feed.clone(), MemorySettings::new())
            .with_clock(clock.clone());

        assert!(checker.is_update_available());
        clock.advance(SignedDuration::from_hours(12));
        assert!(checker.is_update_available());
        assert_eq!(feed.calls(), 1);

        clock.advance(SignedDuration::from_hours(13));
        assert!(checker.is_update_available());
        assert_eq!(feed.calls(), 2);
    }

    #[test]
    fn concurrent_callers_share_one_fetch() {
        let feed = Arc::new(FakeFeed {
            response: Response::Tags(vec!["v2.0.0"]),
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        });
        let checker = checker("1.0.0", &feed, MemorySettings::new());
        let shared = &checker;

        let results: Vec<bool> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(move || shared.is_update_available()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results, vec![true; 4]);
        assert_eq!(feed.calls(), 1);
    }

    #[test]
    fn reset_restores_defaults() {
        let feed = FakeFeed::tags(&["v2.0.0"]);
        let checker = checker("1.0.0", &feed, MemorySettings::new());

        assert!(checker.is_update_available());
        checker.reset().unwrap();
        assert_eq!(checker.cache_entry().unwrap(), CacheEntry::default());
    }

    #[test]
    fn file_backed_cache_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let feed = FakeFeed::tags(&["v1.4.0"]);

        let first = checker("1.3.0", &feed, FileSettings::new(&path));
        assert!(first.is_update_available());
        drop(first);

        let second = checker("1.3.0", &feed, FileSettings::new(&path));
        assert!(second.is_update_available());
        assert_eq!(feed.calls(), 1);
        assert_eq!(
            FileSettings::new(&path).get().unwrap(),
            CacheEntry::new(now(), true)
        );
    }
}
