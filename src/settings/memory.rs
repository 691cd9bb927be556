use crate::error::Result;
use crate::settings::{CacheEntry, SettingsStore};

/// Settings held only in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    staged: CacheEntry,
    saved: CacheEntry,
    saves: usize,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already saved entry.
    pub fn with_entry(entry: CacheEntry) -> Self {
        Self {
            staged: entry,
            saved: entry,
            saves: 0,
        }
    }

    /// The last entry committed with `save`.
    pub fn saved(&self) -> CacheEntry {
        self.saved
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self) -> Result<CacheEntry> {
        Ok(self.staged)
    }

    fn set(&mut self, entry: CacheEntry) {
        self.staged = entry;
    }

    fn save(&mut self) -> Result<()> {
        self.saved = self.staged;
        self.saves += 1;
        Ok(())
    }
}
