use crate::error::{Result, UpdateError};
use crate::settings::{CacheEntry, SettingsStore};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// TOML file holding `LastCheckedForUpdate` and `IsUpdateAvailable`.
///
/// A missing file or key reads as the default entry. Reads go to disk on
/// every `get` unless a value has been staged with `set`.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    pending: Option<CacheEntry>,
}

impl FileSettings {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pending: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_from_disk(&self) -> Result<CacheEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheEntry::default()),
            Err(e) => {
                return Err(UpdateError::SettingsRead(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };

        toml::from_str(&content)
            .map_err(|e| UpdateError::SettingsRead(format!("{}: {e}", self.path.display())))
    }

    fn write_to_disk(&self, entry: &CacheEntry) -> Result<()> {
        let write_err = |e: &dyn std::fmt::Display| {
            UpdateError::SettingsWrite(format!("{}: {e}", self.path.display()))
        };

        let content = toml::to_string(entry).map_err(|e| write_err(&e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }

        let tmp_path = self.temp_path();
        fs::write(&tmp_path, content).map_err(|e| write_err(&e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            write_err(&e)
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SettingsStore for FileSettings {
    fn get(&self) -> Result<CacheEntry> {
        match self.pending {
            Some(entry) => Ok(entry),
            None => self.read_from_disk(),
        }
    }

    fn set(&mut self, entry: CacheEntry) {
        self.pending = Some(entry);
    }

    fn save(&mut self) -> Result<()> {
        let Some(entry) = self.pending else {
            return Ok(());
        };
        self.write_to_disk(&entry)?;
        self.pending = None;
        Ok(())
    }
}
