use std::fmt;
use thiserror::Error;

/// The step of an update check at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStage {
    LoadCache,
    Fetch,
    Parse,
    Persist,
}

impl fmt::Display for CheckStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckStage::LoadCache => "load-cache",
            CheckStage::Fetch => "fetch",
            CheckStage::Parse => "parse",
            CheckStage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Release feed returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid release tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("Failed to read settings: {0}")]
    SettingsRead(String),

    #[error("Failed to write settings: {0}")]
    SettingsWrite(String),

    #[error("Settings lock poisoned by a panicked check")]
    LockPoisoned,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpdateError {
    /// Which stage of a check produced this error.
    ///
    /// Host-level errors (`Config`, `Io`, `Toml`) never come out of a check;
    /// they are attributed to `LoadCache` since that is where a check would
    /// first touch the filesystem.
    pub fn stage(&self) -> CheckStage {
        match self {
            UpdateError::Network(_) | UpdateError::HttpStatus { .. } => CheckStage::Fetch,
            UpdateError::Json(_)
            | UpdateError::InvalidVersion(_)
            | UpdateError::InvalidTag { .. } => CheckStage::Parse,
            UpdateError::SettingsWrite(_) => CheckStage::Persist,
            UpdateError::SettingsRead(_)
            | UpdateError::LockPoisoned
            | UpdateError::Config(_)
            | UpdateError::Io(_)
            | UpdateError::Toml(_) => CheckStage::LoadCache,
        }
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        UpdateError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;
