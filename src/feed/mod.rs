use crate::error::{Result, UpdateError};
use crate::version::Version;
use serde::{Deserialize, Serialize};

pub mod github;
pub use github::GitHubReleaseFeed;

/// One entry of the release list. Only the tag is of interest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

impl Release {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
        }
    }
}

/// Source of published releases, newest first.
pub trait ReleaseFeed: Send + Sync {
    fn fetch_releases(&self) -> Result<Vec<Release>>;
}

/// How the "latest" release is picked out of the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatestSelection {
    /// Trust the feed order and take the first entry.
    #[default]
    First,
    /// Take the highest version among all tags that parse.
    Highest,
}

impl LatestSelection {
    /// Returns `Ok(None)` when the feed has no releases at all.
    pub fn select(self, releases: &[Release]) -> Result<Option<Version>> {
        match self {
            LatestSelection::First => {
                let Some(latest) = releases.first() else {
                    return Ok(None);
                };
                tracing::debug!(tag = %latest.tag_name, "Latest tag name");
                Version::from_tag(&latest.tag_name).map(Some)
            }
            LatestSelection::Highest => {
                let mut best: Option<Version> = None;
                let mut first_error: Option<UpdateError> = None;

                for release in releases {
                    match Version::from_tag(&release.tag_name) {
                        Ok(version) => {
                            if best.as_ref().is_none_or(|b| version > *b) {
                                best = Some(version);
                            }
                        }
                        Err(err) => {
                            tracing::debug!(tag = %release.tag_name, error = %err, "Skipping release tag");
                            if first_error.is_none() {
                                first_error = Some(err);
                            }
                        }
                    }
                }

                match (best, first_error) {
                    (Some(version), _) => Ok(Some(version)),
                    (None, Some(err)) => Err(err),
                    (None, None) => Ok(None),
                }
            }
        }
    }
}
