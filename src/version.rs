use crate::error::{Result, UpdateError};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const MIN_COMPONENTS: usize = 2;
const MAX_COMPONENTS: usize = 4;
const MAX_COMPONENT: u32 = i32::MAX as u32;

/// Application version as `major.minor[.build[.revision]]`.
///
/// Ordering compares components left to right with missing trailing
/// components treated as zero, so `1.2` and `1.2.0` are equal.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u32>,
}

impl Version {
    /// Parse a bare version string such as `1.2.3`.
    pub fn parse(version: &str) -> Result<Self> {
        let components = Self::parse_numeric(version.trim())?;
        Ok(Self { components })
    }

    /// Derive a version from a release tag like `v1.2.3`.
    ///
    /// The first character of the tag is dropped unconditionally.
    pub fn from_tag(tag: &str) -> Result<Self> {
        let mut chars = tag.chars();
        if chars.next().is_none() {
            return Err(UpdateError::InvalidTag {
                tag: tag.to_string(),
                reason: "tag is empty".to_string(),
            });
        }
        let stripped = chars.as_str();
        tracing::debug!(tag, stripped, "Stripped tag name");

        Self::parse(stripped).map_err(|err| UpdateError::InvalidTag {
            tag: tag.to_string(),
            reason: match err {
                UpdateError::InvalidVersion(reason) => reason,
                other => other.to_string(),
            },
        })
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }

    pub fn major(&self) -> u32 {
        self.components[0]
    }

    pub fn minor(&self) -> u32 {
        self.components[1]
    }

    pub fn build(&self) -> Option<u32> {
        self.components.get(2).copied()
    }

    pub fn revision(&self) -> Option<u32> {
        self.components.get(3).copied()
    }

    fn parse_numeric(version: &str) -> Result<Vec<u32>> {
        if version.is_empty() {
            return Err(UpdateError::InvalidVersion(
                "version string is empty".to_string(),
            ));
        }

        let parts: Vec<&str> = version.split('.').collect();
        if !(MIN_COMPONENTS..=MAX_COMPONENTS).contains(&parts.len()) {
            return Err(UpdateError::InvalidVersion(format!(
                "'{version}' has {} components, expected {MIN_COMPONENTS} to {MAX_COMPONENTS}",
                parts.len()
            )));
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in parts {
            // `u32::from_str` accepts a leading '+', which is not a valid component.
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(UpdateError::InvalidVersion(format!(
                    "'{part}' in '{version}' is not a non-negative integer"
                )));
            }
            let number = part
                .parse::<u32>()
                .ok()
                .filter(|n| *n <= MAX_COMPONENT)
                .ok_or_else(|| {
                    UpdateError::InvalidVersion(format!("'{part}' in '{version}' is out of range"))
                })?;
            numbers.push(number);
        }

        Ok(numbers)
    }
}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}
