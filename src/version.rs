//! snapd version parsing and ordering.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Oldest snapd release that implements the one-shot preseed mode.
pub const MINIMUM_PRESEED_VERSION: &str = "2.43.3";

/// A dotted numeric version such as `2.44.1`.
///
/// Missing trailing components compare as zero, so `2.44` equals `2.44.0`.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    components: Vec<u64>,
}

impl Version {
    /// Parse a version string. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Err(Error::malformed_version(s, "empty version"));
        }

        let components = text
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::malformed_version(
                        text,
                        format!("invalid component {:?}", part),
                    ));
                }
                part.parse::<u64>().map_err(|e| {
                    Error::malformed_version(text, format!("component {:?}: {}", part, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            text: text.to_string(),
            components,
        })
    }

    /// The numeric components.
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, idx: usize) -> u64 {
        self.components.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compare two version strings.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

/// Fail unless `version` can run snapd's preseed mode.
pub fn check_preseed_support(version: &Version) -> Result<()> {
    let minimum = Version::parse(MINIMUM_PRESEED_VERSION)?;
    if *version < minimum {
        return Err(Error::UnsupportedVersion {
            version: version.to_string(),
            minimum: MINIMUM_PRESEED_VERSION.to_string(),
        });
    }
    Ok(())
}
