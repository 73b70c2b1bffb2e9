//! snap-preseed configuration.
//!
//! Defaults match a stock Ubuntu build host. A TOML file passed with
//! `--config` may override any of them:
//!
//! ```toml
//! mount_dir = "/tmp/snapd-preseed"
//! mountinfo = "/proc/self/mountinfo"
//!
//! [tools]
//! mount = "/usr/bin/mount"
//! umount = "/usr/bin/umount"
//! ```

use crate::error::{Error, Result};
use crate::mountinfo::DEFAULT_MOUNTINFO;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where the runtime image is mounted, relative to the target root.
pub const DEFAULT_MOUNT_DIR: &str = "/tmp/snapd-preseed";

/// External programs used for mounting.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Tools {
    /// mount(8).
    pub mount: PathBuf,
    /// umount(8).
    pub umount: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            mount: PathBuf::from("mount"),
            umount: PathBuf::from("umount"),
        }
    }
}

/// Preseed configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreseedConfig {
    /// Mount location of the runtime image, relative to the target root.
    ///
    /// Code inside the chroot finds the mounted snapd here.
    pub mount_dir: PathBuf,

    /// Mount table consulted when validating the chroot.
    pub mountinfo: PathBuf,

    /// mount/umount programs.
    pub tools: Tools,
}

impl Default for PreseedConfig {
    fn default() -> Self {
        Self {
            mount_dir: PathBuf::from(DEFAULT_MOUNT_DIR),
            mountinfo: PathBuf::from(DEFAULT_MOUNTINFO),
            tools: Tools::default(),
        }
    }
}

impl PreseedConfig {
    /// Load configuration from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content)
            .map_err(|e| Error::ConfigLoad(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
