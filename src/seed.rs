//! Locating the runtime image in a classic seed.
//!
//! A classic image ships its initial snaps in `var/lib/snapd/seed`, described
//! by `seed.yaml`. The snap that provides snapd is either the `snapd` snap or,
//! on older seeds, the `core` snap.

use crate::error::{Error, Result};
use crate::paths::{join_root, Dirs};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The snap image providing snapd, as found in the seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeImage {
    /// Host-side path of the `.snap` file.
    pub path: PathBuf,
    /// Snap name: `snapd` or `core`.
    pub name: String,
    /// Recovery system label. Classic seeds have none; it is only logged.
    pub label: Option<String>,
}

/// Capability to find the runtime image for a target root.
pub trait ImageResolver {
    /// Locate the snapd-providing snap for the image rooted at `root`.
    fn resolve(&self, root: &Path) -> Result<RuntimeImage>;
}

/// Resolver reading `seed.yaml` from the target's classic seed.
#[derive(Debug, Clone)]
pub struct SeedResolver {
    seed_dir: PathBuf,
}

impl SeedResolver {
    /// Resolver for the seed directory configured in `dirs`.
    pub fn new(dirs: &Dirs) -> Self {
        Self {
            seed_dir: dirs.snap_seed_dir.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedYaml {
    #[serde(default)]
    snaps: Vec<SeedSnap>,
}

#[derive(Debug, Deserialize)]
struct SeedSnap {
    name: String,
    file: String,
    #[serde(default)]
    channel: Option<String>,
}

impl ImageResolver for SeedResolver {
    fn resolve(&self, root: &Path) -> Result<RuntimeImage> {
        let seed_dir = join_root(root, &self.seed_dir);
        let seed_yaml = seed_dir.join("seed.yaml");

        let content = fs::read_to_string(&seed_yaml).map_err(|e| {
            Error::seed(format!("cannot read seed {:?}: {}", seed_yaml, e))
        })?;
        let seed: SeedYaml = serde_yaml::from_str(&content).map_err(|e| {
            Error::seed(format!("cannot parse seed {:?}: {}", seed_yaml, e))
        })?;

        let snap = ["snapd", "core"]
            .iter()
            .find_map(|wanted| seed.snaps.iter().find(|s| s.name == *wanted))
            .ok_or_else(|| {
                Error::seed(format!(
                    "cannot find snapd or core snap in seed {:?}",
                    seed_yaml
                ))
            })?;

        let path = seed_dir.join("snaps").join(&snap.file);
        tracing::debug!(
            snap = %snap.name,
            channel = snap.channel.as_deref().unwrap_or("-"),
            path = %path.display(),
            "found runtime image in seed"
        );

        Ok(RuntimeImage {
            path,
            name: snap.name.clone(),
            label: None,
        })
    }
}

impl<F> ImageResolver for F
where
    F: Fn(&Path) -> Result<RuntimeImage>,
{
    fn resolve(&self, root: &Path) -> Result<RuntimeImage> {
        self(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_seed(root: &Path, yaml: &str) {
        let dir = root.join("var/lib/snapd/seed");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("seed.yaml"), yaml).unwrap();
    }

    #[test]
    fn test_prefers_snapd_snap() {
        let temp = TempDir::new().unwrap();
        write_seed(
            temp.path(),
            "snaps:\n\
             \x20 - name: core\n\
             \x20   channel: stable\n\
             \x20   file: core_8268.snap\n\
             \x20 - name: snapd\n\
             \x20   channel: stable\n\
             \x20   file: snapd_6945.snap\n\
             \x20 - name: lxd\n\
             \x20   channel: 4.0/stable/ubuntu-20.04\n\
             \x20   file: lxd_16099.snap\n",
        );

        let image = SeedResolver::new(&Dirs::default()).resolve(temp.path()).unwrap();
        assert_eq!(image.name, "snapd");
        assert_eq!(
            image.path,
            temp.path().join("var/lib/snapd/seed/snaps/snapd_6945.snap")
        );
        assert_eq!(image.label, None);
    }

    #[test]
    fn test_falls_back_to_core() {
        let temp = TempDir::new().unwrap();
        write_seed(
            temp.path(),
            "snaps:\n  - name: core\n    file: core_8268.snap\n    classic: false\n",
        );

        let image = SeedResolver::new(&Dirs::default()).resolve(temp.path()).unwrap();
        assert_eq!(image.name, "core");
        assert!(image.path.ends_with("snaps/core_8268.snap"));
    }

    #[test]
    fn test_no_system_snap() {
        let temp = TempDir::new().unwrap();
        write_seed(temp.path(), "snaps:\n  - name: lxd\n    file: lxd_1.snap\n");

        let err = SeedResolver::new(&Dirs::default()).resolve(temp.path()).unwrap_err();
        assert!(err.to_string().starts_with("cannot find snapd or core snap in seed"));
    }

    #[test]
    fn test_missing_seed() {
        let temp = TempDir::new().unwrap();
        let err = SeedResolver::new(&Dirs::default()).resolve(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Seed(_)));
        assert!(err.to_string().starts_with("cannot read seed"));
    }
}
