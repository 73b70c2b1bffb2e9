//! Classic image preseeding.
//!
//! Runs snapd once in preseed mode inside a chroot of an unbooted classic
//! image. snapd seeds the image and exits, leaving state and generated
//! artifacts behind so first boot has less to do.
//!
//! The snapd that runs is either the one in the seeded `snapd`/`core` snap,
//! mounted into the chroot, or the one installed in the image itself,
//! whichever is newer.

use crate::chroot::{Chroot, SystemChroot};
use crate::config::PreseedConfig;
use crate::error::{Error, Result};
use crate::mount::mount_image;
use crate::paths::{absolute, join_root, Dirs};
use crate::process::describe_status;
use crate::seed::{ImageResolver, SeedResolver};
use crate::validate::check_chroot;
use crate::version::{check_preseed_support, Version};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable switching snapd into one-shot preseed mode.
pub const PRESEED_ENV: &str = "SNAPD_PRESEED";

/// Where the snapd that gets executed comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapdSource {
    /// The snapd or core snap mounted from the seed.
    Image,
    /// The snapd installed in the target root (e.g. from a deb).
    Host,
}

/// The snapd selected for the preseed run.
#[derive(Debug, Clone)]
pub struct TargetSnapd {
    pub source: SnapdSource,
    pub version: Version,
}

/// Pick the snapd to run from the versions found in the image and the host.
///
/// The newer one wins; on a tie the mounted image is preferred. `info_path`
/// is reported when neither side carries version information.
pub fn select_snapd(
    image: Option<Version>,
    host: Option<Version>,
    info_path: &Path,
) -> Result<TargetSnapd> {
    let target = match (image, host) {
        (Some(image), Some(host)) if host > image => TargetSnapd {
            source: SnapdSource::Host,
            version: host,
        },
        (Some(image), _) => TargetSnapd {
            source: SnapdSource::Image,
            version: image,
        },
        (None, Some(host)) => TargetSnapd {
            source: SnapdSource::Host,
            version: host,
        },
        (None, None) => return Err(Error::VersionInfo(info_path.to_path_buf())),
    };
    Ok(target)
}

/// Read the `VERSION=` line of a snapd info file.
///
/// Returns `None` when the file does not exist.
pub fn read_info_version(path: &Path) -> Result<Option<Version>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let value = content
        .lines()
        .find_map(|line| line.trim().strip_prefix("VERSION="))
        .ok_or_else(|| Error::VersionInfo(path.to_path_buf()))?;

    Version::parse(value).map(Some)
}

/// Preseeds classic images.
pub struct Preseeder {
    config: PreseedConfig,
    dirs: Dirs,
    chroot: Box<dyn Chroot>,
    resolver: Box<dyn ImageResolver>,
}

impl Preseeder {
    /// Preseeder using chroot(2) and the image's classic seed.
    pub fn new(config: PreseedConfig, dirs: Dirs) -> Self {
        let resolver = SeedResolver::new(&dirs);
        Self {
            config,
            dirs,
            chroot: Box::new(SystemChroot),
            resolver: Box::new(resolver),
        }
    }

    /// Replace the way the target root is entered.
    pub fn with_chroot(mut self, chroot: impl Chroot + 'static) -> Self {
        self.chroot = Box::new(chroot);
        self
    }

    /// Replace the way the runtime image is located.
    pub fn with_resolver(mut self, resolver: impl ImageResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Preseed the classic image rooted at `root`.
    ///
    /// On success the process has been chrooted into `root`.
    pub fn classic(&self, root: &Path) -> Result<()> {
        let root = absolute(root)?;
        if !root.is_dir() {
            return Err(Error::NotADirectory(root));
        }

        if join_root(&root, &self.dirs.snap_state_file).exists() {
            return Err(Error::AlreadyPreseeded(root));
        }

        check_chroot(&root, &self.config.mountinfo)?;

        let image = self.resolver.resolve(&root)?;
        tracing::info!(
            root = %root.display(),
            snap = %image.name,
            image = %image.path.display(),
            label = image.label.as_deref().unwrap_or("-"),
            "preseeding classic image"
        );

        let mount_dest = join_root(&root, &self.config.mount_dir);
        let mut guard = mount_image(&self.config.tools, &image.path, &mount_dest)?;

        let image_info = self.dirs.snapd_info_file(&mount_dest);
        let target = select_snapd(
            read_info_version(&image_info)?,
            read_info_version(&self.dirs.snapd_info_file(&root))?,
            &image_info,
        )?;
        check_preseed_support(&target.version)?;
        tracing::info!(source = ?target.source, version = %target.version, "selected snapd");

        self.chroot
            .enter(&root)
            .map_err(|source| Error::ChrootFailed {
                path: root.clone(),
                source,
            })?;

        // From here on paths are seen from inside the chroot.
        let mount_dir = self.dirs.under_root(&self.config.mount_dir);
        guard.relocate(&mount_dir);

        let snapd = match target.source {
            SnapdSource::Image => self.dirs.snapd_binary(&mount_dir),
            SnapdSource::Host => self.dirs.snapd_binary(&self.dirs.root_dir),
        };
        let result = run_snapd(&snapd);

        guard.release();
        result
    }
}

fn run_snapd(snapd: &Path) -> Result<()> {
    tracing::info!(path = %snapd.display(), "running snapd in preseed mode");

    let status = Command::new(snapd)
        .env(PRESEED_ENV, "1")
        .status()
        .map_err(|source| Error::RuntimeSpawn {
            path: snapd.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(Error::RuntimeExecFailed(describe_status(status)));
    }

    tracing::info!("preseeding finished");
    Ok(())
}

/// Preseed the classic image at `root` with default configuration.
pub fn classic(root: &Path) -> Result<()> {
    Preseeder::new(PreseedConfig::default(), Dirs::default()).classic(root)
}
